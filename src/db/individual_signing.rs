//! Individual signing operations on CLA org documents
//!
//! Signings are elements of the `individuals` array of a CLA org document
//! (`apply_to = individual`, `enabled = 1`). Within one document a signer is
//! identified by (corp_id, email); nothing in the database enforces that,
//! so every write runs its check and its mutation in one transaction.
//!
//! Lookups may see two documents for one repo: the repo-specific one and
//! the org-wide default (`repo_id = ''`). A repo-specific document always
//! decides, even when it holds no signing for the email.

use std::collections::HashMap;

use tracing::{debug, info, warn};
use uuid::Uuid;

use super::documents::{
    element_exists, find_documents, pull_element, push_element, update_element, DocFilter,
    DocumentMatch, ElementFilter, RepoFilter,
};
use super::models::{
    IndividualSigningBasicInfo, IndividualSigningDoc, IndividualSigningInfo,
    IndividualSigningListOption,
};
use super::scope::SigningScope;
use super::ClaDb;
use crate::error::StorageError;

impl ClaDb {
    /// Sign as an individual into the CLA org document `cla_org_id`.
    ///
    /// Fails with [`StorageError::AlreadySigned`] if any enabled individual
    /// signing document of `scope` already holds the signer.
    pub fn sign(
        &self,
        cla_org_id: &str,
        scope: &SigningScope,
        info: &IndividualSigningInfo,
    ) -> Result<(), StorageError> {
        let doc_id = Uuid::parse_str(cla_org_id)
            .map_err(|e| StorageError::InvalidDocumentId {
                id: cla_org_id.to_string(),
                reason: e.to_string(),
            })?
            .to_string();

        let element = IndividualSigningDoc::from_info(info);
        let index = ElementFilter::identity(&info.email);
        let scope_filter = DocFilter::for_individual_signing(scope, false);

        self.do_transaction(|conn| {
            if element_exists(conn, &scope_filter, &index)? {
                warn!("{} has already signed for {}", info.email, scope);
                return Err(StorageError::AlreadySigned(info.email.clone()));
            }

            if push_element(conn, &DocFilter::by_id(&doc_id), &element)? == 0 {
                return Err(StorageError::DocumentNotFound(doc_id.clone()));
            }

            Ok(())
        })?;

        info!("{} signed as individual for {} in {}", info.email, scope, doc_id);
        Ok(())
    }

    /// Delete the individual signing of `email`. Absent signings are not an error.
    pub fn unsign(&self, scope: &SigningScope, email: &str) -> Result<(), StorageError> {
        let filter = DocFilter::for_individual_signing(scope, false);
        let index = ElementFilter::identity(email);

        let removed = self.do_transaction(|conn| pull_element(conn, &filter, &index))?;

        debug!("Removed {} individual signings of {} for {}", removed, email, scope);
        Ok(())
    }

    /// Enable or disable the individual signing of `email`.
    ///
    /// Fails with [`StorageError::NotFound`] when no signing matches.
    pub fn set_enabled(
        &self,
        scope: &SigningScope,
        email: &str,
        enabled: bool,
    ) -> Result<(), StorageError> {
        let filter = DocFilter::for_individual_signing(scope, true);
        let index = ElementFilter::identity(email);

        self.do_transaction(|conn| {
            let updated = update_element(conn, &filter, &index, |signing| {
                signing.enabled = enabled;
            })?;

            if updated == 0 {
                return Err(StorageError::NotFound(format!("{} in {}", email, scope)));
            }
            Ok(())
        })?;

        info!("Set individual signing of {} for {} enabled={}", email, scope, enabled);
        Ok(())
    }

    /// Whether `email` holds an enabled individual signing for the repo.
    ///
    /// An empty `repo_id` checks the whole org.
    pub fn is_signed(
        &self,
        platform: &str,
        org_id: &str,
        repo_id: &str,
        email: &str,
    ) -> Result<bool, StorageError> {
        let mut filter = DocFilter::for_individual_signing(
            &SigningScope::new(platform, org_id, repo_id),
            false,
        );
        if !repo_id.is_empty() {
            filter.repo = RepoFilter::OneOf(vec![String::new(), repo_id.to_string()]);
        }
        let index = ElementFilter::identity(email);

        let docs = self.with_conn(|conn| find_documents(conn, &filter, &index))?;

        Ok(resolve_signed(&docs, repo_id))
    }

    /// List individual signings grouped by CLA org document id.
    ///
    /// Documents without a matching signing are left out.
    pub fn list_signed(
        &self,
        opt: &IndividualSigningListOption,
    ) -> Result<HashMap<String, Vec<IndividualSigningBasicInfo>>, StorageError> {
        let filter = list_filter(opt);
        let elements = match opt.corporation_id {
            Some(ref corporation_id) => ElementFilter::corporation(corporation_id.clone()),
            None => ElementFilter::any(),
        };

        let docs = self.with_conn(|conn| find_documents(conn, &filter, &elements))?;

        let result: HashMap<_, _> = docs
            .into_iter()
            .filter(|doc| !doc.individuals.is_empty())
            .map(|doc| {
                let signings = doc.individuals.iter().map(|s| s.to_basic_info()).collect();
                (doc.id, signings)
            })
            .collect();

        debug!("Listed individual signings of {} CLA org documents", result.len());
        Ok(result)
    }
}

fn list_filter(opt: &IndividualSigningListOption) -> DocFilter {
    let non_empty = |s: &str| (!s.is_empty()).then(|| s.to_string());

    DocFilter {
        platform: Some(opt.platform.clone()),
        org_id: Some(opt.org_id.clone()),
        repo: match non_empty(&opt.repo_id) {
            Some(repo_id) => RepoFilter::Exact(repo_id),
            None => RepoFilter::Any,
        },
        cla_language: non_empty(&opt.cla_language),
        ..DocFilter::default().individual_signing(true)
    }
}

// ============================================================================
// Repo / org-wide precedence
// ============================================================================

/// Reduce the documents returned for a lookup to a signed answer.
///
/// Phase one looks only at documents of `repo_id`; if any was returned it
/// decides. Otherwise phase two takes the first matching signing of any
/// returned document.
pub(crate) fn resolve_signed(docs: &[DocumentMatch], repo_id: &str) -> bool {
    if !repo_id.is_empty() {
        if let Some(signed) = repo_specific_answer(docs, repo_id) {
            return signed;
        }
    }

    first_enabled(docs).unwrap_or(false)
}

/// `None` when no document of `repo_id` was returned
fn repo_specific_answer(docs: &[DocumentMatch], repo_id: &str) -> Option<bool> {
    let mut repo_docs = docs.iter().filter(|d| d.repo_id == repo_id).peekable();
    repo_docs.peek()?;

    Some(first_enabled(repo_docs).unwrap_or(false))
}

fn first_enabled<'a>(docs: impl IntoIterator<Item = &'a DocumentMatch>) -> Option<bool> {
    docs.into_iter()
        .find_map(|d| d.individuals.first())
        .map(|s| s.enabled)
}
