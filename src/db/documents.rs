//! Nested-array access over CLA org documents
//!
//! A CLA org document keeps its individual signings as a JSON array in the
//! `individuals` column. The functions here give that array the operations
//! of an embedded sub-collection: filtered reads, element existence checks
//! and push / pull / update of elements addressed by an [`ElementFilter`].
//!
//! None of them open a transaction. Writers call them from inside
//! [`ClaDb::do_transaction`](super::ClaDb::do_transaction) so that a check and
//! the mutation that depends on it commit together.

use diesel::prelude::*;
use tracing::debug;

use super::diesel_schema::cla_orgs;
use super::models::{
    corporation_id_of, current_timestamp, ClaOrg, IndividualSigningDoc, APPLY_TO_INDIVIDUAL,
};
use super::scope::SigningScope;
use crate::error::StorageError;

// ============================================================================
// Filters
// ============================================================================

/// Which `repo_id` values a document filter accepts
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RepoFilter {
    #[default]
    Any,
    Exact(String),
    OneOf(Vec<String>),
}

/// Filter over CLA org document fields
#[derive(Debug, Clone, Default)]
pub struct DocFilter {
    pub id: Option<String>,
    pub platform: Option<String>,
    pub org_id: Option<String>,
    pub repo: RepoFilter,
    pub cla_language: Option<String>,
    pub apply_to: Option<String>,
    pub enabled: Option<bool>,
    /// Only documents whose `individuals` field holds an array
    pub require_array: bool,
}

impl DocFilter {
    pub fn by_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Default::default()
        }
    }

    /// Enabled individual signing documents of exactly this scope
    pub fn for_individual_signing(scope: &SigningScope, require_array: bool) -> Self {
        Self {
            platform: Some(scope.platform.clone()),
            org_id: Some(scope.org_id.clone()),
            repo: RepoFilter::Exact(scope.repo_id.clone()),
            ..Self::default().individual_signing(require_array)
        }
    }

    /// Restrict to enabled individual signing documents
    pub fn individual_signing(mut self, require_array: bool) -> Self {
        self.apply_to = Some(APPLY_TO_INDIVIDUAL.to_string());
        self.enabled = Some(true);
        self.require_array = require_array;
        self
    }
}

/// Predicate selecting elements of the `individuals` array
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ElementFilter {
    pub corporation_id: Option<String>,
    pub email: Option<String>,
}

impl ElementFilter {
    /// Matches every element
    pub fn any() -> Self {
        Self::default()
    }

    /// Identity key of an individual signer: (corp_id, email)
    pub fn identity(email: &str) -> Self {
        Self {
            corporation_id: Some(corporation_id_of(email)),
            email: Some(email.to_string()),
        }
    }

    pub fn corporation(corporation_id: impl Into<String>) -> Self {
        Self {
            corporation_id: Some(corporation_id.into()),
            email: None,
        }
    }

    pub fn matches(&self, doc: &IndividualSigningDoc) -> bool {
        self.corporation_id
            .as_ref()
            .map_or(true, |c| doc.corporation_id == *c)
            && self.email.as_ref().map_or(true, |e| doc.email == *e)
    }
}

// ============================================================================
// Array Field
// ============================================================================

/// Decoded state of a document's `individuals` field
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayField {
    /// Column is NULL
    Missing,
    /// Column holds JSON that is not an array
    WrongShape,
    Elements(Vec<IndividualSigningDoc>),
}

impl ArrayField {
    pub fn parse(raw: Option<&str>) -> Result<Self, serde_json::Error> {
        let Some(raw) = raw else {
            return Ok(ArrayField::Missing);
        };

        match serde_json::from_str::<serde_json::Value>(raw)? {
            serde_json::Value::Array(items) => {
                let elements = items
                    .into_iter()
                    .map(serde_json::from_value)
                    .collect::<Result<Vec<IndividualSigningDoc>, _>>()?;
                Ok(ArrayField::Elements(elements))
            }
            _ => Ok(ArrayField::WrongShape),
        }
    }

    pub fn is_array(&self) -> bool {
        matches!(self, ArrayField::Elements(_))
    }

    pub fn elements(&self) -> &[IndividualSigningDoc] {
        match self {
            ArrayField::Elements(elements) => elements,
            _ => &[],
        }
    }
}

/// A matched document projected onto its matching array elements
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentMatch {
    pub id: String,
    pub repo_id: String,
    pub individuals: Vec<IndividualSigningDoc>,
}

// ============================================================================
// Read Operations
// ============================================================================

/// Load documents matching `filter` with their decoded arrays
fn load_documents(
    conn: &mut SqliteConnection,
    filter: &DocFilter,
) -> Result<Vec<(ClaOrg, ArrayField)>, StorageError> {
    let mut query = cla_orgs::table.into_boxed();

    if let Some(ref id) = filter.id {
        query = query.filter(cla_orgs::id.eq(id));
    }
    if let Some(ref platform) = filter.platform {
        query = query.filter(cla_orgs::platform.eq(platform));
    }
    if let Some(ref org_id) = filter.org_id {
        query = query.filter(cla_orgs::org_id.eq(org_id));
    }
    match filter.repo {
        RepoFilter::Any => {}
        RepoFilter::Exact(ref repo_id) => {
            query = query.filter(cla_orgs::repo_id.eq(repo_id));
        }
        RepoFilter::OneOf(ref repo_ids) => {
            query = query.filter(cla_orgs::repo_id.eq_any(repo_ids));
        }
    }
    if let Some(ref lang) = filter.cla_language {
        query = query.filter(cla_orgs::cla_language.eq(lang));
    }
    if let Some(ref apply_to) = filter.apply_to {
        query = query.filter(cla_orgs::apply_to.eq(apply_to));
    }
    if let Some(enabled) = filter.enabled {
        query = query.filter(cla_orgs::enabled.eq(i32::from(enabled)));
    }

    let docs: Vec<ClaOrg> = query
        .order((cla_orgs::created_at.asc(), cla_orgs::id.asc()))
        .load(conn)?;

    let mut results = Vec::with_capacity(docs.len());
    for doc in docs {
        let field = ArrayField::parse(doc.individuals.as_deref()).map_err(|e| {
            StorageError::MalformedDocument {
                id: doc.id.clone(),
                reason: format!("individuals: {}", e),
            }
        })?;

        if filter.require_array && !field.is_array() {
            continue;
        }
        results.push((doc, field));
    }

    debug!("{} CLA org documents matched {:?}", results.len(), filter);
    Ok(results)
}

/// Documents matching `filter`, each projected onto the elements matching
/// `elements`. Documents without a matching element are still returned.
pub fn find_documents(
    conn: &mut SqliteConnection,
    filter: &DocFilter,
    elements: &ElementFilter,
) -> Result<Vec<DocumentMatch>, StorageError> {
    let docs = load_documents(conn, filter)?;

    Ok(docs
        .into_iter()
        .map(|(doc, field)| DocumentMatch {
            individuals: field
                .elements()
                .iter()
                .filter(|e| elements.matches(e))
                .cloned()
                .collect(),
            id: doc.id,
            repo_id: doc.repo_id,
        })
        .collect())
}

/// Whether any document matching `filter` holds an element matching `index`
pub fn element_exists(
    conn: &mut SqliteConnection,
    filter: &DocFilter,
    index: &ElementFilter,
) -> Result<bool, StorageError> {
    let docs = load_documents(conn, filter)?;
    Ok(docs
        .iter()
        .any(|(_, field)| field.elements().iter().any(|e| index.matches(e))))
}

// ============================================================================
// Write Operations
// ============================================================================

fn write_array(
    conn: &mut SqliteConnection,
    id: &str,
    elements: &[IndividualSigningDoc],
) -> Result<(), StorageError> {
    let json = serde_json::to_string(elements)?;

    diesel::update(cla_orgs::table.filter(cla_orgs::id.eq(id)))
        .set((
            cla_orgs::individuals.eq(Some(json)),
            cla_orgs::updated_at.eq(current_timestamp()),
        ))
        .execute(conn)?;

    Ok(())
}

/// Append `element` to the first document matching `filter`.
///
/// A missing array is created. Returns the number of documents updated.
pub fn push_element(
    conn: &mut SqliteConnection,
    filter: &DocFilter,
    element: &IndividualSigningDoc,
) -> Result<usize, StorageError> {
    let Some((doc, field)) = load_documents(conn, filter)?.into_iter().next() else {
        return Ok(0);
    };

    let mut elements = match field {
        ArrayField::Elements(elements) => elements,
        ArrayField::Missing => Vec::new(),
        ArrayField::WrongShape => {
            return Err(StorageError::MalformedDocument {
                id: doc.id,
                reason: "individuals is not an array".to_string(),
            })
        }
    };

    elements.push(element.clone());
    write_array(conn, &doc.id, &elements)?;

    Ok(1)
}

/// Remove elements matching `index` from every document matching `filter`.
///
/// Returns the number of elements removed.
pub fn pull_element(
    conn: &mut SqliteConnection,
    filter: &DocFilter,
    index: &ElementFilter,
) -> Result<usize, StorageError> {
    let mut removed = 0;

    for (doc, field) in load_documents(conn, filter)? {
        let ArrayField::Elements(mut elements) = field else {
            continue;
        };

        let before = elements.len();
        elements.retain(|e| !index.matches(e));
        if elements.len() == before {
            continue;
        }

        removed += before - elements.len();
        write_array(conn, &doc.id, &elements)?;
    }

    Ok(removed)
}

/// Apply `patch` to the elements matching `index` in the first document
/// matching `filter` that holds such an element.
///
/// Returns the number of documents updated (0 or 1).
pub fn update_element<F>(
    conn: &mut SqliteConnection,
    filter: &DocFilter,
    index: &ElementFilter,
    mut patch: F,
) -> Result<usize, StorageError>
where
    F: FnMut(&mut IndividualSigningDoc),
{
    let target = load_documents(conn, filter)?.into_iter().find_map(|(doc, field)| match field {
        ArrayField::Elements(elements) if elements.iter().any(|e| index.matches(e)) => {
            Some((doc, elements))
        }
        _ => None,
    });

    let Some((doc, mut elements)) = target else {
        return Ok(0);
    };

    elements
        .iter_mut()
        .filter(|e| index.matches(e))
        .for_each(&mut patch);
    write_array(conn, &doc.id, &elements)?;

    Ok(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signing(email: &str, enabled: bool) -> IndividualSigningDoc {
        IndividualSigningDoc {
            name: email.split('@').next().unwrap_or_default().to_string(),
            email: email.to_string(),
            enabled,
            date: "2024-01-01".to_string(),
            corporation_id: corporation_id_of(email),
            info: None,
        }
    }

    #[test]
    fn test_identity_filter_matches_corp_and_email() {
        let index = ElementFilter::identity("alice@acme.com");
        assert!(index.matches(&signing("alice@acme.com", true)));
        assert!(!index.matches(&signing("bob@acme.com", true)));

        let mut stale = signing("alice@acme.com", true);
        stale.corporation_id = "other.com".to_string();
        assert!(!index.matches(&stale));
    }

    #[test]
    fn test_corporation_filter() {
        let filter = ElementFilter::corporation("acme.com");
        assert!(filter.matches(&signing("alice@acme.com", true)));
        assert!(filter.matches(&signing("bob@acme.com", false)));
        assert!(!filter.matches(&signing("carol@other.org", true)));
        assert!(ElementFilter::any().matches(&signing("carol@other.org", true)));
    }

    #[test]
    fn test_array_field_parse() {
        assert_eq!(ArrayField::parse(None).unwrap(), ArrayField::Missing);
        assert_eq!(ArrayField::parse(Some("{}")).unwrap(), ArrayField::WrongShape);
        assert_eq!(ArrayField::parse(Some("\"x\"")).unwrap(), ArrayField::WrongShape);
        assert_eq!(ArrayField::parse(Some("[]")).unwrap(), ArrayField::Elements(vec![]));

        let raw = serde_json::to_string(&vec![signing("a@b.com", true)]).unwrap();
        let field = ArrayField::parse(Some(&raw)).unwrap();
        assert!(field.is_array());
        assert_eq!(field.elements().len(), 1);
        assert_eq!(field.elements()[0].corporation_id, "b.com");
    }

    #[test]
    fn test_array_field_rejects_malformed_elements() {
        assert!(ArrayField::parse(Some("[{\"email\": 3}]")).is_err());
        assert!(ArrayField::parse(Some("not json")).is_err());
    }

    #[test]
    fn test_scope_filter() {
        let filter = DocFilter::for_individual_signing(&SigningScope::new("github", "o", "r"), true);
        assert_eq!(filter.repo, RepoFilter::Exact("r".to_string()));
        assert_eq!(filter.apply_to.as_deref(), Some(APPLY_TO_INDIVIDUAL));
        assert_eq!(filter.enabled, Some(true));
        assert!(filter.require_array);
        assert!(filter.id.is_none());
    }
}
