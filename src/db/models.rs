//! Diesel model definitions and signing record types
//!
//! - Queryable structs: for SELECT queries (reading data)
//! - Insertable structs: for INSERT queries (writing data)
//! - Serde structs: elements of the `individuals` JSON array

use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::diesel_schema::cla_orgs;
use super::scope::SigningScope;

/// `apply_to` value marking a CLA org document as individual signing storage
pub const APPLY_TO_INDIVIDUAL: &str = "individual";

/// `apply_to` value for corporation signing storage
pub const APPLY_TO_CORPORATION: &str = "corporation";

// ============================================================================
// Timestamp Helpers (SQLite stores timestamps as TEXT)
// ============================================================================

/// Get current UTC timestamp as ISO 8601 string for SQLite TEXT columns
pub fn current_timestamp() -> String {
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

// ============================================================================
// Identity Helpers
// ============================================================================

/// Corporation id derived from an email: its lower-cased domain.
///
/// Returns an empty string when the email has no domain part.
pub fn corporation_id_of(email: &str) -> String {
    match email.rsplit_once('@') {
        Some((_, domain)) => domain.trim().to_lowercase(),
        None => String::new(),
    }
}

// ============================================================================
// CLA Org Models
// ============================================================================

/// CLA org document from SELECT query
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = cla_orgs)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ClaOrg {
    pub id: String,
    pub platform: String,
    pub org_id: String,
    pub repo_id: String,
    pub cla_language: String,
    pub apply_to: String,
    pub enabled: i32,
    pub individuals: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// New CLA org document for INSERT.
///
/// CLA org documents are owned by org configuration management; this crate
/// only reads and mutates their `individuals` array.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = cla_orgs)]
pub struct NewClaOrg {
    pub id: String,
    pub platform: String,
    pub org_id: String,
    pub repo_id: String,
    pub cla_language: String,
    pub apply_to: String,
    pub enabled: i32,
    pub individuals: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl NewClaOrg {
    /// Enabled individual signing document with an empty array
    pub fn for_individuals(scope: &SigningScope, cla_language: &str) -> Self {
        let now = current_timestamp();
        Self {
            id: Uuid::new_v4().to_string(),
            platform: scope.platform.clone(),
            org_id: scope.org_id.clone(),
            repo_id: scope.repo_id.clone(),
            cla_language: cla_language.to_string(),
            apply_to: APPLY_TO_INDIVIDUAL.to_string(),
            enabled: 1,
            individuals: Some("[]".to_string()),
            created_at: now.clone(),
            updated_at: now,
        }
    }
}

// ============================================================================
// Individual Signing Models
// ============================================================================

/// One element of a CLA org's `individuals` array
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndividualSigningDoc {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub enabled: bool,
    pub date: String,
    #[serde(rename = "corp_id", default)]
    pub corporation_id: String,
    /// Opaque signing payload, stored verbatim
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<serde_json::Value>,
}

impl IndividualSigningDoc {
    /// Build the stored element, deriving `corp_id` from the email
    pub fn from_info(info: &IndividualSigningInfo) -> Self {
        Self {
            name: info.name.clone(),
            email: info.email.clone(),
            enabled: info.enabled,
            date: info.date.clone(),
            corporation_id: corporation_id_of(&info.email),
            info: info.info.clone(),
        }
    }

    pub fn to_basic_info(&self) -> IndividualSigningBasicInfo {
        IndividualSigningBasicInfo {
            email: self.email.clone(),
            name: self.name.clone(),
            enabled: self.enabled,
            date: self.date.clone(),
        }
    }
}

/// Input for signing as an individual
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndividualSigningInfo {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub enabled: bool,
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<serde_json::Value>,
}

/// Individual signing without the signing payload (list responses)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndividualSigningBasicInfo {
    pub email: String,
    pub name: String,
    pub enabled: bool,
    pub date: String,
}

/// Filter for listing individual signings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndividualSigningListOption {
    pub platform: String,
    pub org_id: String,
    /// Empty lists every repo of the org
    #[serde(default)]
    pub repo_id: String,
    /// Empty lists every CLA language
    #[serde(default)]
    pub cla_language: String,
    /// Restrict to signers under one corporation
    #[serde(default)]
    pub corporation_id: Option<String>,
}

impl IndividualSigningListOption {
    pub fn new(platform: impl Into<String>, org_id: impl Into<String>) -> Self {
        Self {
            platform: platform.into(),
            org_id: org_id.into(),
            ..Default::default()
        }
    }

    pub fn with_repo(mut self, repo_id: impl Into<String>) -> Self {
        self.repo_id = repo_id.into();
        self
    }

    pub fn with_cla_language(mut self, cla_language: impl Into<String>) -> Self {
        self.cla_language = cla_language.into();
        self
    }

    pub fn with_corporation_id(mut self, corporation_id: impl Into<String>) -> Self {
        self.corporation_id = Some(corporation_id.into());
        self
    }

    /// Restrict to the corporation an email belongs to
    pub fn with_corporation_email(mut self, email: &str) -> Self {
        self.corporation_id = Some(corporation_id_of(email));
        self
    }
}
