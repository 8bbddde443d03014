//! Signing scope for CLA org document lookups
//!
//! Every signing operation is scoped by (platform, org, repo). An empty
//! repo id addresses the org-wide default document that applies to all
//! repos of the org.

/// Scope passed to all signing operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningScope {
    pub platform: String,
    pub org_id: String,
    /// Empty means the org-wide default
    pub repo_id: String,
}

impl SigningScope {
    pub fn new(
        platform: impl Into<String>,
        org_id: impl Into<String>,
        repo_id: impl Into<String>,
    ) -> Self {
        Self {
            platform: platform.into(),
            org_id: org_id.into(),
            repo_id: repo_id.into(),
        }
    }

    /// Scope of the org-wide default document
    pub fn org_wide(platform: impl Into<String>, org_id: impl Into<String>) -> Self {
        Self::new(platform, org_id, "")
    }

    pub fn is_org_wide(&self) -> bool {
        self.repo_id.is_empty()
    }
}

impl std::fmt::Display for SigningScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_org_wide() {
            write!(f, "{}/{}", self.platform, self.org_id)
        } else {
            write!(f, "{}/{}/{}", self.platform, self.org_id, self.repo_id)
        }
    }
}
