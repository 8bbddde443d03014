//! CLA Signing Store - transactional storage for individual CLA signings
//!
//! Individual signings are kept as elements of an array nested in a CLA org
//! document, one document per (platform, org, repo). An org-wide document
//! (empty repo) applies to every repo of the org that has no document of
//! its own.
//!
//! ## Guarantees
//!
//! | Operation | Guarantee |
//! |-----------|-----------|
//! | `sign` | at most one signing per (corp_id, email) in a document, race-free |
//! | `unsign` | idempotent delete |
//! | `set_enabled` | `NotFound` when no signing matches |
//! | `is_signed` | repo-specific document takes precedence over the org default |
//! | `list_signed` | documents without matching signings are omitted |
//!
//! ## Storage Layout
//!
//! ```text
//! ~/.local/share/cla-signing-store/
//! ├── cla-signing.db         # SQLite database (WAL)
//! └── config.toml            # Configuration
//! ```

pub mod config;
pub mod db;
pub mod error;

// Re-exports
pub use config::Config;
pub use db::{
    ClaDb, DbPool, IndividualSigningBasicInfo, IndividualSigningInfo, IndividualSigningListOption,
    NewClaOrg, SigningScope,
};
pub use error::{ErrorKind, StorageError};
