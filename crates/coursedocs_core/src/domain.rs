//! crates/coursedocs_core/src/domain.rs
//!
//! Defines the pure, core data structures for the client.
//! These structs are independent of any transport or serialization format.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// The terminal processing status reported by the ingestion pipeline.
pub const PROCESSED_STATUS: &str = "processed";

/// Identifies a class. Opaque to the client.
pub type ClassId = String;

/// Identifies a document. Opaque to the client.
pub type DocumentId = String;

/// The identity record returned by the auth service for a bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// The authenticated-session state shared by every component of the client.
///
/// `user` is only ever present while `token` is present and was last
/// validated successfully.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub token: Option<String>,
    pub user: Option<User>,
    pub is_loading: bool,
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some() && self.user.is_some()
    }
}

/// Credentials submitted to the login and register endpoints.
#[derive(Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// A named group of documents owned by the current user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassEntity {
    pub id: ClassId,
    pub name: String,
    pub created_at: Option<DateTime<Utc>>,
}

/// Processing state of an uploaded document.
///
/// The server reports an open set of status strings. Only `"processed"` is
/// terminal; everything else, including a missing status, is pending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentStatus {
    Processed,
    Pending(Option<String>),
}

impl DocumentStatus {
    pub fn from_label(label: Option<String>) -> Self {
        match label {
            Some(label) if label == PROCESSED_STATUS => DocumentStatus::Processed,
            other => DocumentStatus::Pending(other),
        }
    }

    pub fn is_processed(&self) -> bool {
        matches!(self, DocumentStatus::Processed)
    }

    /// The label to show next to a document, if any.
    pub fn label(&self) -> Option<&str> {
        match self {
            DocumentStatus::Processed => Some(PROCESSED_STATUS),
            DocumentStatus::Pending(label) => label.as_deref(),
        }
    }
}

/// A document uploaded to a class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub id: DocumentId,
    pub filename: String,
    pub status: DocumentStatus,
    pub uploaded_at: Option<DateTime<Utc>>,
}

/// Returns true while at least one document still awaits processing.
pub fn has_pending(documents: &[Document]) -> bool {
    documents.iter().any(|doc| !doc.status.is_processed())
}
