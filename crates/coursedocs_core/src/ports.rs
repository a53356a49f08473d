//! crates/coursedocs_core/src/ports.rs
//!
//! Defines the service contracts (traits) the client engine depends on.
//! These traits form the boundary of the hexagonal architecture, allowing the
//! engine to be independent of the HTTP backends and of where the token lives.

use async_trait::async_trait;
use crate::domain::{ClassEntity, ClassId, Credentials, Document, DocumentId, User};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., network, disk).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Unauthorized")]
    Unauthorized,
    /// The server answered with a non-success status. `detail` is the
    /// human-readable message from the error body when one was sent.
    #[error("Request rejected ({status}): {detail}")]
    Rejected { status: u16, detail: String },
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait AuthService: Send + Sync {
    /// Exchanges credentials for a bearer token.
    async fn login(&self, credentials: &Credentials) -> PortResult<String>;

    /// Creates an account and returns a bearer token for it.
    async fn register(&self, credentials: &Credentials) -> PortResult<String>;

    /// Resolves the identity behind a bearer token.
    async fn current_user(&self, token: &str) -> PortResult<User>;
}

#[async_trait]
pub trait DocumentService: Send + Sync {
    /// Lists the documents of one class, in server order.
    async fn list_documents(&self, token: &str, class_id: &ClassId) -> PortResult<Vec<Document>>;

    async fn delete_document(&self, token: &str, document_id: &DocumentId) -> PortResult<()>;

    /// Uploads one file into a class. The server queues it for processing.
    async fn upload_document(
        &self,
        token: &str,
        class_id: &ClassId,
        filename: &str,
        contents: Vec<u8>,
    ) -> PortResult<()>;
}

#[async_trait]
pub trait ClassStore: Send + Sync {
    async fn list_classes(&self, token: &str) -> PortResult<Vec<ClassEntity>>;

    async fn create_class(&self, token: &str, name: &str) -> PortResult<ClassEntity>;

    async fn delete_class(&self, token: &str, class_id: &ClassId) -> PortResult<()>;
}

/// Durable storage for the bearer token, surviving process restarts.
pub trait TokenStore: Send + Sync {
    fn load(&self) -> PortResult<Option<String>>;

    fn save(&self, token: &str) -> PortResult<()>;

    /// Removes the stored token. Removing an absent token is not an error.
    fn clear(&self) -> PortResult<()>;
}

/// The gate in front of destructive operations.
pub trait ConfirmationService: Send + Sync {
    /// Asks the user to confirm `prompt`. Returns false when declined.
    fn confirm(&self, prompt: &str) -> bool;
}
