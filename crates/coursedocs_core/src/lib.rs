pub mod domain;
pub mod ports;

pub use domain::{
    has_pending, ClassEntity, ClassId, Credentials, Document, DocumentId, DocumentStatus, Session,
    User, PROCESSED_STATUS,
};
pub use ports::{
    AuthService, ClassStore, ConfirmationService, DocumentService, PortError, PortResult,
    TokenStore,
};
