pub mod auth;
pub mod classes;
pub mod confirm;
pub mod documents;
pub mod http;
pub mod token_file;

pub use auth::HttpAuthAdapter;
pub use classes::HttpClassAdapter;
pub use confirm::{AssumeYes, TerminalConfirm};
pub use documents::HttpDocumentAdapter;
pub use http::{build_client, HttpBackend};
pub use token_file::FileTokenStore;
