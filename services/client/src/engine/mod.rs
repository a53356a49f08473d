pub mod catalog;
pub mod commands;
pub mod documents;
pub mod refresh;
pub mod session;
pub mod state;

// Re-export the engine components so the binary and tests can reach them
// without spelling out the module layout.
pub use catalog::ClassCatalog;
pub use commands::{CommandOutcome, CommandSurface};
pub use documents::{DocumentSnapshot, DocumentSyncEngine, SyncHandle, SyncPhase};
pub use refresh::RefreshSignal;
pub use session::SessionStore;
pub use state::{AppState, Ports};
