//! services/client/src/engine/state.rs
//!
//! Wires the engine components together over a set of ports.

use crate::adapters::{
    build_client, FileTokenStore, HttpAuthAdapter, HttpBackend, HttpClassAdapter,
    HttpDocumentAdapter,
};
use crate::config::Config;
use crate::engine::{
    catalog::ClassCatalog, commands::CommandSurface, documents::DocumentSyncEngine,
    documents::SyncHandle, refresh::RefreshSignal, session::SessionStore,
};
use crate::error::ClientError;
use coursedocs_core::ports::{AuthService, ClassStore, ConfirmationService, DocumentService, TokenStore};
use std::sync::Arc;

/// The external services the engine talks to.
#[derive(Clone)]
pub struct Ports {
    pub auth: Arc<dyn AuthService>,
    pub documents: Arc<dyn DocumentService>,
    pub classes: Arc<dyn ClassStore>,
    pub tokens: Arc<dyn TokenStore>,
    pub confirm: Arc<dyn ConfirmationService>,
}

impl Ports {
    /// HTTP adapters for both services plus the file-backed token store.
    pub fn from_config(config: &Config, confirm: Arc<dyn ConfirmationService>) -> Result<Self, ClientError> {
        let client = build_client(config.request_timeout)?;
        let ingestion = HttpBackend::new(client.clone(), config.ingestion_url.clone());
        Ok(Self {
            auth: Arc::new(HttpAuthAdapter::new(HttpBackend::new(client, config.auth_url.clone()))),
            documents: Arc::new(HttpDocumentAdapter::new(ingestion.clone())),
            classes: Arc::new(HttpClassAdapter::new(ingestion)),
            tokens: Arc::new(FileTokenStore::new(config.token_path.clone())),
            confirm,
        })
    }
}

/// The shared client state, created once at startup.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub session: SessionStore,
    pub refresh: RefreshSignal,
    pub catalog: ClassCatalog,
    pub documents: DocumentSyncEngine,
    pub commands: CommandSurface,
}

impl AppState {
    pub fn new(config: Arc<Config>, ports: Ports) -> Self {
        let session = SessionStore::new(ports.auth, ports.tokens);
        let refresh = RefreshSignal::new();
        let catalog = ClassCatalog::new(ports.classes, session.clone());
        let documents = DocumentSyncEngine::new(
            ports.documents.clone(),
            session.clone(),
            config.poll_interval,
        );
        let commands = CommandSurface::new(
            catalog.clone(),
            ports.documents,
            session.clone(),
            refresh.clone(),
            ports.confirm,
        );
        Self {
            config,
            session,
            refresh,
            catalog,
            documents,
            commands,
        }
    }

    /// Starts the document sync engine on the catalog's selection and the
    /// refresh signal.
    pub fn start_sync(&self) -> SyncHandle {
        self.documents
            .spawn(self.catalog.subscribe_selection(), self.refresh.subscribe())
    }
}
