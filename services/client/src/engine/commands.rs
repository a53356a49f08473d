//! services/client/src/engine/commands.rs
//!
//! The mutating commands: create and delete classes, delete and upload
//! documents. Document changes are followed by a refresh pulse so the sync
//! engine reconciles with the server.

use coursedocs_core::domain::{ClassId, DocumentId};
use coursedocs_core::ports::{ConfirmationService, DocumentService, PortError, PortResult};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::engine::catalog::ClassCatalog;
use crate::engine::refresh::RefreshSignal;
use crate::engine::session::SessionStore;
use crate::error::ClientError;

/// How a command ended when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    Completed,
    /// The user did not confirm a destructive command.
    Declined,
    /// The input was rejected before any request was made.
    Rejected,
}

#[derive(Clone)]
pub struct CommandSurface {
    catalog: ClassCatalog,
    documents: Arc<dyn DocumentService>,
    session: SessionStore,
    refresh: RefreshSignal,
    confirm: Arc<dyn ConfirmationService>,
    create_dialog_open: Arc<AtomicBool>,
}

impl CommandSurface {
    pub fn new(
        catalog: ClassCatalog,
        documents: Arc<dyn DocumentService>,
        session: SessionStore,
        refresh: RefreshSignal,
        confirm: Arc<dyn ConfirmationService>,
    ) -> Self {
        Self {
            catalog,
            documents,
            session,
            refresh,
            confirm,
            create_dialog_open: Arc::new(AtomicBool::new(false)),
        }
    }

    //=====================================================================================
    // Class Creation
    //=====================================================================================

    pub fn open_create_dialog(&self) {
        self.create_dialog_open.store(true, Ordering::SeqCst);
    }

    pub fn cancel_create_dialog(&self) {
        self.create_dialog_open.store(false, Ordering::SeqCst);
    }

    pub fn is_create_dialog_open(&self) -> bool {
        self.create_dialog_open.load(Ordering::SeqCst)
    }

    /// Creates a class named `name`, trimmed. Blank names never reach the
    /// network and leave the dialog open.
    pub async fn create_class(&self, name: &str) -> Result<CommandOutcome, ClientError> {
        let name = name.trim();
        if name.is_empty() {
            debug!("Ignoring class creation with a blank name.");
            return Ok(CommandOutcome::Rejected);
        }
        self.cancel_create_dialog();
        self.catalog.create(name).await?;
        Ok(CommandOutcome::Completed)
    }

    //=====================================================================================
    // Destructive Commands
    //=====================================================================================

    pub async fn delete_class(&self, class_id: &ClassId) -> Result<CommandOutcome, ClientError> {
        let name = self
            .catalog
            .classes()
            .into_iter()
            .find(|c| &c.id == class_id)
            .map(|c| c.name)
            .unwrap_or_else(|| class_id.clone());
        let prompt = format!(
            "Are you sure you want to delete \"{}\"? This action cannot be undone.",
            name
        );
        if !self.confirm.confirm(&prompt) {
            return Ok(CommandOutcome::Declined);
        }

        self.catalog.delete(class_id).await?;
        self.refresh.trigger();
        Ok(CommandOutcome::Completed)
    }

    /// Deletes one document, then pulses the refresh signal whatever the
    /// outcome, so the displayed list always reconciles with the server.
    pub async fn delete_document(&self, document_id: &DocumentId) -> Result<CommandOutcome, ClientError> {
        if !self.confirm.confirm("Delete this document?") {
            return Ok(CommandOutcome::Declined);
        }

        let result = match self.session.token() {
            Some(token) => self.documents.delete_document(&token, document_id).await,
            None => Err(PortError::Unauthorized),
        };
        self.refresh.trigger();

        self.settle(result, "delete document").await?;
        info!("Deleted document {}.", document_id);
        Ok(CommandOutcome::Completed)
    }

    //=====================================================================================
    // Uploads
    //=====================================================================================

    /// Uploads a file into a class. New documents start out pending, so the
    /// refresh pulse puts the sync engine into polling.
    pub async fn upload_document(
        &self,
        class_id: &ClassId,
        filename: &str,
        contents: Vec<u8>,
    ) -> Result<CommandOutcome, ClientError> {
        let token = self
            .session
            .token()
            .ok_or(ClientError::Port(PortError::Unauthorized))?;
        let size = contents.len();
        let result = self
            .documents
            .upload_document(&token, class_id, filename, contents)
            .await;
        self.settle(result, "upload document").await?;

        info!("Uploaded {} ({} bytes) to class {}.", filename, size, class_id);
        self.refresh.trigger();
        Ok(CommandOutcome::Completed)
    }

    async fn settle(&self, result: PortResult<()>, action: &str) -> Result<(), ClientError> {
        if let Err(err) = result {
            warn!("Could not {}: {}", action, err);
            if err == PortError::Unauthorized && self.session.token().is_some() {
                self.session.revalidate().await;
            }
            return Err(err.into());
        }
        Ok(())
    }
}
