//! services/client/src/engine/catalog.rs
//!
//! The class catalog: the user's classes and the one that is selected.
//! The document sync engine follows the selection through a watch receiver.

use coursedocs_core::domain::{ClassEntity, ClassId};
use coursedocs_core::ports::{ClassStore, PortError, PortResult};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::engine::session::SessionStore;
use crate::error::ClientError;

#[derive(Clone)]
pub struct ClassCatalog {
    store: Arc<dyn ClassStore>,
    session: SessionStore,
    classes: Arc<watch::Sender<Vec<ClassEntity>>>,
    selected: Arc<watch::Sender<Option<ClassId>>>,
}

impl ClassCatalog {
    pub fn new(store: Arc<dyn ClassStore>, session: SessionStore) -> Self {
        let (classes, _) = watch::channel(Vec::new());
        let (selected, _) = watch::channel(None);
        Self {
            store,
            session,
            classes: Arc::new(classes),
            selected: Arc::new(selected),
        }
    }

    pub fn classes(&self) -> Vec<ClassEntity> {
        self.classes.borrow().clone()
    }

    pub fn selected_id(&self) -> Option<ClassId> {
        self.selected.borrow().clone()
    }

    pub fn selected(&self) -> Option<ClassEntity> {
        let selected = self.selected.borrow();
        let id = selected.as_ref()?;
        self.classes.borrow().iter().find(|c| &c.id == id).cloned()
    }

    /// A receiver notified whenever the selection changes.
    pub fn subscribe_selection(&self) -> watch::Receiver<Option<ClassId>> {
        self.selected.subscribe()
    }

    /// Selects a known class, or clears the selection with `None`.
    /// Re-selecting the current class is a no-op.
    pub fn select(&self, class_id: Option<&str>) -> Result<(), ClientError> {
        if let Some(id) = class_id {
            if !self.classes.borrow().iter().any(|c| c.id == id) {
                return Err(PortError::NotFound(format!("class {}", id)).into());
            }
        }
        let next = class_id.map(str::to_string);
        self.selected.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            *current = next;
            true
        });
        Ok(())
    }

    /// Replaces the class list with the server's. A selection that no longer
    /// exists is dropped.
    pub async fn reload(&self) -> Result<Vec<ClassEntity>, ClientError> {
        let token = self.token()?;
        let classes = self.checked(self.store.list_classes(&token).await).await?;
        info!("Loaded {} classes.", classes.len());
        self.classes.send_replace(classes.clone());

        let stale = self
            .selected_id()
            .filter(|id| !classes.iter().any(|c| &c.id == id));
        if stale.is_some() {
            self.selected.send_replace(None);
        }
        Ok(classes)
    }

    pub async fn create(&self, name: &str) -> Result<ClassEntity, ClientError> {
        let token = self.token()?;
        let class = self.checked(self.store.create_class(&token, name).await).await?;
        info!("Created class '{}' ({}).", class.name, class.id);
        self.classes.send_modify(|classes| {
            classes.retain(|c| c.id != class.id);
            classes.push(class.clone());
        });
        Ok(class)
    }

    /// Deletes a class server-side and forgets it locally, deselecting it if
    /// it was selected.
    pub async fn delete(&self, class_id: &ClassId) -> Result<(), ClientError> {
        let token = self.token()?;
        self.checked(self.store.delete_class(&token, class_id).await).await?;
        info!("Deleted class {}.", class_id);
        self.classes.send_modify(|classes| classes.retain(|c| &c.id != class_id));
        if self.selected_id().as_ref() == Some(class_id) {
            self.selected.send_replace(None);
        }
        Ok(())
    }

    fn token(&self) -> Result<String, ClientError> {
        self.session
            .token()
            .ok_or(ClientError::Port(PortError::Unauthorized))
    }

    /// Passes results through; a rejected token triggers revalidation first.
    async fn checked<T>(&self, result: PortResult<T>) -> Result<T, ClientError> {
        if let Err(PortError::Unauthorized) = &result {
            warn!("Class request was unauthorized, revalidating session.");
            self.session.revalidate().await;
        }
        Ok(result?)
    }
}
