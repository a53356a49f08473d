//! services/client/src/adapters/classes.rs
//!
//! This module contains the adapter for the ingestion service's class
//! endpoints. It implements the `ClassStore` port from the `core` crate.

use async_trait::async_trait;
use coursedocs_core::domain::{ClassEntity, ClassId};
use coursedocs_core::ports::{ClassStore, PortResult};
use serde::Deserialize;

use super::http::{expect_success, parse_timestamp, transport, HttpBackend, WireId};

/// An adapter that implements the `ClassStore` port against the ingestion service.
#[derive(Clone)]
pub struct HttpClassAdapter {
    backend: HttpBackend,
}

impl HttpClassAdapter {
    /// Creates a new `HttpClassAdapter`.
    pub fn new(backend: HttpBackend) -> Self {
        Self { backend }
    }
}

#[derive(Deserialize)]
struct ClassRecord {
    id: WireId,
    name: String,
    #[serde(default)]
    created_at: Option<String>,
}
impl ClassRecord {
    fn to_domain(self) -> ClassEntity {
        ClassEntity {
            id: self.id.into_string(),
            name: self.name,
            created_at: self.created_at.as_deref().and_then(parse_timestamp),
        }
    }
}

#[async_trait]
impl ClassStore for HttpClassAdapter {
    async fn list_classes(&self, token: &str) -> PortResult<Vec<ClassEntity>> {
        let response = self
            .backend
            .client()
            .get(self.backend.url("/classes"))
            .bearer_auth(token)
            .send()
            .await
            .map_err(transport)?;

        let records: Vec<ClassRecord> = expect_success(response, "Could not list classes")
            .await?
            .json()
            .await
            .map_err(transport)?;
        Ok(records.into_iter().map(ClassRecord::to_domain).collect())
    }

    async fn create_class(&self, token: &str, name: &str) -> PortResult<ClassEntity> {
        // The ingestion service takes the name as a form field, not JSON.
        let response = self
            .backend
            .client()
            .post(self.backend.url("/classes"))
            .bearer_auth(token)
            .form(&[("name", name)])
            .send()
            .await
            .map_err(transport)?;

        let record: ClassRecord = expect_success(response, "Could not create class")
            .await?
            .json()
            .await
            .map_err(transport)?;
        Ok(record.to_domain())
    }

    async fn delete_class(&self, token: &str, class_id: &ClassId) -> PortResult<()> {
        let response = self
            .backend
            .client()
            .delete(self.backend.url(&format!("/classes/{}", class_id)))
            .bearer_auth(token)
            .send()
            .await
            .map_err(transport)?;

        expect_success(response, "Could not delete class").await?;
        Ok(())
    }
}
