//! services/client/src/adapters/documents.rs
//!
//! This module contains the adapter for the ingestion service's document
//! endpoints. It implements the `DocumentService` port from the `core` crate.

use async_trait::async_trait;
use coursedocs_core::domain::{ClassId, Document, DocumentId, DocumentStatus};
use coursedocs_core::ports::{DocumentService, PortError, PortResult};
use reqwest::multipart::{Form, Part};
use serde::Deserialize;

use super::http::{expect_success, parse_timestamp, transport, HttpBackend, WireId};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements the `DocumentService` port against the ingestion service.
#[derive(Clone)]
pub struct HttpDocumentAdapter {
    backend: HttpBackend,
}

impl HttpDocumentAdapter {
    /// Creates a new `HttpDocumentAdapter`.
    pub fn new(backend: HttpBackend) -> Self {
        Self { backend }
    }
}

//=========================================================================================
// Wire Records
//=========================================================================================

/// The ingestion service has spelled the id and the filename two ways. Each
/// spelling is its own field; the first non-empty one wins.
#[derive(Deserialize)]
struct DocumentRecord {
    #[serde(default)]
    id: Option<WireId>,
    #[serde(default)]
    document_id: Option<WireId>,
    #[serde(default)]
    filename: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    uploaded_at: Option<String>,
}
impl DocumentRecord {
    fn to_domain(self) -> PortResult<Document> {
        let id = [self.id, self.document_id]
            .into_iter()
            .flatten()
            .map(WireId::into_string)
            .find(|id| !id.is_empty())
            .ok_or_else(|| PortError::Unexpected("Document record without an id".to_string()))?;
        let filename = [self.filename, self.name]
            .into_iter()
            .flatten()
            .find(|name| !name.is_empty())
            .unwrap_or_else(|| "untitled".to_string());
        Ok(Document {
            id,
            filename,
            status: DocumentStatus::from_label(self.status),
            uploaded_at: self.uploaded_at.as_deref().and_then(parse_timestamp),
        })
    }
}

//=========================================================================================
// `DocumentService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DocumentService for HttpDocumentAdapter {
    async fn list_documents(&self, token: &str, class_id: &ClassId) -> PortResult<Vec<Document>> {
        let response = self
            .backend
            .client()
            .get(self.backend.url("/documents"))
            .query(&[("class_id", class_id.as_str())])
            .bearer_auth(token)
            .send()
            .await
            .map_err(transport)?;

        let records: Vec<DocumentRecord> = expect_success(response, "Could not list documents")
            .await?
            .json()
            .await
            .map_err(transport)?;
        records.into_iter().map(DocumentRecord::to_domain).collect()
    }

    async fn delete_document(&self, token: &str, document_id: &DocumentId) -> PortResult<()> {
        let response = self
            .backend
            .client()
            .delete(self.backend.url(&format!("/documents/{}", document_id)))
            .bearer_auth(token)
            .send()
            .await
            .map_err(transport)?;

        expect_success(response, "Could not delete document").await?;
        Ok(())
    }

    async fn upload_document(
        &self,
        token: &str,
        class_id: &ClassId,
        filename: &str,
        contents: Vec<u8>,
    ) -> PortResult<()> {
        let form = Form::new()
            .text("class_id", class_id.clone())
            .part("files", Part::bytes(contents).file_name(filename.to_string()));

        let response = self
            .backend
            .client()
            .post(self.backend.url("/upload"))
            .bearer_auth(token)
            .multipart(form)
            .send()
            .await
            .map_err(transport)?;

        expect_success(response, "Could not upload document").await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(json: &str) -> PortResult<Vec<Document>> {
        let records: Vec<DocumentRecord> = serde_json::from_str(json).unwrap();
        records.into_iter().map(DocumentRecord::to_domain).collect()
    }

    #[test]
    fn ingestion_shape_is_decoded_in_order() {
        let docs = decode(
            r#"[
                {"id":"b2","filename":"week1.pdf","status":"processed","uploaded_at":"2024-09-01T10:00:00"},
                {"id":"a1","filename":"week2.pdf","status":"pending","uploaded_at":null}
            ]"#,
        )
        .unwrap();
        assert_eq!(docs[0].id, "b2");
        assert!(docs[0].status.is_processed());
        assert!(docs[0].uploaded_at.is_some());
        assert_eq!(docs[1].filename, "week2.pdf");
        assert_eq!(docs[1].status, DocumentStatus::Pending(Some("pending".into())));
    }

    #[test]
    fn alternate_field_names_are_accepted() {
        let docs = decode(r#"[{"document_id":7,"name":"notes.txt"}]"#).unwrap();
        assert_eq!(docs[0].id, "7");
        assert_eq!(docs[0].filename, "notes.txt");
        assert_eq!(docs[0].status, DocumentStatus::Pending(None));
    }

    #[test]
    fn both_spellings_together_fall_back_to_each_other() {
        let docs = decode(
            r#"[
                {"id":"a","document_id":"a","filename":"a.pdf","name":"ignored.pdf","status":"processed"},
                {"id":null,"document_id":9,"filename":null,"name":"x.pdf"},
                {"id":"c","filename":"","name":"fallback.pdf"},
                {"id":"","document_id":"d","filename":"d.pdf"}
            ]"#,
        )
        .unwrap();
        assert_eq!(docs[0].id, "a");
        assert_eq!(docs[0].filename, "a.pdf");
        assert_eq!(docs[1].id, "9");
        assert_eq!(docs[1].filename, "x.pdf");
        assert_eq!(docs[2].filename, "fallback.pdf");
        assert_eq!(docs[3].id, "d");
    }

    #[test]
    fn record_without_any_id_is_an_error() {
        assert!(matches!(
            decode(r#"[{"filename":"orphan.pdf"}]"#),
            Err(PortError::Unexpected(_))
        ));
    }
}
