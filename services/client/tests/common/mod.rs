//! In-memory fakes for every port, plus a harness that wires them into an
//! `AppState` the same way the binary wires the HTTP adapters.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use client_lib::config::Config;
use client_lib::engine::{AppState, Ports};
use coursedocs_core::domain::{ClassEntity, ClassId, Credentials, Document, DocumentId, DocumentStatus, User};
use coursedocs_core::ports::{
    AuthService, ClassStore, ConfirmationService, DocumentService, PortError, PortResult, TokenStore,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use uuid::Uuid;

pub const EMAIL: &str = "ana@umd.edu";
pub const PASSWORD: &str = "correct horse";

pub fn doc(id: &str, status: Option<&str>) -> Document {
    Document {
        id: id.to_string(),
        filename: format!("{id}.pdf"),
        status: DocumentStatus::from_label(status.map(str::to_string)),
        uploaded_at: None,
    }
}

pub fn class(id: &str, name: &str) -> ClassEntity {
    ClassEntity {
        id: id.to_string(),
        name: name.to_string(),
        created_at: None,
    }
}

//=========================================================================================
// Auth
//=========================================================================================

#[derive(Default)]
pub struct FakeAuth {
    accounts: Mutex<HashMap<String, (String, User)>>,
    tokens: Mutex<HashMap<String, String>>,
    login_delay: Mutex<Duration>,
    identity_down: AtomicBool,
    issued: AtomicUsize,
    calls: AtomicUsize,
}

impl FakeAuth {
    pub fn with_account(email: &str, password: &str) -> Arc<Self> {
        let auth = Self::default();
        auth.add_account(email, password);
        Arc::new(auth)
    }

    fn add_account(&self, email: &str, password: &str) -> User {
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            created_at: Utc::now(),
        };
        self.accounts
            .lock()
            .unwrap()
            .insert(email.to_string(), (password.to_string(), user.clone()));
        user
    }

    /// Issues a valid token without going through login.
    pub fn issue_token(&self, email: &str) -> String {
        let token = format!("token-{}", self.issued.fetch_add(1, Ordering::SeqCst));
        self.tokens.lock().unwrap().insert(token.clone(), email.to_string());
        token
    }

    pub fn revoke_all(&self) {
        self.tokens.lock().unwrap().clear();
    }

    pub fn account(&self, email: &str) -> User {
        self.accounts.lock().unwrap()[email].1.clone()
    }

    pub fn set_login_delay(&self, delay: Duration) {
        *self.login_delay.lock().unwrap() = delay;
    }

    /// Makes `/auth/me` fail at the transport level.
    pub fn take_identity_down(&self) {
        self.identity_down.store(true, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn pause(&self) {
        let delay = *self.login_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl AuthService for FakeAuth {
    async fn login(&self, credentials: &Credentials) -> PortResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        let matches = self
            .accounts
            .lock()
            .unwrap()
            .get(&credentials.email)
            .is_some_and(|(password, _)| password == &credentials.password);
        if !matches {
            return Err(PortError::Rejected {
                status: 401,
                detail: "Invalid email or password".to_string(),
            });
        }
        Ok(self.issue_token(&credentials.email))
    }

    async fn register(&self, credentials: &Credentials) -> PortResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        if self.accounts.lock().unwrap().contains_key(&credentials.email) {
            return Err(PortError::Rejected {
                status: 400,
                detail: "Email already registered".to_string(),
            });
        }
        self.add_account(&credentials.email, &credentials.password);
        Ok(self.issue_token(&credentials.email))
    }

    async fn current_user(&self, token: &str) -> PortResult<User> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.identity_down.load(Ordering::SeqCst) {
            return Err(PortError::Unexpected("connection reset".to_string()));
        }
        let email = self
            .tokens
            .lock()
            .unwrap()
            .get(token)
            .cloned()
            .ok_or(PortError::Unauthorized)?;
        Ok(self.account(&email))
    }
}

//=========================================================================================
// Token Storage
//=========================================================================================

#[derive(Default)]
pub struct MemoryTokens {
    token: Mutex<Option<String>>,
}

impl MemoryTokens {
    pub fn holding(token: &str) -> Arc<Self> {
        Arc::new(Self {
            token: Mutex::new(Some(token.to_string())),
        })
    }

    pub fn stored(&self) -> Option<String> {
        self.token.lock().unwrap().clone()
    }
}

impl TokenStore for MemoryTokens {
    fn load(&self) -> PortResult<Option<String>> {
        Ok(self.stored())
    }

    fn save(&self, token: &str) -> PortResult<()> {
        *self.token.lock().unwrap() = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> PortResult<()> {
        *self.token.lock().unwrap() = None;
        Ok(())
    }
}

//=========================================================================================
// Documents
//=========================================================================================

/// Server-side document state per class, with knobs for latency and failure.
#[derive(Default)]
pub struct FakeDocuments {
    classes: Mutex<HashMap<ClassId, Vec<Document>>>,
    latency: Mutex<HashMap<ClassId, Duration>>,
    list_error: Mutex<Option<PortError>>,
    failing_deletes: AtomicBool,
    list_calls: Mutex<HashMap<ClassId, usize>>,
    delete_calls: AtomicUsize,
    uploads: Mutex<Vec<(ClassId, String)>>,
}

impl FakeDocuments {
    pub fn set_documents(&self, class_id: &str, documents: Vec<Document>) {
        self.classes.lock().unwrap().insert(class_id.to_string(), documents);
    }

    pub fn set_latency(&self, class_id: &str, latency: Duration) {
        self.latency.lock().unwrap().insert(class_id.to_string(), latency);
    }

    pub fn fail_lists_with(&self, error: Option<PortError>) {
        *self.list_error.lock().unwrap() = error;
    }

    pub fn fail_deletes(&self) {
        self.failing_deletes.store(true, Ordering::SeqCst);
    }

    pub fn list_calls(&self, class_id: &str) -> usize {
        self.list_calls.lock().unwrap().get(class_id).copied().unwrap_or(0)
    }

    pub fn total_list_calls(&self) -> usize {
        self.list_calls.lock().unwrap().values().sum()
    }

    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    pub fn uploads(&self) -> Vec<(ClassId, String)> {
        self.uploads.lock().unwrap().clone()
    }
}

#[async_trait]
impl DocumentService for FakeDocuments {
    async fn list_documents(&self, _token: &str, class_id: &ClassId) -> PortResult<Vec<Document>> {
        *self.list_calls.lock().unwrap().entry(class_id.clone()).or_default() += 1;
        let latency = self.latency.lock().unwrap().get(class_id).copied();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        if let Some(error) = self.list_error.lock().unwrap().clone() {
            return Err(error);
        }
        Ok(self.classes.lock().unwrap().get(class_id).cloned().unwrap_or_default())
    }

    async fn delete_document(&self, _token: &str, document_id: &DocumentId) -> PortResult<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_deletes.load(Ordering::SeqCst) {
            return Err(PortError::Unexpected("network unreachable".to_string()));
        }
        for documents in self.classes.lock().unwrap().values_mut() {
            documents.retain(|d| &d.id != document_id);
        }
        Ok(())
    }

    async fn upload_document(
        &self,
        _token: &str,
        class_id: &ClassId,
        filename: &str,
        _contents: Vec<u8>,
    ) -> PortResult<()> {
        let mut uploads = self.uploads.lock().unwrap();
        uploads.push((class_id.clone(), filename.to_string()));
        let id = format!("upload-{}", uploads.len());
        self.classes
            .lock()
            .unwrap()
            .entry(class_id.clone())
            .or_default()
            .push(Document {
                id,
                filename: filename.to_string(),
                status: DocumentStatus::Pending(Some("pending".to_string())),
                uploaded_at: Some(Utc::now()),
            });
        Ok(())
    }
}

//=========================================================================================
// Classes
//=========================================================================================

#[derive(Default)]
pub struct FakeClasses {
    classes: Mutex<Vec<ClassEntity>>,
    created: Mutex<Vec<String>>,
    deleted: Mutex<Vec<ClassId>>,
}

impl FakeClasses {
    pub fn with(classes: Vec<ClassEntity>) -> Arc<Self> {
        Arc::new(Self {
            classes: Mutex::new(classes),
            ..Self::default()
        })
    }

    pub fn remove(&self, class_id: &str) {
        self.classes.lock().unwrap().retain(|c| c.id != class_id);
    }

    pub fn created(&self) -> Vec<String> {
        self.created.lock().unwrap().clone()
    }

    pub fn deleted(&self) -> Vec<ClassId> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl ClassStore for FakeClasses {
    async fn list_classes(&self, _token: &str) -> PortResult<Vec<ClassEntity>> {
        Ok(self.classes.lock().unwrap().clone())
    }

    async fn create_class(&self, _token: &str, name: &str) -> PortResult<ClassEntity> {
        let mut created = self.created.lock().unwrap();
        created.push(name.to_string());
        let entity = class(&format!("class-{}", created.len()), name);
        self.classes.lock().unwrap().push(entity.clone());
        Ok(entity)
    }

    async fn delete_class(&self, _token: &str, class_id: &ClassId) -> PortResult<()> {
        self.deleted.lock().unwrap().push(class_id.clone());
        let mut classes = self.classes.lock().unwrap();
        let before = classes.len();
        classes.retain(|c| &c.id != class_id);
        if classes.len() == before {
            return Err(PortError::NotFound("Class not found".to_string()));
        }
        Ok(())
    }
}

//=========================================================================================
// Confirmation
//=========================================================================================

#[derive(Default)]
pub struct ScriptedConfirm {
    answer: AtomicBool,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedConfirm {
    pub fn answer(&self, yes: bool) {
        self.answer.store(yes, Ordering::SeqCst);
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

impl ConfirmationService for ScriptedConfirm {
    fn confirm(&self, prompt: &str) -> bool {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.answer.load(Ordering::SeqCst)
    }
}

//=========================================================================================
// Harness
//=========================================================================================

pub struct Harness {
    pub state: AppState,
    pub auth: Arc<FakeAuth>,
    pub tokens: Arc<MemoryTokens>,
    pub documents: Arc<FakeDocuments>,
    pub classes: Arc<FakeClasses>,
    pub confirm: Arc<ScriptedConfirm>,
}

impl Harness {
    /// A client holding a valid stored token for `EMAIL`, with classes
    /// `c1` and `c2` on the server.
    pub fn logged_in() -> Self {
        let auth = FakeAuth::with_account(EMAIL, PASSWORD);
        let tokens = MemoryTokens::holding(&auth.issue_token(EMAIL));
        Self::build(auth, tokens)
    }

    pub fn logged_out() -> Self {
        Self::build(FakeAuth::with_account(EMAIL, PASSWORD), Arc::new(MemoryTokens::default()))
    }

    fn build(auth: Arc<FakeAuth>, tokens: Arc<MemoryTokens>) -> Self {
        let documents = Arc::new(FakeDocuments::default());
        let classes = FakeClasses::with(vec![class("c1", "CMSC351"), class("c2", "MATH240")]);
        let confirm = Arc::new(ScriptedConfirm::default());
        let config = Config::from_lookup(|_| None).expect("default config");
        let state = AppState::new(
            Arc::new(config),
            Ports {
                auth: auth.clone(),
                documents: documents.clone(),
                classes: classes.clone(),
                tokens: tokens.clone(),
                confirm: confirm.clone(),
            },
        );
        Self {
            state,
            auth,
            tokens,
            documents,
            classes,
            confirm,
        }
    }

    /// Loads the class list and selects `class_id`.
    pub async fn select(&self, class_id: &str) {
        if self.state.catalog.classes().is_empty() {
            self.state.catalog.reload().await.expect("reload classes");
        }
        self.state.catalog.select(Some(class_id)).expect("select class");
    }
}

/// Waits until the watched value satisfies `pred`, failing after ten
/// (virtual) minutes.
pub async fn wait_for<T, F>(rx: &mut watch::Receiver<T>, pred: F) -> T
where
    T: Clone,
    F: Fn(&T) -> bool,
{
    tokio::time::timeout(Duration::from_secs(600), async {
        loop {
            {
                let value = rx.borrow_and_update();
                if pred(&value) {
                    return value.clone();
                }
            }
            rx.changed().await.expect("sender dropped");
        }
    })
    .await
    .expect("condition not reached in time")
}

/// Sleeps in small steps until `cond` holds, failing after ten (virtual) minutes.
pub async fn wait_until<F: Fn() -> bool>(cond: F) {
    tokio::time::timeout(Duration::from_secs(600), async {
        while !cond() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not reached in time")
}
