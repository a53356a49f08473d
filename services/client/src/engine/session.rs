//! services/client/src/engine/session.rs
//!
//! The session store: owns the bearer token and the identity behind it, and
//! is the single place where either changes.
//!
//! Every token change is followed by an identity fetch. A failed fetch means
//! the token is dead, and the store falls back to logged-out.
//!
//! Each login or register takes a fresh generation when it starts, and logout
//! bumps the generation too. A flow only writes to the session while its
//! generation is still the current one, so logout and newer flows win over
//! older ones. Generation checks and writes happen under the state lock.

use coursedocs_core::domain::{Credentials, Session, User};
use coursedocs_core::ports::{AuthService, PortError, TokenStore};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::ClientError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AuthFlow {
    Login,
    Register,
}

impl AuthFlow {
    fn name(self) -> &'static str {
        match self {
            AuthFlow::Login => "login",
            AuthFlow::Register => "register",
        }
    }
}

/// Shared handle to the authenticated session. Clones observe the same state.
#[derive(Clone)]
pub struct SessionStore {
    auth: Arc<dyn AuthService>,
    tokens: Arc<dyn TokenStore>,
    state: Arc<watch::Sender<Session>>,
    generation: Arc<AtomicU64>,
    in_flight: Arc<AtomicUsize>,
}

impl SessionStore {
    /// Creates the store, picking up a durable token if one exists.
    ///
    /// The identity behind that token is not known until [`SessionStore::init`]
    /// has run.
    pub fn new(auth: Arc<dyn AuthService>, tokens: Arc<dyn TokenStore>) -> Self {
        let token = tokens.load().unwrap_or_else(|e| {
            warn!("Could not read the stored token, starting logged out: {}", e);
            None
        });
        let (state, _) = watch::channel(Session {
            token,
            ..Session::default()
        });
        Self {
            auth,
            tokens,
            state: Arc::new(state),
            generation: Arc::new(AtomicU64::new(0)),
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Startup hook: revalidates a token carried over from a previous run.
    pub async fn init(&self) -> Option<User> {
        if self.token().is_none() {
            return None;
        }
        info!("Found a stored token, revalidating identity...");
        self.revalidate().await
    }

    //=====================================================================================
    // Readers
    //=====================================================================================

    pub fn snapshot(&self) -> Session {
        self.state.borrow().clone()
    }

    pub fn token(&self) -> Option<String> {
        self.state.borrow().token.clone()
    }

    pub fn user(&self) -> Option<User> {
        self.state.borrow().user.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().is_loading
    }

    /// A receiver notified on every session change.
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    //=====================================================================================
    // Operations
    //=====================================================================================

    /// Exchanges credentials for a token and loads the identity behind it.
    ///
    /// On failure the session is cleared and the error is returned so the
    /// caller can show it. A logout, or a login started later, supersedes this
    /// one: it then leaves the session alone.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, ClientError> {
        self.authenticate(AuthFlow::Login, credentials(email, password)).await
    }

    /// Creates an account, then behaves exactly like [`SessionStore::login`].
    pub async fn register(&self, email: &str, password: &str) -> Result<User, ClientError> {
        self.authenticate(AuthFlow::Register, credentials(email, password)).await
    }

    /// Drops the token and identity, including the durable copy. No network call.
    pub fn logout(&self) {
        if self.token().is_some() {
            info!("Logging out.");
        }
        self.clear_if_current(None);
    }

    /// Re-fetches the identity for the current token.
    ///
    /// Any failure is taken to mean the token is no longer valid and the
    /// session is cleared. Returns the user when the token is still good.
    /// While a login or register is in flight this is skipped, as that flow
    /// replaces the token anyway.
    pub async fn revalidate(&self) -> Option<User> {
        let (token, generation) = {
            let session = self.state.borrow();
            if self.in_flight.load(Ordering::SeqCst) > 0 {
                debug!("Login in progress, skipping revalidation.");
                return session.user.clone();
            }
            (session.token.clone()?, self.generation.load(Ordering::SeqCst))
        };
        match self.identify(generation, &token).await {
            Ok(user) => Some(user),
            Err(ClientError::Superseded) => None,
            Err(e) => {
                warn!("Stored token was rejected, logging out: {}", e);
                None
            }
        }
    }

    //=====================================================================================
    // Internals
    //=====================================================================================

    async fn authenticate(&self, flow: AuthFlow, credentials: Credentials) -> Result<User, ClientError> {
        let busy = FlowGuard::enter(self);
        let outcome = self.run_flow(busy.generation, flow, &credentials).await;
        drop(busy);

        match &outcome {
            Ok(user) => info!("{} succeeded for {}", flow.name(), user.email),
            Err(ClientError::Superseded) => info!("{} abandoned: session changed meanwhile", flow.name()),
            Err(e) => warn!("{} failed for {}: {}", flow.name(), credentials.email, e),
        }
        outcome
    }

    async fn run_flow(&self, generation: u64, flow: AuthFlow, credentials: &Credentials) -> Result<User, ClientError> {
        let exchanged = match flow {
            AuthFlow::Login => self.auth.login(credentials).await,
            AuthFlow::Register => self.auth.register(credentials).await,
        };
        let token = exchanged.map_err(|e| self.fail(generation, e))?;

        self.install_token(generation, &token)?;
        self.identify(generation, &token).await
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    /// Stores a freshly issued token, unless a logout or a newer flow came
    /// along while it was being fetched.
    fn install_token(&self, generation: u64, token: &str) -> Result<(), ClientError> {
        let mut installed = false;
        self.state.send_if_modified(|s| {
            if !self.is_current(generation) {
                return false;
            }
            if let Err(e) = self.tokens.save(token) {
                warn!("Could not persist the token, it will not survive a restart: {}", e);
            }
            s.token = Some(token.to_string());
            s.user = None;
            installed = true;
            true
        });
        if installed {
            Ok(())
        } else {
            Err(ClientError::Superseded)
        }
    }

    /// Fetches the identity for `token` and records it if the session is
    /// still in `generation`. A failure clears the session.
    async fn identify(&self, generation: u64, token: &str) -> Result<User, ClientError> {
        let user = self
            .auth
            .current_user(token)
            .await
            .map_err(|e| self.fail(generation, e))?;

        let mut applied = false;
        self.state.send_if_modified(|s| {
            if !self.is_current(generation) {
                return false;
            }
            s.user = Some(user.clone());
            applied = true;
            true
        });
        if applied {
            Ok(user)
        } else {
            Err(ClientError::Superseded)
        }
    }

    /// Clears the session for a failure observed in `generation`. A failure
    /// from a flow that has since been overtaken leaves the session alone.
    fn fail(&self, generation: u64, err: PortError) -> ClientError {
        if !self.clear_if_current(Some(generation)) {
            debug!("Session moved on, not clearing it for: {}", err);
        }
        ClientError::Port(err)
    }

    /// Drops token, identity and the durable copy, and starts a new
    /// generation. With `Some(generation)` this only happens while that
    /// generation is current. Returns whether the session was cleared.
    fn clear_if_current(&self, generation: Option<u64>) -> bool {
        let mut cleared = false;
        self.state.send_if_modified(|s| {
            if generation.is_some_and(|g| !self.is_current(g)) {
                return false;
            }
            self.generation.fetch_add(1, Ordering::SeqCst);
            if let Err(e) = self.tokens.clear() {
                warn!("Could not remove the stored token: {}", e);
            }
            cleared = true;
            let changed = s.token.is_some() || s.user.is_some();
            s.token = None;
            s.user = None;
            changed
        });
        cleared
    }
}

/// Marks a login or register in flight. Holds the busy flag while any flow
/// is running, including flows whose future is dropped part way.
struct FlowGuard<'a> {
    store: &'a SessionStore,
    generation: u64,
}

impl<'a> FlowGuard<'a> {
    fn enter(store: &'a SessionStore) -> Self {
        let mut generation = 0;
        store.state.send_modify(|s| {
            generation = store.generation.fetch_add(1, Ordering::SeqCst) + 1;
            store.in_flight.fetch_add(1, Ordering::SeqCst);
            s.is_loading = true;
        });
        Self { store, generation }
    }
}

impl Drop for FlowGuard<'_> {
    fn drop(&mut self) {
        let in_flight = &self.store.in_flight;
        self.store.state.send_modify(|s| {
            s.is_loading = in_flight.fetch_sub(1, Ordering::SeqCst) > 1;
        });
    }
}

fn credentials(email: &str, password: &str) -> Credentials {
    Credentials {
        email: email.trim().to_string(),
        password: password.to_string(),
    }
}
