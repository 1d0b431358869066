use super::state::{PremiumAccess, SessionState};
use crate::api;
use crate::client::{ApiClient, ApiError};
use crate::storage::{Credentials, StorageError};
use crate::types::UserProfile;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum LoginError {
    #[error("{}", .0.as_deref().unwrap_or("Login was rejected."))]
    Rejected(Option<String>),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("could not store the access token")]
    Storage(#[from] StorageError),
}

/// Why a stored session could not be turned into a profile.
#[derive(Debug, Error)]
enum ResolveFailure {
    #[error("token could not be read")]
    Storage(#[from] StorageError),
    #[error("profile request failed: {0}")]
    Profile(#[from] ApiError),
    #[error("profile reply was unsuccessful")]
    NoProfile,
}

enum Resolution {
    Anonymous,
    Authenticated(UserProfile),
    Invalid(ResolveFailure),
}

struct Inner {
    /// Bumped by every resolution start and every logout. A resolution only
    /// applies if the generation it started with is still current.
    generation: u64,
    state: SessionState,
}

/// Owns the session state. Clones share the same state.
#[derive(Clone)]
pub struct SessionManager {
    client: ApiClient,
    inner: Arc<Mutex<Inner>>,
    updates: Arc<watch::Sender<SessionState>>,
}

impl SessionManager {
    pub fn new(client: ApiClient) -> Self {
        let (updates, _) = watch::channel(SessionState::initial());
        Self {
            client,
            inner: Arc::new(Mutex::new(Inner {
                generation: 0,
                state: SessionState::initial(),
            })),
            updates: Arc::new(updates),
        }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    fn credentials(&self) -> &Credentials {
        self.client.credentials()
    }

    /// Runs the first resolution in the background.
    pub fn mount(&self) -> JoinHandle<()> {
        let this = self.clone();
        tokio::spawn(async move { this.refetch_user().await })
    }

    pub async fn snapshot(&self) -> SessionState {
        self.inner.lock().await.state.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.updates.subscribe()
    }

    fn publish(&self, inner: &mut Inner, next: SessionState) {
        inner.state = next.clone();
        self.updates.send_replace(next);
    }

    fn delete_token_quietly(&self) {
        if let Err(err) = self.credentials().clear_access_token() {
            warn!(error = %err, "failed to delete access token");
        }
    }

    async fn resolve(&self) -> Resolution {
        let token = match self.credentials().access_token() {
            Ok(Some(token)) => token,
            Ok(None) => return Resolution::Anonymous,
            Err(err) => return Resolution::Invalid(err.into()),
        };
        debug!(token_len = token.len(), "found access token, fetching profile");

        match api::profile::fetch_profile(&self.client).await {
            Ok(Some(profile)) => Resolution::Authenticated(profile),
            Ok(None) => Resolution::Invalid(ResolveFailure::NoProfile),
            Err(err) => Resolution::Invalid(err.into()),
        }
    }

    /// Re-derives the session from the stored token. Never fails: anything
    /// that prevents loading the profile ends in the anonymous state with the
    /// token removed.
    pub async fn refetch_user(&self) {
        let generation = {
            let mut inner = self.inner.lock().await;
            inner.generation += 1;
            inner.generation
        };
        self.apply_resolution(generation).await;
    }

    /// Resolves the session and applies the outcome if `generation` is still
    /// current once the profile call returns.
    async fn apply_resolution(&self, generation: u64) {
        let resolution = self.resolve().await;

        let mut inner = self.inner.lock().await;
        if inner.generation != generation {
            debug!(generation, current = inner.generation, "discarding stale session resolution");
            return;
        }

        let next = match resolution {
            Resolution::Anonymous => SessionState::anonymous(),
            Resolution::Authenticated(profile) => {
                debug!(user_id = %profile.id, has_paid = profile.has_paid, "session resolved");
                SessionState::authenticated(profile)
            }
            Resolution::Invalid(reason) => {
                warn!(reason = %reason, "session could not be resolved, logging out");
                self.delete_token_quietly();
                SessionState::anonymous()
            }
        };
        self.publish(&mut inner, next);
    }

    /// Deletes the stored token and drops to the anonymous state. Always
    /// wins over a resolution that is still in flight.
    pub async fn logout(&self) {
        let mut inner = self.inner.lock().await;
        inner.generation += 1;
        self.delete_token_quietly();
        self.publish(&mut inner, SessionState::anonymous());
        info!("logged out");
    }

    /// Replaces the displayed profile with an authoritative one from the
    /// server. `None` clears the profile but keeps the token and the
    /// authenticated flag.
    pub async fn set_user(&self, user: Option<UserProfile>) {
        let mut inner = self.inner.lock().await;
        if user.is_some() && !inner.state.is_authenticated {
            debug!("ignoring profile for an unauthenticated session");
            return;
        }
        let next = inner.state.with_user(user);
        self.publish(&mut inner, next);
    }

    pub async fn set_has_paid(&self, has_paid: bool) {
        let mut inner = self.inner.lock().await;
        if has_paid && inner.state.user.is_none() {
            debug!("ignoring payment flag without a profile");
            return;
        }
        let next = inner.state.with_has_paid(has_paid);
        self.publish(&mut inner, next);
    }

    /// Logs in with email and password, stores the token and resolves the
    /// session. Returns the resulting state.
    pub async fn login(&self, email: &str, password: &str) -> Result<SessionState, LoginError> {
        let reply = api::auth::login(&self.client, email, password).await?;
        let token = reply
            .token
            .filter(|t| reply.success && !t.trim().is_empty())
            .ok_or(LoginError::Rejected(reply.message))?;

        // Storing and advancing the generation under one lock keeps an older
        // failing resolution from deleting the new token.
        let generation = {
            let mut inner = self.inner.lock().await;
            self.credentials().store_access_token(&token)?;
            inner.generation += 1;
            inner.generation
        };
        info!("login accepted, resolving session");
        self.apply_resolution(generation).await;
        Ok(self.snapshot().await)
    }

    /// Live token check, independent of the cached flags.
    pub fn is_authenticated(&self) -> bool {
        self.credentials().has_access_token()
    }

    pub fn has_completed_onboarding(&self) -> bool {
        self.credentials().has_completed_onboarding()
    }

    pub fn complete_onboarding(&self) -> Result<(), StorageError> {
        self.credentials().complete_onboarding()
    }

    /// Checks the token and fetches the profile again rather than trusting
    /// the cached state.
    pub async fn can_access_premium_content(&self) -> PremiumAccess {
        if !self.is_authenticated() {
            return PremiumAccess::denied();
        }
        let has_subscription = match api::profile::fetch_profile(&self.client).await {
            Ok(profile) => profile.is_some_and(|p| p.has_paid),
            Err(err) => {
                debug!(error = %err, "subscription check failed");
                false
            }
        };
        PremiumAccess::signed_in(has_subscription)
    }
}
