use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Mutex;
use thiserror::Error;

use crate::error::HubError;
use crate::store::JsonStore;

const CREDENTIALS_KEY: &str = "credentials";
const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Local credential storage. The pagination core never touches it; only the
/// navigation gate and the login screens do.
pub trait CredentialStore: Send + Sync {
    fn load(&self) -> Credentials;
    fn save(&self, username: &str, password: &str) -> bool;
    fn clear(&self) -> bool;
}

/// Credentials kept as an owner-only JSON file in the config directory.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    store: JsonStore,
}

impl FileCredentialStore {
    pub fn new(store: JsonStore) -> Self {
        Self { store }
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> Credentials {
        self.store.read(CREDENTIALS_KEY).unwrap_or_default()
    }

    fn save(&self, username: &str, password: &str) -> bool {
        let credentials = Credentials {
            username: Some(username.to_string()),
            password: Some(password.to_string()),
        };
        match self.store.write(CREDENTIALS_KEY, &credentials) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "failed to save credentials");
                false
            }
        }
    }

    fn clear(&self) -> bool {
        match self.store.remove(CREDENTIALS_KEY) {
            Ok(removed) => removed,
            Err(e) => {
                tracing::warn!(error = %e, "failed to clear credentials");
                false
            }
        }
    }
}

/// Process-local store, used when the config directory is unavailable.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    inner: Mutex<Credentials>,
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> Credentials {
        self.inner.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn save(&self, username: &str, password: &str) -> bool {
        let Ok(mut inner) = self.inner.lock() else {
            return false;
        };
        *inner = Credentials {
            username: Some(username.to_string()),
            password: Some(password.to_string()),
        };
        true
    }

    fn clear(&self) -> bool {
        let Ok(mut inner) = self.inner.lock() else {
            return false;
        };
        let had_any = inner.username.is_some() || inner.password.is_some();
        *inner = Credentials::default();
        had_any
    }
}

/// A user counts as logged in iff a non-empty username is stored. There is no
/// server-side session.
pub fn is_authenticated(store: &dyn CredentialStore) -> bool {
    store
        .load()
        .username
        .is_some_and(|username| !username.is_empty())
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Username is required")]
    EmptyUsername,

    #[error("Password is required")]
    EmptyPassword,

    #[error("Password must be at least 6 characters")]
    PasswordTooShort,

    #[error("Please confirm the password")]
    EmptyConfirm,

    #[error("Passwords do not match")]
    PasswordMismatch,

    #[error("Username already exists")]
    UsernameTaken,

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Could not save credentials")]
    StoreFailed,

    #[error("Biometric authentication is not available")]
    BiometricUnavailable,

    #[error("Biometric authentication failed")]
    BiometricRejected,
}

impl From<AuthError> for HubError {
    fn from(err: AuthError) -> Self {
        HubError::Auth(err.to_string())
    }
}

/// Check a username/password pair against the stored one.
pub fn login(
    store: &dyn CredentialStore,
    username: &str,
    password: &str,
) -> Result<String, AuthError> {
    if username.is_empty() {
        return Err(AuthError::EmptyUsername);
    }
    if password.is_empty() {
        return Err(AuthError::EmptyPassword);
    }

    let stored = store.load();
    if stored.username.as_deref() == Some(username) && stored.password.as_deref() == Some(password)
    {
        tracing::info!(username, "login succeeded");
        Ok(username.to_string())
    } else {
        tracing::info!(username, "login rejected");
        Err(AuthError::InvalidCredentials)
    }
}

/// Validate a registration form and store the new pair. Only one account is
/// kept; registering replaces it unless the username is the same.
pub fn register(
    store: &dyn CredentialStore,
    username: &str,
    password: &str,
    confirm: &str,
) -> Result<(), AuthError> {
    if username.is_empty() {
        return Err(AuthError::EmptyUsername);
    }
    if password.is_empty() {
        return Err(AuthError::EmptyPassword);
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AuthError::PasswordTooShort);
    }
    if confirm.is_empty() {
        return Err(AuthError::EmptyConfirm);
    }
    if password != confirm {
        return Err(AuthError::PasswordMismatch);
    }
    if store.load().username.as_deref() == Some(username) {
        return Err(AuthError::UsernameTaken);
    }

    if store.save(username, password) {
        tracing::info!(username, "registered");
        Ok(())
    } else {
        Err(AuthError::StoreFailed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BiometricKind {
    None,
    // Reported by platform authenticators; the terminal build has none
    #[allow(dead_code)]
    TouchId,
    #[allow(dead_code)]
    FaceId,
}

impl fmt::Display for BiometricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BiometricKind::None => write!(f, "None"),
            BiometricKind::TouchId => write!(f, "Touch ID"),
            BiometricKind::FaceId => write!(f, "Face ID"),
        }
    }
}

#[async_trait]
pub trait BiometricAuthenticator: Send + Sync {
    fn kind(&self) -> BiometricKind;

    /// Prompt the user. Resolves to whether they were recognised.
    async fn authenticate(&self, reason: &str) -> bool;

    fn is_available(&self) -> bool {
        self.kind() != BiometricKind::None
    }
}

/// Terminals have no biometric hardware.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoBiometrics;

#[async_trait]
impl BiometricAuthenticator for NoBiometrics {
    fn kind(&self) -> BiometricKind {
        BiometricKind::None
    }

    async fn authenticate(&self, _reason: &str) -> bool {
        false
    }
}

/// Unlock the stored account with a biometric prompt instead of a password.
pub async fn biometric_login(
    authenticator: &dyn BiometricAuthenticator,
    store: &dyn CredentialStore,
) -> Result<String, AuthError> {
    if !authenticator.is_available() {
        return Err(AuthError::BiometricUnavailable);
    }
    if !authenticator.authenticate("Log in to hubfeed").await {
        return Err(AuthError::BiometricRejected);
    }

    let stored = store.load();
    match (stored.username, stored.password) {
        (Some(username), Some(password)) => login(store, &username, &password),
        _ => Err(AuthError::InvalidCredentials),
    }
}
