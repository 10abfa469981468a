//! Session/auth gate
//!
//! A persisted boolean in front of the protected views. Sign-in itself is
//! delegated to an external identity provider; this gate only remembers the
//! outcome. It is a convenience, not a security boundary.

use crate::error::{AppError, AppResult, SIGN_IN_WARNING};
use crate::models::{Session, View};
use intent_common::storage::LocalStorage;
use serde_json::Value;
use std::path::Path;
use tracing::{info, warn};

/// Storage key holding the session flag
pub const AUTH_STORAGE_KEY: &str = "isAuthenticated";

/// Result of a navigation attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    /// The requested view was entered
    Allowed(View),
    /// Access denied; the user lands on `to` and sees `warning`
    Redirected { to: View, warning: String },
}

/// Session flag backed by persisted client state
#[derive(Debug)]
pub struct SessionGate {
    storage: LocalStorage,
    session: Session,
}

impl SessionGate {
    /// Initialize the session from `storage`
    ///
    /// Accepts both a JSON boolean and the string `"true"` as signed in.
    pub fn load(storage: LocalStorage) -> Self {
        let authenticated = match storage.get_item(AUTH_STORAGE_KEY) {
            Some(Value::Bool(flag)) => *flag,
            Some(Value::String(s)) => s == "true",
            _ => false,
        };

        Self {
            storage,
            session: Session { authenticated },
        }
    }

    /// Open the gate stored in `root_folder`
    pub fn in_root_folder(root_folder: &Path) -> AppResult<Self> {
        Ok(Self::load(LocalStorage::in_root_folder(root_folder)?))
    }

    pub fn session(&self) -> Session {
        self.session
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.authenticated
    }

    /// Mark the session signed in and persist it
    pub async fn login(&mut self) -> AppResult<()> {
        self.storage
            .set_item(AUTH_STORAGE_KEY, Value::Bool(true))
            .await?;
        self.session.authenticated = true;
        info!("Signed in");
        Ok(())
    }

    /// Mark the session signed out and remove the persisted flag
    pub async fn logout(&mut self) -> AppResult<()> {
        self.storage.remove_item(AUTH_STORAGE_KEY).await?;
        self.session.authenticated = false;
        info!("Signed out");
        Ok(())
    }

    /// `Err(AuthRequired)` when `view` is protected and nobody is signed in
    pub fn check(&self, view: View) -> AppResult<()> {
        if view.is_protected() && !self.session.authenticated {
            return Err(AppError::AuthRequired(view));
        }
        Ok(())
    }

    /// Enter `view`, or fall back to the landing view with a warning
    pub fn navigate(&self, view: View) -> Navigation {
        match self.check(view) {
            Ok(()) => Navigation::Allowed(view),
            Err(_) => {
                warn!(view = %view, "{}", SIGN_IN_WARNING);
                Navigation::Redirected {
                    to: View::Landing,
                    warning: SIGN_IN_WARNING.to_string(),
                }
            }
        }
    }
}
