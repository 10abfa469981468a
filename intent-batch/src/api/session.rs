//! Sign-in, sign-out and navigation

use crate::error::AppResult;
use crate::models::{Session, View};
use crate::services::session_gate::Navigation;
use crate::AppState;

pub async fn login(state: &AppState) -> AppResult<()> {
    state.session.write().await.login().await
}

pub async fn logout(state: &AppState) -> AppResult<()> {
    state.session.write().await.logout().await
}

pub async fn session_status(state: &AppState) -> Session {
    state.session.read().await.session()
}

pub async fn navigate(state: &AppState, view: View) -> Navigation {
    state.session.read().await.navigate(view)
}
