use axum::{extract::State, Json};
use serde::Serialize;

use service::account::{AccountView, LoginInput, RegisterInput};
use service::notice::Notice;

use super::AppState;
use crate::errors::ApiError;

#[derive(Serialize)]
pub struct AccountOutput {
    pub notice: Notice,
    pub account: AccountView,
}

#[derive(Serialize)]
pub struct NoticeOutput {
    pub notice: Notice,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeOutput {
    pub logged_in: bool,
    pub account: Option<AccountView>,
}

pub async fn register(State(state): State<AppState>, Json(input): Json<RegisterInput>) -> Result<Json<AccountOutput>, ApiError> {
    input.check_confirmation().map_err(|e| state.reject(e))?;
    let account = state
        .accounts
        .register(&input.username, &input.email, &input.password)
        .await
        .map_err(|e| state.reject(e))?;
    Ok(Json(AccountOutput {
        notice: state.notice(Notice::success("registration successful, please log in")),
        account: AccountView::from(&account),
    }))
}

pub async fn login(State(state): State<AppState>, Json(input): Json<LoginInput>) -> Result<Json<AccountOutput>, ApiError> {
    let account = state
        .accounts
        .login(&input.username, &input.password)
        .await
        .map_err(|e| state.reject(e))?;
    Ok(Json(AccountOutput {
        notice: state.notice(Notice::success("login successful")),
        account: AccountView::from(&account),
    }))
}

pub async fn logout(State(state): State<AppState>) -> Result<Json<NoticeOutput>, ApiError> {
    state.accounts.logout().await.map_err(|e| state.reject(e))?;
    Ok(Json(NoticeOutput { notice: state.notice(Notice::info("logged out")) }))
}

pub async fn me(State(state): State<AppState>) -> Json<MeOutput> {
    let account = state.accounts.current_user().await;
    Json(MeOutput { logged_in: account.is_some(), account: account.as_ref().map(AccountView::from) })
}
