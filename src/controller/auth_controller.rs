use std::sync::Arc;

use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use axum_extra::extract::cookie::CookieJar;

use crate::controller::AppState;
use crate::helpers::api_error::ApiError;
use crate::models::user::{LoginUser, RegisterUser, UserProfile};
use crate::repositories::store::UserStore;
use crate::services::account_service;
use crate::services::session_service::{CurrentUser, SessionClaims, SessionManager};

pub fn router(app_state: AppState) -> Router {
    Router::new()
        .route("/register", post(register_user))
        .route("/login", post(login_user))
        .route("/profile", get(get_profile))
        .route("/logout", post(logout_user))
        .route_layer(Extension(app_state.users))
        .route_layer(Extension(app_state.sessions))
}

pub async fn register_user(
    Extension(users): Extension<Arc<dyn UserStore>>,
    Json(body): Json<RegisterUser>,
) -> Result<Json<UserProfile>, ApiError> {
    let user = account_service::register(
        users.as_ref(),
        body.name,
        body.email,
        body.password,
    ).await?;

    Ok(Json(UserProfile::from(&user)))
}

pub async fn login_user(
    Extension(users): Extension<Arc<dyn UserStore>>,
    Extension(sessions): Extension<Arc<SessionManager>>,
    jar: CookieJar,
    Json(body): Json<LoginUser>,
) -> Result<(CookieJar, Json<UserProfile>), ApiError> {
    let (token, user) = account_service::login(
        users.as_ref(),
        sessions.as_ref(),
        &body.email,
        body.password,
    ).await?;

    Ok((
        jar.add(SessionManager::session_cookie(token)),
        Json(UserProfile::from(&user)),
    ))
}

pub async fn get_profile(
    CurrentUser(claims): CurrentUser,
) -> Json<SessionClaims> {
    Json(claims)
}

pub async fn logout_user(
    jar: CookieJar,
) -> (CookieJar, Json<bool>) {
    (jar.add(SessionManager::expired_cookie()), Json(true))
}
