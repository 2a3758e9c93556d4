use tracing::{info, warn};

use crate::helpers::api_error::ApiError;
use crate::models::user::{NewUser, User};
use crate::repositories::store::UserStore;
use crate::services::password_service::{hash_password_blocking, verify_password_blocking};
use crate::services::session_service::{SessionClaims, SessionManager};

pub async fn register(
    users: &dyn UserStore,
    name: String,
    email: String,
    password: String,
) -> Result<User, ApiError> {
    if email.trim().is_empty() {
        return Err(ApiError::Validation("email is required".to_string()));
    }

    let password_hash = hash_password_blocking(password).await?;
    let user = users
        .create_user(NewUser {
            name,
            email,
            password_hash,
        })
        .await?;

    info!("Registered user: {}", user.id);
    Ok(user)
}

/// Checks credentials and signs a session token for the matching user.
pub async fn login(
    users: &dyn UserStore,
    sessions: &SessionManager,
    email: &str,
    password: String,
) -> Result<(String, User), ApiError> {
    let user = match users.find_user_by_email(email).await? {
        Some(user) => user,
        None => {
            warn!("Login attempted for unknown email");
            return Err(ApiError::WrongEmail);
        }
    };

    if !verify_password_blocking(user.password.clone(), password).await? {
        warn!("Login rejected for user: {}, wrong password", user.id);
        return Err(ApiError::WrongPassword);
    }

    let token = sessions.issue(&SessionClaims::for_user(&user))?;
    Ok((token, user))
}
