use crate::client::{ApiClient, ApiError, RequestOptions};
use crate::types::{LoginResponse, MessageResponse, PasswordReset, Registration};
use serde_json::json;

/// `POST /login`. Persisting the returned token is the caller's job; see
/// [`SessionManager::login`](crate::session::SessionManager::login).
pub async fn login(client: &ApiClient, email: &str, password: &str) -> Result<LoginResponse, ApiError> {
    let body = json!({ "email": email, "password": password });
    client
        .request("/login", RequestOptions::post().json(&body)?.no_auth())
        .await
}

pub async fn register(client: &ApiClient, registration: &Registration) -> Result<MessageResponse, ApiError> {
    client
        .request("/register", RequestOptions::post().json(registration)?.no_auth())
        .await
}

pub async fn send_reset_otp(client: &ApiClient, email: &str) -> Result<MessageResponse, ApiError> {
    let body = json!({ "email": email });
    client
        .request("/send-reset-otp", RequestOptions::post().json(&body)?.no_auth())
        .await
}

pub async fn reset_password(client: &ApiClient, reset: &PasswordReset) -> Result<MessageResponse, ApiError> {
    client
        .request("/reset-password", RequestOptions::post().json(reset)?.no_auth())
        .await
}
