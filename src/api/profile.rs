use crate::client::{ApiClient, ApiError, RequestOptions};
use crate::types::{ProfileResponse, ProfileUpdate, ProfileUpdateResponse, UserProfile};
use reqwest::multipart::{Form, Part};

const PROFILE_IMAGE_FIELD: &str = "profile_image";

/// `GET /profile`. `Ok(None)` when the server answers but reports
/// `success: false` or omits the profile.
pub async fn fetch_profile(client: &ApiClient) -> Result<Option<UserProfile>, ApiError> {
    let ProfileResponse { success, data } = client.request("/profile", RequestOptions::get()).await?;
    Ok(data.filter(|_| success))
}

pub async fn update_profile(
    client: &ApiClient,
    update: &ProfileUpdate,
) -> Result<ProfileUpdateResponse, ApiError> {
    client
        .request("/profile/update", RequestOptions::put().json(update)?)
        .await
}

/// Uploads a new avatar as multipart `profile_image`.
pub async fn change_profile_image(
    client: &ApiClient,
    bytes: Vec<u8>,
    file_name: &str,
    mime: &str,
) -> Result<ProfileUpdateResponse, ApiError> {
    let part = Part::bytes(bytes)
        .file_name(file_name.to_string())
        .mime_str(mime)
        .map_err(|e| ApiError::Encode(e.to_string()))?;
    let form = Form::new().part(PROFILE_IMAGE_FIELD, part);
    client
        .request("/profile/change-image", RequestOptions::post().multipart(form))
        .await
}
