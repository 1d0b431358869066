use crate::api::{item_data, list_data};
use crate::client::{ApiClient, ApiError, RequestOptions};
use crate::types::{CreatePrayer, Prayer, UpdatePrayer};
use serde_json::Value;

pub async fn fetch_prayers(client: &ApiClient) -> Result<Vec<Prayer>, ApiError> {
    let reply: Value = client.request("/prayers", RequestOptions::get()).await?;
    list_data(reply)
}

pub async fn fetch_prayer(client: &ApiClient, id: i64) -> Result<Prayer, ApiError> {
    let reply = client
        .request_value(&format!("/prayers/{id}/show"), RequestOptions::get())
        .await?;
    item_data(reply)
}

pub async fn create_prayer(client: &ApiClient, prayer: &CreatePrayer) -> Result<Prayer, ApiError> {
    let reply = client
        .request_value("/prayers/store", RequestOptions::post().json(prayer)?)
        .await?;
    item_data(reply)
}

/// Only the fields set on `changes` are sent.
pub async fn update_prayer(client: &ApiClient, id: i64, changes: &UpdatePrayer) -> Result<Prayer, ApiError> {
    let reply = client
        .request_value(&format!("/prayers/{id}/update"), RequestOptions::put().json(changes)?)
        .await?;
    item_data(reply)
}

pub async fn delete_prayer(client: &ApiClient, id: i64) -> Result<(), ApiError> {
    client
        .request_value(&format!("/prayers/{id}/delete"), RequestOptions::delete())
        .await
        .map(|_| ())
}
