use crate::api::{item_data, list_data};
use crate::client::{ApiClient, ApiError, RequestOptions};
use crate::types::Memory;
use serde_json::Value;

pub async fn fetch_memories(client: &ApiClient) -> Result<Vec<Memory>, ApiError> {
    let reply: Value = client.request("/memories", RequestOptions::get()).await?;
    list_data(reply)
}

pub async fn fetch_memory(client: &ApiClient, id: &str) -> Result<Memory, ApiError> {
    let path = format!("/memories/{}/details", urlencoding::encode(id));
    let reply = client.request_value(&path, RequestOptions::get()).await?;
    item_data(reply)
}
