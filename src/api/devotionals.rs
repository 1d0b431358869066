use crate::api::{item_data, list_data};
use crate::client::{ApiClient, ApiError, RequestOptions};
use crate::types::Devotional;
use serde_json::Value;
use tracing::debug;

pub async fn fetch_devotionals(client: &ApiClient) -> Result<Vec<Devotional>, ApiError> {
    let reply: Value = client.request("/devotionals", RequestOptions::get()).await?;
    list_data(reply)
}

/// Today's devotional, or `None` when there is none or it can't be loaded.
pub async fn fetch_todays_devotional(client: &ApiClient) -> Option<Devotional> {
    let reply = client
        .request_value("/devotionals/today", RequestOptions::get())
        .await;
    match reply.and_then(item_data) {
        Ok(devotional) => Some(devotional),
        Err(err) => {
            debug!(error = %err, "no devotional for today");
            None
        }
    }
}

pub async fn fetch_devotional(client: &ApiClient, id: &str) -> Result<Devotional, ApiError> {
    let path = format!("/devotional/{}/details", urlencoding::encode(id));
    let reply = client.request_value(&path, RequestOptions::get()).await?;
    item_data(reply)
}
