use crate::api::{item_data, list_data};
use crate::client::{ApiClient, ApiError, RequestOptions};
use crate::types::{Note, NoteInput};
use serde_json::Value;

pub async fn fetch_notes(client: &ApiClient) -> Result<Vec<Note>, ApiError> {
    let reply: Value = client.request("/notes", RequestOptions::get()).await?;
    list_data(reply)
}

pub async fn fetch_note(client: &ApiClient, id: i64) -> Result<Note, ApiError> {
    let reply = client
        .request_value(&format!("/notes/{id}/show"), RequestOptions::get())
        .await?;
    item_data(reply)
}

pub async fn create_note(client: &ApiClient, note: &NoteInput) -> Result<Note, ApiError> {
    let reply = client
        .request_value("/notes/store", RequestOptions::post().json(note)?)
        .await?;
    item_data(reply)
}

pub async fn update_note(client: &ApiClient, id: i64, note: &NoteInput) -> Result<Note, ApiError> {
    let reply = client
        .request_value(&format!("/notes/{id}/update"), RequestOptions::put().json(note)?)
        .await?;
    item_data(reply)
}

pub async fn delete_note(client: &ApiClient, id: i64) -> Result<(), ApiError> {
    client
        .request_value(&format!("/notes/{id}/delete"), RequestOptions::delete())
        .await
        .map(|_| ())
}
