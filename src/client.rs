use crate::config::ApiConfig;
use crate::redact::redact_secrets;
use crate::storage::Credentials;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

const JSON_MIME: &str = "application/json";

#[derive(Debug, Error)]
pub enum ApiError {
  /// The server answered with a non-success status.
  #[error("{message}")]
  Http {
    status: u16,
    message: String,
    data: Value,
  },
  /// No response was received.
  #[error("network error")]
  Transport(#[from] reqwest::Error),
  #[error("request was cancelled")]
  Cancelled,
  #[error("invalid request path: {0}")]
  InvalidPath(String),
  #[error("failed to encode request body: {0}")]
  Encode(String),
  #[error("unexpected response shape")]
  Decode(#[source] serde_json::Error),
}

impl ApiError {
  pub fn status(&self) -> Option<u16> {
    match self {
      Self::Http { status, .. } => Some(*status),
      _ => None,
    }
  }

  pub fn data(&self) -> Option<&Value> {
    match self {
      Self::Http { data, .. } => Some(data),
      _ => None,
    }
  }

  pub fn is_http(&self) -> bool {
    matches!(self, Self::Http { .. })
  }

  pub fn is_transport(&self) -> bool {
    matches!(self, Self::Transport(_))
  }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HttpMethod {
  #[default]
  Get,
  Post,
  Put,
  Patch,
  Delete,
}

impl From<HttpMethod> for Method {
  fn from(method: HttpMethod) -> Self {
    match method {
      HttpMethod::Get => Method::GET,
      HttpMethod::Post => Method::POST,
      HttpMethod::Put => Method::PUT,
      HttpMethod::Patch => Method::PATCH,
      HttpMethod::Delete => Method::DELETE,
    }
  }
}

#[derive(Debug)]
pub enum RequestBody {
  Json(Value),
  /// Sent as-is; the transport writes the multipart boundary header.
  Multipart(reqwest::multipart::Form),
}

#[derive(Debug)]
pub struct RequestOptions {
  pub method: HttpMethod,
  pub body: Option<RequestBody>,
  /// Merged over the defaults; caller values win.
  pub headers: HeaderMap,
  /// Attach the stored access token when one exists.
  pub auth: bool,
  pub cancel: Option<CancellationToken>,
}

impl Default for RequestOptions {
  fn default() -> Self {
    Self {
      method: HttpMethod::Get,
      body: None,
      headers: HeaderMap::new(),
      auth: true,
      cancel: None,
    }
  }
}

impl RequestOptions {
  pub fn new(method: HttpMethod) -> Self {
    Self {
      method,
      ..Self::default()
    }
  }

  pub fn get() -> Self {
    Self::new(HttpMethod::Get)
  }

  pub fn post() -> Self {
    Self::new(HttpMethod::Post)
  }

  pub fn put() -> Self {
    Self::new(HttpMethod::Put)
  }

  pub fn patch() -> Self {
    Self::new(HttpMethod::Patch)
  }

  pub fn delete() -> Self {
    Self::new(HttpMethod::Delete)
  }

  pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, ApiError> {
    let value = serde_json::to_value(body).map_err(|e| ApiError::Encode(e.to_string()))?;
    self.body = Some(RequestBody::Json(value));
    Ok(self)
  }

  pub fn multipart(mut self, form: reqwest::multipart::Form) -> Self {
    self.body = Some(RequestBody::Multipart(form));
    self
  }

  pub fn header(mut self, name: reqwest::header::HeaderName, value: HeaderValue) -> Self {
    self.headers.insert(name, value);
    self
  }

  pub fn no_auth(mut self) -> Self {
    self.auth = false;
    self
  }

  pub fn cancel_with(mut self, token: CancellationToken) -> Self {
    self.cancel = Some(token);
    self
  }
}

fn build_url(base_url: &str, path: &str) -> Result<Url, ApiError> {
  let joined = if path.starts_with('/') {
    format!("{base_url}{path}")
  } else {
    format!("{base_url}/{path}")
  };
  Url::parse(&joined).map_err(|_| ApiError::InvalidPath(path.to_string()))
}

/// Text-first body decoding: empty is `Null`, JSON content types are parsed
/// with a fallback to the raw text, everything else stays text.
fn decode_body(content_type: &str, text: String) -> Value {
  if text.is_empty() {
    return Value::Null;
  }
  if content_type.contains(JSON_MIME) {
    if let Ok(json) = serde_json::from_str::<Value>(&text) {
      return json;
    }
  }
  Value::String(text)
}

fn error_message(status: StatusCode, data: &Value) -> String {
  match data.as_object().and_then(|o| o.get("message")) {
    Some(Value::String(s)) => s.clone(),
    // Present but not a string (including `null`) is stringified as-is.
    Some(other) => other.to_string(),
    None => format!("Request failed ({})", status.as_u16()),
  }
}

/// Shared REST client. Cloning shares the connection pool and credential
/// store.
#[derive(Clone)]
pub struct ApiClient {
  http: reqwest::Client,
  base_url: String,
  credentials: Credentials,
}

impl ApiClient {
  pub fn new(config: &ApiConfig, credentials: Credentials) -> Result<Self, ApiError> {
    let mut builder = reqwest::Client::builder();
    if let Some(timeout) = config.timeout {
      builder = builder.timeout(timeout);
    }
    Ok(Self {
      http: builder.build()?,
      base_url: config.base_url().to_string(),
      credentials,
    })
  }

  pub fn credentials(&self) -> &Credentials {
    &self.credentials
  }

  pub fn base_url(&self) -> &str {
    &self.base_url
  }

  /// Sends one request and deserializes the response data into `T`.
  pub async fn request<T: DeserializeOwned>(
    &self,
    path: &str,
    options: RequestOptions,
  ) -> Result<T, ApiError> {
    let data = self.request_value(path, options).await?;
    serde_json::from_value(data).map_err(ApiError::Decode)
  }

  /// Like [`ApiClient::request`], returning the decoded body untyped.
  pub async fn request_value(&self, path: &str, options: RequestOptions) -> Result<Value, ApiError> {
    let url = build_url(&self.base_url, path)?;
    let RequestOptions {
      method,
      body,
      headers: extra_headers,
      auth,
      cancel,
    } = options;

    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(JSON_MIME));

    if auth {
      match self.credentials.access_token() {
        Ok(Some(token)) => {
          match HeaderValue::from_str(&format!("Bearer {token}")) {
            Ok(value) => {
              headers.insert(AUTHORIZATION, value);
            }
            Err(_) => warn!("stored access token is not a valid header value, sending unauthenticated"),
          }
        }
        Ok(None) => {}
        Err(err) => warn!(error = %err, "could not read access token, sending unauthenticated"),
      }
    }

    let body = body.filter(|_| method != HttpMethod::Get);
    let is_multipart = matches!(body, Some(RequestBody::Multipart(_)));
    if matches!(body, Some(RequestBody::Json(_))) {
      headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_MIME));
    }

    for name in extra_headers.keys() {
      headers.remove(name);
    }
    for (name, value) in extra_headers.iter() {
      headers.append(name.clone(), value.clone());
    }
    if is_multipart {
      headers.remove(CONTENT_TYPE);
    }

    let mut builder = self.http.request(method.into(), url).headers(headers);
    builder = match body {
      Some(RequestBody::Json(value)) => {
        let encoded = serde_json::to_vec(&value).map_err(|e| ApiError::Encode(e.to_string()))?;
        builder.body(encoded)
      }
      Some(RequestBody::Multipart(form)) => builder.multipart(form),
      None => builder,
    };

    debug!(method = ?method, path, auth, "sending api request");

    let exchange = async {
      let res = builder.send().await?;
      let status = res.status();
      let content_type = res
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
      let text = res.text().await?;
      Ok::<_, ApiError>((status, decode_body(&content_type, text)))
    };

    let outcome = match cancel {
      Some(token) => tokio::select! {
        biased;
        _ = token.cancelled() => Err(ApiError::Cancelled),
        out = exchange => out,
      },
      None => exchange.await,
    };

    let (status, data) = match outcome {
      Ok(pair) => pair,
      Err(ApiError::Transport(err)) => {
        warn!(path, error = %redact_secrets(&err.to_string()), "api request failed without a response");
        return Err(ApiError::Transport(err));
      }
      Err(err) => return Err(err),
    };

    if !status.is_success() {
      let message = error_message(status, &data);
      debug!(
        path,
        status = status.as_u16(),
        body = %redact_secrets(&data.to_string()),
        "api request rejected"
      );
      return Err(ApiError::Http {
        status: status.as_u16(),
        message,
        data,
      });
    }

    Ok(data)
  }
}

#[cfg(test)]
pub(crate) mod tests {
  use super::*;
  use crate::storage::tests::BrokenStore;
  use crate::storage::{MemoryStore, SecureStore, ACCESS_TOKEN_KEY};
  use axum::body::Bytes;
  use axum::http::{HeaderMap as AxumHeaders, StatusCode as AxumStatus};
  use axum::response::IntoResponse;
  use axum::routing::{get, post};
  use axum::{Json, Router};
  use serde_json::json;
  use std::sync::Arc;
  use std::time::Duration;

  /// Serves `router` on an ephemeral local port and returns its base URL.
  pub(crate) async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
      axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
  }

  pub(crate) fn client_with_store(base_url: &str, store: Arc<dyn SecureStore>) -> ApiClient {
    let config = ApiConfig::new(base_url).unwrap();
    ApiClient::new(&config, Credentials::new(store)).unwrap()
  }

  fn header(headers: &AxumHeaders, name: &str) -> Value {
    headers
      .get(name)
      .and_then(|v| v.to_str().ok())
      .map(|v| Value::String(v.to_string()))
      .unwrap_or(Value::Null)
  }

  /// Echoes the interesting request headers and the parsed body.
  async fn echo(headers: AxumHeaders, body: Bytes) -> Json<Value> {
    let parsed = serde_json::from_slice::<Value>(&body).unwrap_or(Value::Null);
    Json(json!({
      "content_type": header(&headers, "content-type"),
      "authorization": header(&headers, "authorization"),
      "accept": header(&headers, "accept"),
      "x_trace": header(&headers, "x-trace"),
      "x_tags": headers
        .get_all("x-tag")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect::<Vec<_>>(),
      "body": parsed,
    }))
  }

  fn echo_router() -> Router {
    Router::new()
      .route("/echo", get(echo).post(echo).put(echo).patch(echo).delete(echo))
      .route(
        "/missing",
        get(|| async { (AxumStatus::NOT_FOUND, Json(json!({ "message": "Not found" }))) }),
      )
      .route(
        "/teapot",
        get(|| async { (AxumStatus::IM_A_TEAPOT, Json(json!({ "errors": ["short"] }))) }),
      )
      .route(
        "/null-message",
        get(|| async { (AxumStatus::UNPROCESSABLE_ENTITY, Json(json!({ "message": null }))) }),
      )
      .route("/plain-error", get(|| async { (AxumStatus::BAD_GATEWAY, "upstream down") }))
      .route("/empty", get(|| async { AxumStatus::OK }))
      .route("/text", get(|| async { "hello" }))
      .route(
        "/bad-json",
        get(|| async { ([("content-type", "application/json")], "{not json").into_response() }),
      )
      .route(
        "/slow",
        post(|| async {
          tokio::time::sleep(Duration::from_secs(30)).await;
          AxumStatus::OK
        }),
      )
  }

  #[tokio::test]
  async fn json_body_round_trips_with_json_content_type() {
    let base = serve(echo_router()).await;
    let client = client_with_store(&base, Arc::new(MemoryStore::new()));
    let sent = json!({ "title": "Psalm 23", "tags": ["rest", "peace"], "nested": { "n": 1.5 } });

    let echoed: Value = client
      .request("/echo", RequestOptions::post().json(&sent).unwrap())
      .await
      .unwrap();

    assert_eq!(echoed["body"], sent);
    assert_eq!(echoed["content_type"], "application/json");
    assert_eq!(echoed["accept"], "application/json");
  }

  #[tokio::test]
  async fn path_without_leading_slash_is_joined() {
    let base = serve(echo_router()).await;
    let client = client_with_store(&base, Arc::new(MemoryStore::new()));
    let echoed: Value = client.request("echo", RequestOptions::get()).await.unwrap();
    assert_eq!(echoed["body"], Value::Null);
  }

  #[tokio::test]
  async fn multipart_body_never_gets_json_content_type() {
    let base = serve(echo_router()).await;
    let client = client_with_store(&base, Arc::new(MemoryStore::new()));
    let form = reqwest::multipart::Form::new().text("caption", "me");

    let options = RequestOptions::post()
      .header(CONTENT_TYPE, HeaderValue::from_static(JSON_MIME))
      .multipart(form);
    let echoed: Value = client.request("/echo", options).await.unwrap();

    let content_type = echoed["content_type"].as_str().unwrap();
    assert!(content_type.starts_with("multipart/form-data; boundary="));
    assert!(!content_type.contains(JSON_MIME));
  }

  #[tokio::test]
  async fn get_drops_body_and_content_type() {
    let base = serve(echo_router()).await;
    let client = client_with_store(&base, Arc::new(MemoryStore::new()));
    let options = RequestOptions::get().json(&json!({ "ignored": true })).unwrap();
    let echoed: Value = client.request("/echo", options).await.unwrap();
    assert_eq!(echoed["body"], Value::Null);
    assert_eq!(echoed["content_type"], Value::Null);
  }

  #[tokio::test]
  async fn bearer_token_attached_unless_auth_disabled() {
    let base = serve(echo_router()).await;
    let store = Arc::new(MemoryStore::with_entry(ACCESS_TOKEN_KEY, "tok-123"));
    let client = client_with_store(&base, store);

    let echoed: Value = client.request("/echo", RequestOptions::get()).await.unwrap();
    assert_eq!(echoed["authorization"], "Bearer tok-123");

    let echoed: Value = client
      .request("/echo", RequestOptions::get().no_auth())
      .await
      .unwrap();
    assert_eq!(echoed["authorization"], Value::Null);
  }

  #[tokio::test]
  async fn missing_token_sends_unauthenticated() {
    let base = serve(echo_router()).await;
    let client = client_with_store(&base, Arc::new(MemoryStore::new()));
    let echoed: Value = client.request("/echo", RequestOptions::get()).await.unwrap();
    assert_eq!(echoed["authorization"], Value::Null);
  }

  #[tokio::test]
  async fn unreadable_store_sends_unauthenticated() {
    let base = serve(echo_router()).await;
    let store = Arc::new(BrokenStore {
      fail_reads: true,
      ..Default::default()
    });
    let client = client_with_store(&base, store);
    let echoed: Value = client.request("/echo", RequestOptions::get()).await.unwrap();
    assert_eq!(echoed["authorization"], Value::Null);
    assert_eq!(echoed["accept"], "application/json");
  }

  #[tokio::test]
  async fn token_unusable_as_header_sends_unauthenticated() {
    let base = serve(echo_router()).await;
    let store = Arc::new(MemoryStore::with_entry(ACCESS_TOKEN_KEY, "tok\nsplit"));
    let client = client_with_store(&base, store);
    let echoed: Value = client.request("/echo", RequestOptions::get()).await.unwrap();
    assert_eq!(echoed["authorization"], Value::Null);
  }

  #[tokio::test]
  async fn caller_header_keeps_every_value() {
    let base = serve(echo_router()).await;
    let client = client_with_store(&base, Arc::new(MemoryStore::new()));
    let tag = reqwest::header::HeaderName::from_static("x-tag");
    let mut options = RequestOptions::get();
    options.headers.append(tag.clone(), HeaderValue::from_static("morning"));
    options.headers.append(tag, HeaderValue::from_static("psalms"));

    let echoed: Value = client.request("/echo", options).await.unwrap();
    assert_eq!(echoed["x_tags"], json!(["morning", "psalms"]));
  }

  #[tokio::test]
  async fn caller_headers_win() {
    let base = serve(echo_router()).await;
    let store = Arc::new(MemoryStore::with_entry(ACCESS_TOKEN_KEY, "tok-123"));
    let client = client_with_store(&base, store);
    let options = RequestOptions::get()
      .header(AUTHORIZATION, HeaderValue::from_static("Bearer override"))
      .header(
        reqwest::header::HeaderName::from_static("x-trace"),
        HeaderValue::from_static("abc"),
      );
    let echoed: Value = client.request("/echo", options).await.unwrap();
    assert_eq!(echoed["authorization"], "Bearer override");
    assert_eq!(echoed["x_trace"], "abc");
  }

  #[tokio::test]
  async fn not_found_surfaces_status_and_server_message() {
    let base = serve(echo_router()).await;
    let client = client_with_store(&base, Arc::new(MemoryStore::new()));
    let err = client
      .request::<Value>("/missing", RequestOptions::get())
      .await
      .unwrap_err();

    assert!(err.is_http());
    assert_eq!(err.status(), Some(404));
    assert_eq!(err.to_string(), "Not found");
    assert_eq!(err.data(), Some(&json!({ "message": "Not found" })));
  }

  #[tokio::test]
  async fn error_message_falls_back_to_status_or_stringified_value() {
    let base = serve(echo_router()).await;
    let client = client_with_store(&base, Arc::new(MemoryStore::new()));

    let err = client.request_value("/teapot", RequestOptions::get()).await.unwrap_err();
    assert_eq!(err.to_string(), "Request failed (418)");
    assert_eq!(err.data(), Some(&json!({ "errors": ["short"] })));

    let err = client.request_value("/null-message", RequestOptions::get()).await.unwrap_err();
    assert_eq!(err.status(), Some(422));
    assert_eq!(err.to_string(), "null");

    let err = client.request_value("/plain-error", RequestOptions::get()).await.unwrap_err();
    assert_eq!(err.status(), Some(502));
    assert_eq!(err.to_string(), "Request failed (502)");
    assert_eq!(err.data(), Some(&json!("upstream down")));
  }

  #[tokio::test]
  async fn empty_body_is_null_without_error() {
    let base = serve(echo_router()).await;
    let client = client_with_store(&base, Arc::new(MemoryStore::new()));

    let data = client.request_value("/empty", RequestOptions::get()).await.unwrap();
    assert_eq!(data, Value::Null);

    let unit: Option<Value> = client.request("/empty", RequestOptions::get()).await.unwrap();
    assert_eq!(unit, None);
  }

  #[tokio::test]
  async fn non_json_and_unparseable_bodies_fall_back_to_text() {
    let base = serve(echo_router()).await;
    let client = client_with_store(&base, Arc::new(MemoryStore::new()));

    let data = client.request_value("/text", RequestOptions::get()).await.unwrap();
    assert_eq!(data, json!("hello"));

    let data = client.request_value("/bad-json", RequestOptions::get()).await.unwrap();
    assert_eq!(data, json!("{not json"));
  }

  #[tokio::test]
  async fn shape_mismatch_is_a_decode_error() {
    let base = serve(echo_router()).await;
    let client = client_with_store(&base, Arc::new(MemoryStore::new()));
    let err = client
      .request::<Vec<u32>>("/text", RequestOptions::get())
      .await
      .unwrap_err();
    assert!(matches!(err, ApiError::Decode(_)));
  }

  #[tokio::test]
  async fn unreachable_server_is_a_transport_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = client_with_store(&format!("http://{addr}"), Arc::new(MemoryStore::new()));
    let err = client.request_value("/profile", RequestOptions::get()).await.unwrap_err();
    assert!(err.is_transport());
    assert!(!err.is_http());
    assert_eq!(err.status(), None);
  }

  #[tokio::test]
  async fn cancellation_aborts_in_flight_request() {
    let base = serve(echo_router()).await;
    let client = client_with_store(&base, Arc::new(MemoryStore::new()));
    let token = CancellationToken::new();

    let canceller = token.clone();
    tokio::spawn(async move {
      tokio::time::sleep(Duration::from_millis(50)).await;
      canceller.cancel();
    });

    let err = client
      .request_value("/slow", RequestOptions::post().cancel_with(token))
      .await
      .unwrap_err();
    assert!(matches!(err, ApiError::Cancelled));
  }
}
