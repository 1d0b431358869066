use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Accepts `"42"` or `42`.
fn id_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(de::Error::custom(format!(
            "expected string or number id, got {other}"
        ))),
    }
}

/// Accepts `true`, `1`, `"1"` and `"true"`. Anything else, including `null`,
/// is `false`.
fn lenient_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Bool(b) => b,
        Value::Number(n) => n.as_i64().is_some_and(|v| v != 0),
        Value::String(s) => matches!(s.trim(), "1" | "true"),
        _ => false,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(ts_rs::TS), ts(export))]
pub struct UserProfile {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub username: String,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub has_paid: bool,
    #[serde(default)]
    pub payment_status: Option<String>,
    #[serde(default)]
    pub payment_date: Option<String>,
    #[serde(default)]
    pub payment_expires_at: Option<String>,
    #[serde(default)]
    pub stripe_customer_id: Option<String>,
    #[serde(default)]
    pub stripe_subscription_id: Option<String>,
    #[serde(default)]
    pub profile_image: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProfileResponse {
    #[serde(default)]
    pub success: bool,
    pub data: Option<UserProfile>,
}

/// Reply of the profile mutation endpoints; `data` is the full updated
/// profile.
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileUpdateResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<UserProfile>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfileUpdate {
    pub name: String,
    pub username: String,
    pub email: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub username: String,
    pub password: String,
    pub password_confirmation: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PasswordReset {
    pub email: String,
    pub otp: String,
    pub password: String,
    pub password_confirmation: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Devotional {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub verses: Option<String>,
    #[serde(default)]
    pub key_verse: Option<String>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub published_at: Option<String>,
    #[serde(default)]
    pub created_by: Option<String>,
    #[serde(default)]
    pub published_by: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Memory {
    pub id: i64,
    pub verse_text: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NoteInput {
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prayer {
    pub id: i64,
    #[serde(default)]
    pub memory_verse_id: Option<i64>,
    pub title: String,
    #[serde(default)]
    pub note: String,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub is_answered: bool,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreatePrayer {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_verse_id: Option<i64>,
    pub title: String,
    pub note: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdatePrayer {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_verse_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_answered: Option<bool>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PlanInterval {
    Month,
    Year,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub id: String,
    pub name: String,
    pub price: f64,
    pub currency: String,
    pub interval: PlanInterval,
    #[serde(default = "one")]
    pub interval_count: u32,
    #[serde(default)]
    pub features: Vec<String>,
}

fn one() -> u32 {
    1
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SupportInterval {
    Monthly,
    Yearly,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurringSupportPlan {
    pub id: String,
    pub subscription_id: String,
    pub amount: f64,
    pub interval: SupportInterval,
    #[serde(default)]
    pub next_payment_date: Option<String>,
    pub status: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSubscriptionResponse {
    #[serde(default)]
    pub success: bool,
    pub client_secret: String,
    #[serde(default)]
    pub customer_id: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SupportKind {
    OneTime,
    Recurring,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSupportResponse {
    #[serde(default)]
    pub success: bool,
    pub client_secret: String,
    #[serde(default)]
    pub customer_id: Option<String>,
    #[serde(default)]
    pub subscription_id: Option<String>,
    #[serde(default)]
    pub price_id: Option<String>,
    #[serde(default)]
    pub setup_intent_id: Option<String>,
    #[serde(rename = "type")]
    pub kind: SupportKind,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmRecurringSupportResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub subscription_id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntentResponse {
    pub client_secret: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PaymentDetails {
    #[serde(default, deserialize_with = "lenient_bool")]
    pub has_paid: bool,
    #[serde(default)]
    pub payment_status: Option<String>,
    #[serde(default)]
    pub payment_date: Option<String>,
    #[serde(default)]
    pub payment_expires_at: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub amount: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConfirmPaymentResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<PaymentDetails>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PaymentStatus {
    #[serde(default, deserialize_with = "lenient_bool")]
    pub has_paid: bool,
    #[serde(default)]
    pub payment_status: Option<String>,
    #[serde(default)]
    pub payment_date: Option<String>,
    #[serde(default)]
    pub payment_expires_at: Option<String>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub is_expired: bool,
    #[serde(default)]
    pub subscription_plan: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentStatusResponse {
    #[serde(default)]
    pub success: bool,
    pub data: PaymentStatus,
}
