//! Payment and support endpoints of the backend.
//!
//! These only talk to our own API. The client secrets they return are meant
//! for the payment sheet on the host side; nothing here calls the payment
//! provider directly.

use crate::client::{ApiClient, ApiError, RequestOptions};
use crate::types::{
    ConfirmPaymentResponse, ConfirmRecurringSupportResponse, CreateSubscriptionResponse,
    CreateSupportResponse, MessageResponse, PaymentIntentResponse, PaymentStatusResponse, Plan,
    RecurringSupportPlan, SupportInterval,
};
use serde::Deserialize;
use serde_json::json;

#[derive(Deserialize)]
struct PlansReply<T> {
    #[serde(default = "Vec::new")]
    plans: Vec<T>,
}

pub async fn fetch_subscription_plans(client: &ApiClient) -> Result<Vec<Plan>, ApiError> {
    let reply: PlansReply<Plan> = client.request("/payment/plans", RequestOptions::get()).await?;
    Ok(reply.plans)
}

pub async fn fetch_support_plans(client: &ApiClient) -> Result<Vec<RecurringSupportPlan>, ApiError> {
    let reply: PlansReply<RecurringSupportPlan> = client
        .request("/payment/recurring-support-plans", RequestOptions::get())
        .await?;
    Ok(reply.plans)
}

pub async fn create_subscription(
    client: &ApiClient,
    plan_id: &str,
) -> Result<CreateSubscriptionResponse, ApiError> {
    let body = json!({ "plan_id": plan_id });
    client
        .request("/payment/create-subscription", RequestOptions::post().json(&body)?)
        .await
}

/// One-time support when `interval` is `None`, recurring otherwise.
pub async fn create_support(
    client: &ApiClient,
    amount: f64,
    interval: Option<SupportInterval>,
) -> Result<CreateSupportResponse, ApiError> {
    let body = json!({
        "amount": amount,
        "is_recurring": interval.is_some(),
        "interval": interval,
    });
    client
        .request("/payment/create-support", RequestOptions::post().json(&body)?)
        .await
}

pub async fn confirm_recurring_support(
    client: &ApiClient,
    setup_intent_id: &str,
    price_id: &str,
) -> Result<ConfirmRecurringSupportResponse, ApiError> {
    let body = json!({ "setup_intent_id": setup_intent_id, "price_id": price_id });
    client
        .request("/payment/confirm-recurring-support", RequestOptions::post().json(&body)?)
        .await
}

pub async fn cancel_recurring_support(
    client: &ApiClient,
    subscription_id: &str,
) -> Result<MessageResponse, ApiError> {
    let body = json!({ "subscription_id": subscription_id });
    client
        .request("/payment/cancel-recurring-support", RequestOptions::post().json(&body)?)
        .await
}

pub async fn create_payment_intent(client: &ApiClient) -> Result<String, ApiError> {
    let reply: PaymentIntentResponse = client
        .request("/payment/create-intent", RequestOptions::post())
        .await?;
    Ok(reply.client_secret)
}

/// After a successful confirmation the caller should flip
/// [`SessionManager::set_has_paid`](crate::session::SessionManager::set_has_paid).
pub async fn confirm_payment(
    client: &ApiClient,
    payment_intent_id: &str,
) -> Result<ConfirmPaymentResponse, ApiError> {
    let body = json!({ "payment_intent_id": payment_intent_id });
    client
        .request("/payment/confirm", RequestOptions::post().json(&body)?)
        .await
}

pub async fn fetch_payment_status(client: &ApiClient) -> Result<PaymentStatusResponse, ApiError> {
    client.request("/payment/status", RequestOptions::get()).await
}
