//! HTTP handlers for billing endpoints.
//!
//! These handlers connect Axum routes to application layer command/query
//! handlers. The webhook endpoint is the only unauthenticated one; it is
//! authenticated by the provider signature instead.

use std::sync::Arc;

use axum::extract::{Json, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::application::handlers::billing::{
    CreatePortalSessionCommand, CreatePortalSessionHandler, GetSubscriptionHandler,
    GetSubscriptionQuery, ProcessWebhookCommand, ProcessWebhookHandler, SyncSubscriptionCommand,
    SyncSubscriptionHandler,
};
use crate::domain::billing::{BillingError, TierResolver};
use crate::domain::foundation::UserId;
use crate::ports::{PaymentProvider, SubscriptionStore};

use super::dto::{
    ErrorResponse, PortalResponse, SubscriptionResponse, SyncResponse, WebhookAckResponse,
};

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared application state containing all dependencies.
///
/// Cloned per request; dependencies are Arc-wrapped for cheap sharing.
#[derive(Clone)]
pub struct BillingAppState {
    pub subscription_store: Arc<dyn SubscriptionStore>,
    pub payment_provider: Arc<dyn PaymentProvider>,
    pub tier_resolver: Arc<TierResolver>,
    pub portal_return_url: String,
}

impl BillingAppState {
    /// Create handlers on demand from the shared state.
    pub fn webhook_handler(&self) -> ProcessWebhookHandler {
        ProcessWebhookHandler::new(
            self.subscription_store.clone(),
            self.payment_provider.clone(),
            self.tier_resolver.clone(),
        )
    }

    pub fn portal_handler(&self) -> CreatePortalSessionHandler {
        CreatePortalSessionHandler::new(
            self.subscription_store.clone(),
            self.payment_provider.clone(),
            self.portal_return_url.clone(),
        )
    }

    pub fn sync_handler(&self) -> SyncSubscriptionHandler {
        SyncSubscriptionHandler::new(
            self.subscription_store.clone(),
            self.payment_provider.clone(),
            self.tier_resolver.clone(),
        )
    }

    pub fn get_subscription_handler(&self) -> GetSubscriptionHandler {
        GetSubscriptionHandler::new(self.subscription_store.clone())
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Authenticated User Extraction
// ════════════════════════════════════════════════════════════════════════════════

/// Authenticated user context extracted from the request.
///
/// Caller authentication is an upstream concern; the identity arrives on
/// the `X-User-Id` header set by the auth layer in front of this service.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: UserId,
}

/// Rejection type for AuthenticatedUser extraction.
pub struct AuthenticationRequired;

impl IntoResponse for AuthenticationRequired {
    fn into_response(self) -> Response {
        let error = ErrorResponse::new("AUTHENTICATION_REQUIRED", "Authentication is required");
        (StatusCode::UNAUTHORIZED, Json(error)).into_response()
    }
}

impl<S> axum::extract::FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AuthenticationRequired;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut axum::http::request::Parts,
        _state: &'life1 S,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self, Self::Rejection>> + Send + 'async_trait>,
    >
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        Box::pin(async move {
            let user_id = parts
                .headers
                .get("X-User-Id")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| UserId::new(s).ok())
                .ok_or(AuthenticationRequired)?;

            Ok(AuthenticatedUser { user_id })
        })
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Webhook Endpoint
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/webhooks/stripe - Handle provider webhook deliveries.
///
/// The response status is what steers the provider's retry behavior:
/// 200 acknowledges (including permanent skips), 400 rejects the request
/// itself, 500 asks for redelivery.
pub async fn handle_stripe_webhook(
    State(state): State<BillingAppState>,
    headers: axum::http::HeaderMap,
    body: axum::body::Bytes,
) -> Response {
    let Some(signature) = headers
        .get("Stripe-Signature")
        .and_then(|v| v.to_str().ok())
    else {
        let error = ErrorResponse::new("MISSING_SIGNATURE", "Missing Stripe-Signature header");
        return (StatusCode::BAD_REQUEST, Json(error)).into_response();
    };

    let handler = state.webhook_handler();
    let cmd = ProcessWebhookCommand {
        payload: body.to_vec(),
        signature: signature.to_string(),
    };

    match handler.handle(cmd).await {
        Ok(_outcome) => (StatusCode::OK, Json(WebhookAckResponse::ok())).into_response(),
        Err(err) => {
            let status = err.status_code();
            if status == StatusCode::OK {
                // Permanent per-event condition: acknowledge so the
                // provider stops redelivering.
                tracing::warn!(error = %err, "Acknowledging unprocessable webhook event");
                return (StatusCode::OK, Json(WebhookAckResponse::ok())).into_response();
            }

            if err.is_retryable() {
                tracing::error!(error = %err, "Webhook processing failed, provider will retry");
            } else {
                tracing::warn!(error = %err, "Rejecting webhook delivery");
            }
            let error = ErrorResponse::new("WEBHOOK_ERROR", err.to_string());
            (status, Json(error)).into_response()
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Caller-Invoked Endpoints
// ════════════════════════════════════════════════════════════════════════════════

/// GET /api/billing - Get the current user's subscription record.
pub async fn get_subscription(
    State(state): State<BillingAppState>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, BillingApiError> {
    let handler = state.get_subscription_handler();
    let record = handler
        .handle(GetSubscriptionQuery {
            user_id: user.user_id,
        })
        .await?;

    Ok(Json(SubscriptionResponse::from(record)))
}

/// GET /api/billing/portal - Get a provider billing portal URL.
pub async fn get_portal_url(
    State(state): State<BillingAppState>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, BillingApiError> {
    let handler = state.portal_handler();
    let result = handler
        .handle(CreatePortalSessionCommand {
            user_id: user.user_id,
        })
        .await?;

    Ok(Json(PortalResponse {
        portal_url: result.portal_url,
    }))
}

/// POST /api/billing/sync - Force a re-pull of provider state.
pub async fn sync_subscription(
    State(state): State<BillingAppState>,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, BillingApiError> {
    let handler = state.sync_handler();
    let result = handler
        .handle(SyncSubscriptionCommand {
            user_id: user.user_id,
        })
        .await?;

    Ok(Json(SyncResponse::from(result)))
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error type that converts billing errors to HTTP responses.
pub struct BillingApiError(BillingError);

impl From<BillingError> for BillingApiError {
    fn from(err: BillingError) -> Self {
        Self(err)
    }
}

impl IntoResponse for BillingApiError {
    fn into_response(self) -> Response {
        let (status, error_code) = match &self.0 {
            BillingError::NotFound(_) => (StatusCode::NOT_FOUND, "SUBSCRIPTION_NOT_FOUND"),
            BillingError::NoCustomer(_) => (StatusCode::NOT_FOUND, "NO_BILLING_CUSTOMER"),
            BillingError::Provider(_) => (StatusCode::INTERNAL_SERVER_ERROR, "PROVIDER_ERROR"),
            BillingError::Infrastructure(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
        };

        let body = ErrorResponse::new(error_code, self.0.to_string());
        (status, Json(body)).into_response()
    }
}
