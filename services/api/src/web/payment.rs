//! services/api/src/web/payment.rs
//!
//! Payment endpoints: the Snap checkout and the gateway's webhook.
//!
//! The webhook never trusts the notification body. The order id is taken
//! from the payload, but transaction and fraud status are re-fetched from
//! the gateway's own status endpoint before any token is credited.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use chrono::Utc;
use pintarai_core::domain::IdentitySnapshot;
use pintarai_core::order::{build_order_id, parse_order_id};
use pintarai_core::packages::find_package;
use pintarai_core::ports::{CreditOutcome, PaymentGateway, TokenLedger};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};
use utoipa::ToSchema;

use crate::web::state::AppState;

//=========================================================================================
// Request/Response Types
//=========================================================================================

/// The subset of the gateway's notification payload this service reads. The
/// echoed status fields are deliberately ignored; only the order id is used,
/// and the authoritative status comes from the verification call.
#[derive(Deserialize, ToSchema)]
pub struct PaymentNotification {
    pub order_id: String,
}

#[derive(Serialize, ToSchema)]
pub struct NotificationResponse {
    pub message: String,
}

#[derive(Deserialize, ToSchema)]
pub struct CheckoutRequest {
    pub package_id: String,
}

#[derive(Serialize, ToSchema)]
pub struct CheckoutResponse {
    pub order_id: String,
    pub token: String,
    pub redirect_url: String,
}

//=========================================================================================
// Webhook Processing
//=========================================================================================

/// Processes a verified-or-rejected notification end to end. Split from the
/// axum handler so the decision logic is testable against in-memory ports.
pub async fn handle_notification(
    ledger: &dyn TokenLedger,
    gateway: &dyn PaymentGateway,
    notification: &PaymentNotification,
) -> (StatusCode, String) {
    // 1. Verify the notification via the gateway's own status endpoint.
    let verified = match gateway.verify_notification(&notification.order_id).await {
        Ok(verified) => verified,
        Err(e) => {
            warn!(order_id = %notification.order_id, "Notification verification failed: {e}");
            return (
                StatusCode::BAD_REQUEST,
                format!("Webhook error: {e}"),
            );
        }
    };

    info!(
        order_id = %verified.order_id,
        transaction_status = %verified.transaction_status,
        fraud_status = verified.fraud_status.as_deref().unwrap_or("-"),
        "Transaction notification received"
    );

    // 2. Extract user id and package id from the order id.
    let order_ref = match parse_order_id(&verified.order_id) {
        Ok(order_ref) => order_ref,
        Err(e) => {
            error!(order_id = %verified.order_id, "Invalid order id: {e}");
            return (StatusCode::INTERNAL_SERVER_ERROR, format!("Error: {e}"));
        }
    };

    let package = match find_package(&order_ref.package_id) {
        Some(package) => package,
        None => {
            error!(package_id = %order_ref.package_id, "Unknown token package in order id");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Error: Package with ID {} not found.", order_ref.package_id),
            );
        }
    };

    // 3. Credit settled transactions exactly once; log everything else.
    if verified.is_settled() {
        match ledger
            .credit_order(&verified.order_id, &order_ref.user_id, package.tokens)
            .await
        {
            Ok(CreditOutcome::Credited { new_balance }) => {
                info!(
                    user_id = %order_ref.user_id,
                    tokens = package.tokens,
                    new_balance,
                    "Token credit applied"
                );
            }
            Ok(CreditOutcome::AlreadyProcessed) => {
                info!(
                    order_id = %verified.order_id,
                    "Duplicate notification for an already-credited order, ignoring"
                );
            }
            Err(e) => {
                error!(order_id = %verified.order_id, "Token credit failed: {e}");
                return (StatusCode::INTERNAL_SERVER_ERROR, format!("Error: {e}"));
            }
        }
    } else if verified.is_failed() {
        info!(
            order_id = %verified.order_id,
            status = %verified.transaction_status,
            "Payment failed, no credit applied"
        );
    } else {
        info!(
            order_id = %verified.order_id,
            status = %verified.transaction_status,
            "Payment not settled yet, no credit applied"
        );
    }

    (
        StatusCode::OK,
        "Notification handled successfully.".to_string(),
    )
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /api/payment-notification - the payment gateway's webhook
#[utoipa::path(
    post,
    path = "/api/payment-notification",
    request_body = PaymentNotification,
    responses(
        (status = 200, description = "Notification handled (including ignored outcomes)", body = NotificationResponse),
        (status = 400, description = "Verification failed", body = NotificationResponse),
        (status = 500, description = "Processing error", body = NotificationResponse)
    )
)]
pub async fn payment_notification_handler(
    State(state): State<Arc<AppState>>,
    Json(notification): Json<PaymentNotification>,
) -> impl IntoResponse {
    let (status, message) =
        handle_notification(&*state.ledger, &*state.payment_gateway, &notification).await;
    (status, Json(NotificationResponse { message }))
}

/// POST /payments/checkout - create a Snap checkout for a token package
#[utoipa::path(
    post,
    path = "/payments/checkout",
    request_body = CheckoutRequest,
    responses(
        (status = 200, description = "Checkout created", body = CheckoutResponse),
        (status = 404, description = "Unknown package id"),
        (status = 500, description = "Gateway error")
    )
)]
pub async fn checkout_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<IdentitySnapshot>,
    Json(request): Json<CheckoutRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let package = find_package(&request.package_id).ok_or_else(|| {
        (
            StatusCode::NOT_FOUND,
            format!("Package with ID {} not found.", request.package_id),
        )
    })?;

    let order_id = build_order_id(&user.uid, package.id, Utc::now().timestamp_millis());

    let checkout = state
        .payment_gateway
        .create_transaction(&order_id, package.price, &user)
        .await
        .map_err(|e| {
            error!(order_id = %order_id, "Checkout creation failed: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Gagal membuat transaksi Midtrans.".to_string(),
            )
        })?;

    Ok(Json(CheckoutResponse {
        order_id,
        token: checkout.token,
        redirect_url: checkout.redirect_url,
    }))
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use axum::http::StatusCode;
    use pintarai_core::domain::IdentitySnapshot;
    use pintarai_core::ports::{
        CheckoutSession, PaymentGateway, PortError, PortResult, VerifiedTransaction,
    };
    use pintarai_core::testing::MemoryStore;

    use super::{handle_notification, PaymentNotification};

    /// A gateway stub whose status endpoint reports a fixed transaction
    /// state, or rejects verification entirely.
    struct StubGateway {
        transaction_status: Option<&'static str>,
        fraud_status: Option<&'static str>,
    }

    impl StubGateway {
        fn settled() -> Self {
            Self {
                transaction_status: Some("settlement"),
                fraud_status: Some("accept"),
            }
        }

        fn with_status(status: &'static str) -> Self {
            Self {
                transaction_status: Some(status),
                fraud_status: None,
            }
        }

        fn rejecting() -> Self {
            Self {
                transaction_status: None,
                fraud_status: None,
            }
        }
    }

    #[async_trait]
    impl PaymentGateway for StubGateway {
        async fn create_transaction(
            &self,
            _order_id: &str,
            _gross_amount: i64,
            _customer: &IdentitySnapshot,
        ) -> PortResult<CheckoutSession> {
            Ok(CheckoutSession {
                token: "snap-token".to_string(),
                redirect_url: "https://example.test/pay".to_string(),
            })
        }

        async fn verify_notification(&self, order_id: &str) -> PortResult<VerifiedTransaction> {
            match self.transaction_status {
                Some(status) => Ok(VerifiedTransaction {
                    order_id: order_id.to_string(),
                    transaction_status: status.to_string(),
                    fraud_status: self.fraud_status.map(str::to_string),
                }),
                None => Err(PortError::Unauthorized),
            }
        }
    }

    fn notification(order_id: &str) -> PaymentNotification {
        PaymentNotification {
            order_id: order_id.to_string(),
        }
    }

    #[tokio::test]
    async fn settled_order_credits_the_package_once() {
        let ledger = MemoryStore::new(0);
        ledger.set_balance("u123", 0);
        let gateway = StubGateway::settled();

        let (status, _) = handle_notification(
            &ledger,
            &gateway,
            &notification("PINTARAI-u123-student-9991"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(ledger.balance("u123"), Some(250));

        // The gateway redelivers the same notification: handled, no second
        // credit.
        let (status, _) = handle_notification(
            &ledger,
            &gateway,
            &notification("PINTARAI-u123-student-9991"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(ledger.balance("u123"), Some(250));
    }

    #[tokio::test]
    async fn wrong_marker_is_a_format_error_with_no_mutation() {
        let ledger = MemoryStore::new(0);
        ledger.set_balance("u123", 0);
        let gateway = StubGateway::settled();

        let (status, message) = handle_notification(
            &ledger,
            &gateway,
            &notification("BADPREFIX-u123-student-9991"),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(message.contains("marker"));
        assert_eq!(ledger.balance("u123"), Some(0));
    }

    #[tokio::test]
    async fn unknown_package_is_rejected_with_no_mutation() {
        let ledger = MemoryStore::new(0);
        ledger.set_balance("u123", 0);
        let gateway = StubGateway::settled();

        let (status, message) = handle_notification(
            &ledger,
            &gateway,
            &notification("PINTARAI-u123-platinum-9991"),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(message.contains("platinum"));
        assert_eq!(ledger.balance("u123"), Some(0));
    }

    #[tokio::test]
    async fn failed_verification_rejects_the_whole_notification() {
        let ledger = MemoryStore::new(0);
        ledger.set_balance("u123", 0);
        let gateway = StubGateway::rejecting();

        let (status, _) = handle_notification(
            &ledger,
            &gateway,
            &notification("PINTARAI-u123-student-9991"),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(ledger.balance("u123"), Some(0));
    }

    #[tokio::test]
    async fn cancelled_and_expired_orders_are_logged_only() {
        for terminal in ["cancel", "deny", "expire", "pending"] {
            let ledger = MemoryStore::new(0);
            ledger.set_balance("u123", 5);
            let gateway = StubGateway::with_status(terminal);

            let (status, _) = handle_notification(
                &ledger,
                &gateway,
                &notification("PINTARAI-u123-student-9991"),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(ledger.balance("u123"), Some(5), "status {terminal}");
        }
    }

    #[tokio::test]
    async fn capture_with_fraud_challenge_is_not_credited() {
        let ledger = MemoryStore::new(0);
        ledger.set_balance("u123", 0);
        let gateway = StubGateway {
            transaction_status: Some("capture"),
            fraud_status: Some("challenge"),
        };

        let (status, _) = handle_notification(
            &ledger,
            &gateway,
            &notification("PINTARAI-u123-student-9991"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(ledger.balance("u123"), Some(0));
    }
}
