//! services/api/src/adapters/payment.rs
//!
//! This module contains the Midtrans payment gateway adapter, implementing
//! the `PaymentGateway` port from the `core` crate.
//!
//! Authenticity of inbound notifications is delegated to the gateway: the
//! adapter fetches the authoritative transaction status from Midtrans's own
//! status endpoint instead of re-verifying the notification signature
//! locally. Checkout uses the Snap API.

use async_trait::async_trait;
use pintarai_core::domain::IdentitySnapshot;
use pintarai_core::ports::{
    CheckoutSession, PaymentGateway, PortError, PortResult, VerifiedTransaction,
};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A payment adapter backed by the Midtrans Core and Snap APIs.
#[derive(Clone)]
pub struct MidtransAdapter {
    client: Client,
    server_key: String,
    api_base: String,
    snap_base: String,
}

impl MidtransAdapter {
    /// Creates a new `MidtransAdapter`. `api_base` and `snap_base` point at
    /// either the sandbox or production endpoints.
    pub fn new(server_key: String, api_base: String, snap_base: String) -> Self {
        Self {
            client: Client::new(),
            server_key,
            api_base,
            snap_base,
        }
    }

    /// Creates an adapter with a custom HTTP client (used by tests).
    pub fn with_client(
        client: Client,
        server_key: String,
        api_base: String,
        snap_base: String,
    ) -> Self {
        Self {
            client,
            server_key,
            api_base,
            snap_base,
        }
    }
}

//=========================================================================================
// Wire Types
//=========================================================================================

#[derive(Serialize)]
struct SnapTransactionRequest<'a> {
    transaction_details: TransactionDetails<'a>,
    customer_details: CustomerDetails<'a>,
}

#[derive(Serialize)]
struct TransactionDetails<'a> {
    order_id: &'a str,
    gross_amount: i64,
}

#[derive(Serialize)]
struct CustomerDetails<'a> {
    first_name: &'a str,
    email: &'a str,
}

#[derive(Deserialize)]
struct SnapTransactionResponse {
    token: String,
    redirect_url: String,
}

#[derive(Deserialize)]
struct TransactionStatusResponse {
    order_id: String,
    transaction_status: String,
    #[serde(default)]
    fraud_status: Option<String>,
}

//=========================================================================================
// `PaymentGateway` Trait Implementation
//=========================================================================================

#[async_trait]
impl PaymentGateway for MidtransAdapter {
    async fn create_transaction(
        &self,
        order_id: &str,
        gross_amount: i64,
        customer: &IdentitySnapshot,
    ) -> PortResult<CheckoutSession> {
        let body = SnapTransactionRequest {
            transaction_details: TransactionDetails {
                order_id,
                gross_amount,
            },
            customer_details: CustomerDetails {
                first_name: customer.display_name.as_deref().unwrap_or("Pengguna"),
                email: customer.email.as_deref().unwrap_or(""),
            },
        };

        let response = self
            .client
            .post(format!("{}/snap/v1/transactions", self.snap_base))
            .basic_auth(&self.server_key, Some(""))
            .json(&body)
            .send()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(PortError::Unexpected(format!(
                "Snap transaction request failed with {status}: {text}"
            )));
        }

        let snap: SnapTransactionResponse = response
            .json()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        Ok(CheckoutSession {
            token: snap.token,
            redirect_url: snap.redirect_url,
        })
    }

    async fn verify_notification(&self, order_id: &str) -> PortResult<VerifiedTransaction> {
        let response = self
            .client
            .get(format!("{}/v2/{}/status", self.api_base, order_id))
            .basic_auth(&self.server_key, Some(""))
            .send()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(PortError::NotFound(format!(
                "Transaction {order_id} not found at the gateway"
            )));
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(PortError::Unexpected(format!(
                "Transaction status request failed with {status}: {text}"
            )));
        }

        let verified: TransactionStatusResponse = response
            .json()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        debug!(
            order_id = %verified.order_id,
            transaction_status = %verified.transaction_status,
            "Verified transaction status at the gateway"
        );

        Ok(VerifiedTransaction {
            order_id: verified.order_id,
            transaction_status: verified.transaction_status,
            fraud_status: verified.fraud_status,
        })
    }
}
