//! API Models

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use fiber_billing::UseCaseError;

/// Standard API response
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ErrorResponse>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(code: &str, message: &str) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ErrorResponse {
                code: code.to_string(),
                message: message.to_string(),
            }),
        }
    }

    /// Batch endpoints report per-item failures in the payload; single-item
    /// endpoints map the use case error here.
    pub fn from_use_case_error(err: &UseCaseError) -> Self {
        let code = match err {
            UseCaseError::NotFound(_) => "NOT_FOUND",
            UseCaseError::ConfigurationGap(_) => "CONFIGURATION_GAP",
            UseCaseError::RemoteGateway(_) => "REMOTE_GATEWAY_FAILURE",
            UseCaseError::CapacityExceeded(_) => "CAPACITY_EXCEEDED",
            UseCaseError::Persistence(_) => "PERSISTENCE_FAILURE",
            UseCaseError::Validation(_) => "VALIDATION_ERROR",
        };
        Self::error(code, &err.to_string())
    }
}

/// Error response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

// ============ Billing ============

/// Record payment request
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RecordPaymentRequest {
    pub invoice_id: String,
}

/// Proration preview query
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProrationPreviewParams {
    /// Activation date, e.g. `2024-06-20`.
    pub activation_date: NaiveDate,
    /// Package price in whole currency units.
    pub package_price: i64,
    /// `months` (default) or `days`.
    pub period_unit: Option<String>,
}

/// Single-subscriber action target
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TargetRequest {
    /// Subscriber id, or a case-insensitive name substring (first match wins).
    pub pattern: String,
}

// ============ Subscribers ============

/// Subscriber intake request
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SubscriberCreate {
    pub name: String,
    pub package_name: String,
    /// Whole currency units.
    pub package_price: i64,
    /// `prepaid` (default) or `postpaid`.
    pub billing_type: Option<String>,
    /// Monthly discount in whole currency units.
    pub discount: Option<i64>,
    /// Installation date; service goes live when set.
    pub activation_date: Option<NaiveDate>,
    /// PPP account name on the router.
    pub router_account: Option<String>,
    /// Router name; resolved once at intake.
    pub router_name: Option<String>,
    /// ODP to take a slot on.
    pub odp_id: Option<String>,
    #[serde(default)]
    pub addons: Vec<AddonCreate>,
}

/// Addon item intake
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AddonCreate {
    pub name: String,
    /// `monthly` or `one_time`.
    pub item_type: String,
    /// Whole currency units.
    pub price: i64,
    pub quantity: Option<u32>,
}

/// Subscriber view
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SubscriberView {
    pub id: String,
    pub sequence: String,
    pub name: String,
    pub package_name: String,
    pub billing_status: String,
    pub service_status: String,
    pub router_account_status: String,
    pub odp_id: Option<String>,
}

/// ODP slot move request
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReassignSlotRequest {
    pub odp_id: String,
}
