//! Request and response types for the backend REST API
//!
//! Every response is wrapped in [`ApiEnvelope`]; the payload shapes below
//! are validated by serde when the envelope's `data` is decoded.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// =============================================================================
// Envelope
// =============================================================================

/// Uniform `{ success, data, message }` response wrapper
#[derive(Debug, Clone, Deserialize)]
pub struct ApiEnvelope {
    pub success: bool,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
    #[serde(default)]
    pub message: Option<String>,
}

// =============================================================================
// Users & Auth
// =============================================================================

/// KYC state embedded in a user profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KycSummary {
    pub status: String,
    #[serde(default)]
    pub document_type: Option<String>,
    #[serde(default)]
    pub document_url: Option<String>,
    #[serde(default)]
    pub admin_note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: String,
    pub status: String,
    #[serde(default)]
    pub referral_code: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub kyc: Option<KycSummary>,
    #[serde(default)]
    pub bank_name: Option<String>,
    #[serde(default)]
    pub account_name: Option<String>,
    #[serde(default)]
    pub account_number: Option<String>,
    #[serde(default)]
    pub ifsc_code: Option<String>,
}

impl UserProfile {
    pub fn is_admin(&self) -> bool {
        self.role.eq_ignore_ascii_case("ADMIN")
    }

    /// Merge a partial profile returned by `PUT /auth/bank`
    pub fn apply_bank_details(&mut self, details: &BankDetails) {
        self.bank_name = Some(details.bank_name.clone());
        self.account_name = Some(details.account_name.clone());
        self.account_number = Some(details.account_number.clone());
        self.ifsc_code = Some(details.ifsc_code.clone());
    }
}

/// `data` of login/register: the user fields plus a bearer token
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    #[serde(flatten)]
    pub user: UserProfile,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referral_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankDetails {
    pub bank_name: String,
    pub account_name: String,
    pub account_number: String,
    pub ifsc_code: String,
}

/// Identity document accepted by `POST /kyc/upload`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentType {
    Passport,
    NationalId,
    DriversLicense,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::Passport => "PASSPORT",
            DocumentType::NationalId => "NATIONAL_ID",
            DocumentType::DriversLicense => "DRIVERS_LICENSE",
        }
    }
}

/// KYC submission as returned by the upload endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KycRecord {
    #[serde(default)]
    pub id: Option<String>,
    pub status: String,
    pub document_type: String,
    #[serde(default)]
    pub document_url: Option<String>,
    #[serde(default)]
    pub admin_note: Option<String>,
}

// =============================================================================
// Wallet
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    pub id: String,
    pub currency: String,
    pub balance: Decimal,
    #[serde(default)]
    pub address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    /// Signed: positive credits, negative debits
    pub amount: Decimal,
    pub currency: String,
    #[serde(default)]
    pub reference_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DepositSubmission {
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub currency: String,
    pub txid: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct WithdrawalRequest {
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub currency: String,
    pub address: String,
}

// =============================================================================
// Trading
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeSide {
    Buy,
    Sell,
}

#[derive(Debug, Clone, Serialize)]
pub struct TradeRequest {
    /// Pair in `BASE/QUOTE` form, e.g. "BTC/USDT"
    pub pair: String,
    #[serde(rename = "type")]
    pub side: TradeSide,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    pub id: String,
    pub pair: String,
    #[serde(rename = "type")]
    pub side: TradeSide,
    pub price: Decimal,
    pub amount: Decimal,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// `data` of `GET /trade/prices`
pub type PriceMap = HashMap<String, Decimal>;

// =============================================================================
// Admin
// =============================================================================

/// Minimal user reference embedded in admin listings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositRequest {
    pub id: String,
    pub amount: Decimal,
    pub currency: String,
    pub txid: String,
    #[serde(default)]
    pub user: Option<UserRef>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KycRequest {
    pub id: String,
    pub document_type: String,
    pub document_url: String,
    #[serde(default)]
    pub user: Option<UserRef>,
    #[serde(default)]
    pub submitted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum UserStatus {
    Active,
    Blocked,
}

impl UserStatus {
    /// The status an admin toggle switches to
    pub fn toggled(self) -> Self {
        match self {
            UserStatus::Active => UserStatus::Blocked,
            UserStatus::Blocked => UserStatus::Active,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct RejectKycBody<'a> {
    pub admin_note: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct UserStatusBody {
    pub status: UserStatus,
}
