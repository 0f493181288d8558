//! Backend REST API client
//!
//! - `client`: `ApiClient` with one method per endpoint
//! - `types`: request/response DTOs and the response envelope
//! - `errors`: `ApiError` and its retry/user-message classification

mod client;
mod errors;
pub mod types;

pub use client::ApiClient;
pub use errors::{ApiError, ApiResult, DEFAULT_REJECTION_MESSAGE};
pub use types::{
    AuthResponse, BankDetails, DepositRequest, DocumentType, KycRecord, KycRequest, PriceMap,
    Trade, TradeSide, Transaction, UserProfile, UserStatus, Wallet,
};
