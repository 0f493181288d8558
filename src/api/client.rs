//! HTTP client for the exchange backend
//!
//! Every call goes through [`ApiClient::send`], which unwraps the
//! `{ success, data, message }` envelope and maps failures onto
//! [`ApiError`]. Inputs are checked before any request is sent.

use std::path::Path;
use std::str::FromStr;

use async_trait::async_trait;
use reqwest::{header, Method, RequestBuilder};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;

use crate::config::{sanitize, ApiConfig};
use crate::core::reconciler::PriceSnapshotSource;
use crate::error::AppError;

use super::errors::{ApiError, ApiResult, DEFAULT_REJECTION_MESSAGE};
use super::types::*;

/// Typed client for the backend REST API
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    timeout_ms: u64,
    token: Option<String>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("timeout_ms", &self.timeout_ms)
            .field("token", &self.token.as_deref().map(sanitize))
            .finish()
    }
}

impl ApiClient {
    /// Build a client without credentials
    pub fn new(config: &ApiConfig) -> ApiResult<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout())
            .build()
            .map_err(|e| ApiError::Network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout_ms: config.timeout_ms,
            token: None,
        })
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.set_token(Some(token.into()));
        self
    }

    /// Replace (or clear) the bearer token used for authenticated calls
    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token.filter(|t| !t.trim().is_empty());
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // =========================================================================
    // Auth & profile
    // =========================================================================

    /// `POST /auth/login`
    pub async fn login(&self, email: &str, password: &str) -> ApiResult<AuthResponse> {
        let email = require_text("email", email)?;
        require_text("password", password)?;

        let body = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let auth: AuthResponse = self
            .send_data(self.request(Method::POST, "/auth/login").json(&body))
            .await?;
        tracing::info!(user_id = %auth.user.id, token = %sanitize(&auth.token), "Logged in");
        Ok(auth)
    }

    /// `POST /auth/register`
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
        referral_code: Option<&str>,
    ) -> ApiResult<AuthResponse> {
        let body = RegisterRequest {
            name: require_text("name", name)?.to_string(),
            email: require_text("email", email)?.to_string(),
            password: require_text("password", password)?.to_string(),
            referral_code: referral_code
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string),
        };
        self.send_data(self.request(Method::POST, "/auth/register").json(&body))
            .await
    }

    /// `GET /auth/profile`
    pub async fn profile(&self) -> ApiResult<UserProfile> {
        let req = self.authed(Method::GET, "/auth/profile")?;
        self.send_data(req).await
    }

    /// `PUT /auth/bank`, returns the stored bank details
    pub async fn update_bank_details(&self, details: &BankDetails) -> ApiResult<BankDetails> {
        require_text("bank_name", &details.bank_name)?;
        require_text("account_name", &details.account_name)?;
        require_text("account_number", &details.account_number)?;
        require_text("ifsc_code", &details.ifsc_code)?;

        let req = self.authed(Method::PUT, "/auth/bank")?.json(details);
        self.send_data(req).await
    }

    /// `POST /kyc/upload` as multipart (`document`, `document_type`)
    pub async fn upload_kyc(
        &self,
        document_type: DocumentType,
        file_name: &str,
        contents: Vec<u8>,
    ) -> ApiResult<KycRecord> {
        let file_name = require_text("file_name", file_name)?.to_string();
        if contents.is_empty() {
            return Err(ApiError::Validation("document is empty".to_string()));
        }

        let mime = mime_for(&file_name);
        let part = reqwest::multipart::Part::bytes(contents)
            .file_name(file_name)
            .mime_str(mime)
            .map_err(|e| ApiError::Validation(format!("invalid document type: {}", e)))?;
        let form = reqwest::multipart::Form::new()
            .text("document_type", document_type.as_str())
            .part("document", part);

        let req = self.authed(Method::POST, "/kyc/upload")?.multipart(form);
        self.send_data(req).await
    }

    /// Read `path` and upload it as a KYC document
    pub async fn upload_kyc_file(
        &self,
        document_type: DocumentType,
        path: &Path,
    ) -> ApiResult<KycRecord> {
        let contents = tokio::fs::read(path)
            .await
            .map_err(|e| ApiError::Validation(format!("cannot read {}: {}", path.display(), e)))?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("document")
            .to_string();
        self.upload_kyc(document_type, &file_name, contents).await
    }

    // =========================================================================
    // Wallet
    // =========================================================================

    /// `GET /wallet`
    pub async fn wallets(&self) -> ApiResult<Vec<Wallet>> {
        let req = self.authed(Method::GET, "/wallet")?;
        self.send_data(req).await
    }

    /// `GET /wallet/transactions`
    pub async fn transactions(&self) -> ApiResult<Vec<Transaction>> {
        let req = self.authed(Method::GET, "/wallet/transactions")?;
        self.send_data(req).await
    }

    /// `POST /wallet/deposit`
    pub async fn deposit(
        &self,
        amount: Decimal,
        currency: &str,
        txid: &str,
    ) -> ApiResult<serde_json::Value> {
        let body = DepositSubmission {
            amount: require_positive("amount", amount)?,
            currency: require_text("currency", currency)?.to_uppercase(),
            txid: require_text("txid", txid)?.to_string(),
        };
        let req = self.authed(Method::POST, "/wallet/deposit")?.json(&body);
        self.send_value(req).await
    }

    /// `POST /wallet/withdraw`
    pub async fn withdraw(
        &self,
        amount: Decimal,
        currency: &str,
        address: &str,
    ) -> ApiResult<serde_json::Value> {
        let body = WithdrawalRequest {
            amount: require_positive("amount", amount)?,
            currency: require_text("currency", currency)?.to_uppercase(),
            address: require_text("address", address)?.to_string(),
        };
        let req = self.authed(Method::POST, "/wallet/withdraw")?.json(&body);
        self.send_value(req).await
    }

    // =========================================================================
    // Trading
    // =========================================================================

    /// `GET /trade/prices`
    ///
    /// Keys are uppercased. Entries whose value is not a number are skipped.
    pub async fn prices(&self) -> ApiResult<PriceMap> {
        let data = self
            .send(self.request(Method::GET, "/trade/prices"))
            .await?
            .ok_or_else(|| ApiError::Decode("price response has no data".to_string()))?;
        decode_price_map(data)
    }

    /// `POST /trade/execute`
    pub async fn execute_trade(
        &self,
        pair: &str,
        side: TradeSide,
        amount: Decimal,
    ) -> ApiResult<serde_json::Value> {
        let pair = require_text("pair", pair)?;
        let valid_pair = pair
            .split_once('/')
            .map(|(base, quote)| !base.trim().is_empty() && !quote.trim().is_empty())
            .unwrap_or(false);
        if !valid_pair {
            return Err(ApiError::Validation(format!(
                "pair must look like BASE/QUOTE (got '{}')",
                pair
            )));
        }

        let body = TradeRequest {
            pair: pair.to_uppercase(),
            side,
            amount: require_positive("amount", amount)?,
        };
        let req = self.authed(Method::POST, "/trade/execute")?.json(&body);
        self.send_value(req).await
    }

    /// `GET /trade/history`
    pub async fn trade_history(&self) -> ApiResult<Vec<Trade>> {
        let req = self.authed(Method::GET, "/trade/history")?;
        self.send_data(req).await
    }

    // =========================================================================
    // Admin
    // =========================================================================

    /// `GET /admin/users`
    pub async fn admin_users(&self) -> ApiResult<Vec<UserProfile>> {
        let req = self.authed(Method::GET, "/admin/users")?;
        self.send_data(req).await
    }

    /// `GET /admin/deposits`
    pub async fn admin_deposits(&self) -> ApiResult<Vec<DepositRequest>> {
        let req = self.authed(Method::GET, "/admin/deposits")?;
        self.send_data(req).await
    }

    /// `GET /admin/kyc`; a null `data` means no pending requests
    pub async fn admin_kyc_requests(&self) -> ApiResult<Vec<KycRequest>> {
        let req = self.authed(Method::GET, "/admin/kyc")?;
        match self.send(req).await? {
            None | Some(serde_json::Value::Null) => Ok(Vec::new()),
            Some(data) => decode(data),
        }
    }

    /// `PUT /admin/deposit/{id}/approve`
    pub async fn approve_deposit(&self, id: &str) -> ApiResult<()> {
        let path = format!("/admin/deposit/{}/approve", require_id(id)?);
        self.send_ack(self.authed(Method::PUT, &path)?).await
    }

    /// `DELETE /admin/deposit/{id}`
    pub async fn delete_deposit(&self, id: &str) -> ApiResult<()> {
        let path = format!("/admin/deposit/{}", require_id(id)?);
        self.send_ack(self.authed(Method::DELETE, &path)?).await
    }

    /// `PUT /admin/kyc/{id}/approve`
    pub async fn approve_kyc(&self, id: &str) -> ApiResult<()> {
        let path = format!("/admin/kyc/{}/approve", require_id(id)?);
        self.send_ack(self.authed(Method::PUT, &path)?).await
    }

    /// `PUT /admin/kyc/{id}/reject`; the note may be empty
    pub async fn reject_kyc(&self, id: &str, admin_note: &str) -> ApiResult<()> {
        let path = format!("/admin/kyc/{}/reject", require_id(id)?);
        let body = RejectKycBody {
            admin_note: admin_note.trim(),
        };
        self.send_ack(self.authed(Method::PUT, &path)?.json(&body))
            .await
    }

    /// `PUT /admin/users/{id}/status`
    pub async fn set_user_status(&self, id: &str, status: UserStatus) -> ApiResult<()> {
        let path = format!("/admin/users/{}/status", require_id(id)?);
        let body = UserStatusBody { status };
        self.send_ack(self.authed(Method::PUT, &path)?.json(&body))
            .await
    }

    // =========================================================================
    // Transport
    // =========================================================================

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let req = self.http.request(method, url);
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    /// Request for an endpoint that requires a bearer token
    fn authed(&self, method: Method, path: &str) -> ApiResult<RequestBuilder> {
        if self.token.is_none() {
            return Err(ApiError::Unauthenticated);
        }
        Ok(self.request(method, path))
    }

    /// Send and unwrap the envelope, returning its `data`
    async fn send(&self, req: RequestBuilder) -> ApiResult<Option<serde_json::Value>> {
        let req = req
            .build()
            .map_err(|e| ApiError::from_reqwest(e, self.timeout_ms))?;
        let method = req.method().clone();
        let path = req.url().path().to_string();
        tracing::debug!(method = %method, path = %path, "API request");

        let response = self
            .http
            .execute(req)
            .await
            .map_err(|e| ApiError::from_reqwest(e, self.timeout_ms))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::from_reqwest(e, self.timeout_ms))?;

        let envelope = match serde_json::from_str::<ApiEnvelope>(&body) {
            Ok(envelope) => envelope,
            Err(e) if status.is_success() => {
                return Err(ApiError::Decode(format!("invalid envelope: {}", e)));
            }
            Err(_) => {
                tracing::warn!(method = %method, path = %path, status = status.as_u16(), "API request failed");
                return Err(ApiError::Rejected {
                    status: status.as_u16(),
                    message: DEFAULT_REJECTION_MESSAGE.to_string(),
                });
            }
        };

        if !status.is_success() || !envelope.success {
            let message = envelope
                .message
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_REJECTION_MESSAGE.to_string());
            tracing::warn!(
                method = %method,
                path = %path,
                status = status.as_u16(),
                message = %message,
                "API request rejected"
            );
            return Err(ApiError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        Ok(envelope.data)
    }

    /// Send and decode a required `data` payload
    async fn send_data<T: DeserializeOwned>(&self, req: RequestBuilder) -> ApiResult<T> {
        match self.send(req).await? {
            Some(data) if !data.is_null() => decode(data),
            _ => Err(ApiError::Decode("response has no data".to_string())),
        }
    }

    /// Send and return `data` as-is (`Null` when absent)
    async fn send_value(&self, req: RequestBuilder) -> ApiResult<serde_json::Value> {
        Ok(self.send(req).await?.unwrap_or(serde_json::Value::Null))
    }

    async fn send_ack(&self, req: RequestBuilder) -> ApiResult<()> {
        self.send(req).await.map(|_| ())
    }
}

#[async_trait]
impl PriceSnapshotSource for ApiClient {
    async fn fetch_prices(&self) -> Result<PriceMap, AppError> {
        Ok(self.prices().await?)
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn decode<T: DeserializeOwned>(data: serde_json::Value) -> ApiResult<T> {
    serde_json::from_value(data).map_err(|e| ApiError::Decode(e.to_string()))
}

fn decode_price_map(data: serde_json::Value) -> ApiResult<PriceMap> {
    let serde_json::Value::Object(entries) = data else {
        return Err(ApiError::Decode(
            "price data must be an object of symbol -> number".to_string(),
        ));
    };

    let mut prices = PriceMap::with_capacity(entries.len());
    for (symbol, value) in entries {
        let parsed = match &value {
            serde_json::Value::Number(n) => parse_decimal(&n.to_string()),
            serde_json::Value::String(s) => parse_decimal(s),
            _ => None,
        };
        match parsed {
            Some(price) => {
                prices.insert(symbol.trim().to_uppercase(), price);
            }
            None => tracing::debug!(symbol = %symbol, value = %value, "Skipping non-numeric price"),
        }
    }
    Ok(prices)
}

fn parse_decimal(raw: &str) -> Option<Decimal> {
    let raw = raw.trim();
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .ok()
}

fn require_text<'a>(field: &str, value: &'a str) -> ApiResult<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApiError::Validation(format!("{} is required", field)));
    }
    Ok(trimmed)
}

fn require_positive(field: &str, amount: Decimal) -> ApiResult<Decimal> {
    if amount <= Decimal::ZERO {
        return Err(ApiError::Validation(format!(
            "{} must be greater than zero",
            field
        )));
    }
    Ok(amount)
}

/// Path identifiers: non-blank, no separators or whitespace
fn require_id(id: &str) -> ApiResult<&str> {
    let id = require_text("id", id)?;
    if !id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ApiError::Validation(format!("invalid id '{}'", id)));
    }
    Ok(id)
}

fn mime_for(file_name: &str) -> &'static str {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn client_for(server: &mockito::ServerGuard) -> ApiClient {
        ApiClient::new(&ApiConfig {
            base_url: server.url(),
            timeout_ms: 2_000,
        })
        .unwrap()
    }

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[tokio::test]
    async fn test_prices_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/trade/prices")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"success":true,"data":{"BTC":64230.50,"eth":3450.2,"BAD":"n/a"}}"#)
            .create_async()
            .await;

        let prices = client_for(&server).prices().await.unwrap();
        assert_eq!(prices.len(), 2);
        assert_eq!(prices["BTC"], dec("64230.5"));
        assert_eq!(prices["ETH"], dec("3450.2"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_prices_non_object_is_decode_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/trade/prices")
            .with_status(200)
            .with_body(r#"{"success":true,"data":[1,2,3]}"#)
            .create_async()
            .await;

        let err = client_for(&server).prices().await.unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)), "Got: {:?}", err);
    }

    #[tokio::test]
    async fn test_rejection_message_is_verbatim() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/auth/login")
            .with_status(401)
            .with_body(r#"{"success":false,"message":"Invalid email or password"}"#)
            .create_async()
            .await;

        let err = client_for(&server)
            .login("ada@example.com", "wrong")
            .await
            .unwrap_err();
        match err {
            ApiError::Rejected { status, message } => {
                assert_eq!(status, 401);
                assert_eq!(message, "Invalid email or password");
            }
            other => panic!("expected Rejected, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_success_false_with_200_is_rejected() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/wallet")
            .with_status(200)
            .with_body(r#"{"success":false}"#)
            .create_async()
            .await;

        let err = client_for(&server)
            .with_token("jwt")
            .wallets()
            .await
            .unwrap_err();
        assert_eq!(err.user_message(), DEFAULT_REJECTION_MESSAGE);
        assert_eq!(err.status(), Some(200));
    }

    #[tokio::test]
    async fn test_non_json_error_body() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/wallet")
            .with_status(502)
            .with_body("<html>Bad Gateway</html>")
            .create_async()
            .await;

        let err = client_for(&server)
            .with_token("jwt")
            .wallets()
            .await
            .unwrap_err();
        assert!(err.is_transient());
        assert_eq!(err.status(), Some(502));
    }

    #[tokio::test]
    async fn test_login_returns_token_and_user() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/auth/login")
            .match_body(Matcher::Json(serde_json::json!({
                "email": "ada@example.com",
                "password": "hunter22"
            })))
            .with_status(200)
            .with_body(
                r#"{"success":true,"data":{"id":"u1","name":"Ada","email":"ada@example.com",
                    "role":"USER","status":"ACTIVE","token":"jwt-123"}}"#,
            )
            .create_async()
            .await;

        let auth = client_for(&server)
            .login(" ada@example.com ", "hunter22")
            .await
            .unwrap();
        assert_eq!(auth.token, "jwt-123");
        assert_eq!(auth.user.id, "u1");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_bearer_header_sent() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/auth/profile")
            .match_header("authorization", "Bearer jwt-abc")
            .with_status(200)
            .with_body(
                r#"{"success":true,"data":{"id":"u1","name":"Ada","email":"a@b.c",
                    "role":"USER","status":"ACTIVE"}}"#,
            )
            .create_async()
            .await;

        let profile = client_for(&server)
            .with_token("jwt-abc")
            .profile()
            .await
            .unwrap();
        assert_eq!(profile.name, "Ada");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_authenticated_call_without_token_sends_nothing() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/wallet")
            .expect(0)
            .create_async()
            .await;

        let err = client_for(&server).wallets().await.unwrap_err();
        assert!(matches!(err, ApiError::Unauthenticated));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_validation_rejects_before_request() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", Matcher::Any)
            .expect(0)
            .create_async()
            .await;
        let client = client_for(&server).with_token("jwt");

        let err = client.deposit(Decimal::ZERO, "USDT", "0xabc").await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
        let err = client.withdraw(dec("-1"), "BTC", "bc1q").await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
        let err = client.withdraw(dec("1"), "BTC", "   ").await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
        let err = client
            .execute_trade("BTCUSDT", TradeSide::Buy, dec("1"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
        let err = client.login("", "pw").await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_execute_trade_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/trade/execute")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "pair": "BTC/USDT",
                "type": "BUY",
                "amount": 0.5
            })))
            .with_status(201)
            .with_body(r#"{"success":true,"data":{"id":"t1"}}"#)
            .create_async()
            .await;

        let data = client_for(&server)
            .with_token("jwt")
            .execute_trade("btc/usdt", TradeSide::Buy, dec("0.5"))
            .await
            .unwrap();
        assert_eq!(data["id"], "t1");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_admin_kyc_null_data_is_empty() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/admin/kyc")
            .with_status(200)
            .with_body(r#"{"success":true,"data":null}"#)
            .create_async()
            .await;

        let requests = client_for(&server)
            .with_token("admin-jwt")
            .admin_kyc_requests()
            .await
            .unwrap();
        assert!(requests.is_empty());
    }

    #[tokio::test]
    async fn test_admin_actions_paths() {
        let mut server = mockito::Server::new_async().await;
        let approve = server
            .mock("PUT", "/admin/deposit/d-1/approve")
            .with_body(r#"{"success":true}"#)
            .create_async()
            .await;
        let delete = server
            .mock("DELETE", "/admin/deposit/d-2")
            .with_body(r#"{"success":true}"#)
            .create_async()
            .await;
        let reject = server
            .mock("PUT", "/admin/kyc/k-1/reject")
            .match_body(Matcher::Json(serde_json::json!({"admin_note": "blurry"})))
            .with_body(r#"{"success":true}"#)
            .create_async()
            .await;
        let status = server
            .mock("PUT", "/admin/users/u-9/status")
            .match_body(Matcher::Json(serde_json::json!({"status": "BLOCKED"})))
            .with_body(r#"{"success":true}"#)
            .create_async()
            .await;

        let client = client_for(&server).with_token("admin-jwt");
        client.approve_deposit("d-1").await.unwrap();
        client.delete_deposit("d-2").await.unwrap();
        client.reject_kyc("k-1", " blurry ").await.unwrap();
        client
            .set_user_status("u-9", UserStatus::Blocked)
            .await
            .unwrap();

        let err = client.approve_kyc("../etc").await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));

        approve.assert_async().await;
        delete.assert_async().await;
        reject.assert_async().await;
        status.assert_async().await;
    }

    #[tokio::test]
    async fn test_upload_kyc_multipart() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/kyc/upload")
            .match_header(
                "content-type",
                Matcher::Regex("^multipart/form-data; boundary=".to_string()),
            )
            .match_body(Matcher::Regex("name=\"document_type\"".to_string()))
            .with_status(201)
            .with_body(
                r#"{"success":true,"data":{"status":"PENDING","document_type":"PASSPORT"}}"#,
            )
            .create_async()
            .await;

        let record = client_for(&server)
            .with_token("jwt")
            .upload_kyc(DocumentType::Passport, "passport.png", vec![0x89, 0x50, 0x4e, 0x47])
            .await
            .unwrap();
        assert_eq!(record.status, "PENDING");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_missing_data_is_decode_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/trade/history")
            .with_body(r#"{"success":true}"#)
            .create_async()
            .await;

        let err = client_for(&server)
            .with_token("jwt")
            .trade_history()
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
    }

    #[tokio::test]
    async fn test_connection_refused_is_transient() {
        let client = ApiClient::new(&ApiConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            timeout_ms: 500,
        })
        .unwrap();
        let err = client.prices().await.unwrap_err();
        assert!(err.is_transient(), "Got: {:?}", err);
    }

    #[tokio::test]
    async fn test_snapshot_source_impl() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/trade/prices")
            .with_body(r#"{"success":true,"data":{"SOL":142.1}}"#)
            .create_async()
            .await;

        let source: &dyn PriceSnapshotSource = &client_for(&server);
        let prices = source.fetch_prices().await.unwrap();
        assert_eq!(prices["SOL"], dec("142.1"));
    }

    #[tokio::test]
    async fn test_register_sends_referral_and_returns_token() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/auth/register")
            .match_body(Matcher::Json(serde_json::json!({
                "name": "Grace",
                "email": "grace@example.com",
                "password": "s3cret!",
                "referral_code": "MINEX42"
            })))
            .with_status(201)
            .with_body(
                r#"{"success":true,"data":{"id":"u2","name":"Grace","email":"grace@example.com",
                    "role":"USER","status":"ACTIVE","referral_code":"GRACE7",
                    "created_at":"2026-03-01T09:15:00.000Z","token":"jwt-new"}}"#,
            )
            .create_async()
            .await;

        let auth = client_for(&server)
            .register("Grace", "grace@example.com", "s3cret!", Some(" MINEX42 "))
            .await
            .unwrap();
        assert_eq!(auth.token, "jwt-new");
        assert_eq!(auth.user.referral_code.as_deref(), Some("GRACE7"));
        assert_eq!(
            auth.user.created_at.unwrap().to_rfc3339(),
            "2026-03-01T09:15:00+00:00"
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_register_omits_blank_referral() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/auth/register")
            .match_body(Matcher::Json(serde_json::json!({
                "name": "Grace",
                "email": "grace@example.com",
                "password": "s3cret!"
            })))
            .with_body(
                r#"{"success":true,"data":{"id":"u2","name":"Grace","email":"grace@example.com",
                    "role":"USER","status":"ACTIVE","token":"jwt-new"}}"#,
            )
            .create_async()
            .await;

        client_for(&server)
            .register("Grace", "grace@example.com", "s3cret!", Some("  "))
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_update_bank_details() {
        let details = BankDetails {
            bank_name: "HDFC Bank".to_string(),
            account_name: "Ada Lovelace".to_string(),
            account_number: "50100234567890".to_string(),
            ifsc_code: "HDFC0001234".to_string(),
        };
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("PUT", "/auth/bank")
            .match_header("authorization", "Bearer jwt")
            .match_body(Matcher::Json(serde_json::to_value(&details).unwrap()))
            .with_body(
                r#"{"success":true,"data":{"bank_name":"HDFC Bank","account_name":"Ada Lovelace",
                    "account_number":"50100234567890","ifsc_code":"HDFC0001234"}}"#,
            )
            .create_async()
            .await;

        let stored = client_for(&server)
            .with_token("jwt")
            .update_bank_details(&details)
            .await
            .unwrap();
        assert_eq!(stored, details);
        mock.assert_async().await;

        let blank = BankDetails {
            ifsc_code: " ".to_string(),
            ..details
        };
        let err = client_for(&server)
            .with_token("jwt")
            .update_bank_details(&blank)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn test_wallets_decode() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/wallet")
            .match_header("authorization", "Bearer jwt")
            .with_body(
                r#"{"success":true,"data":[
                    {"id":"w1","currency":"USDT","balance":1250.5,"address":"TXa1b2c3"},
                    {"id":"w2","currency":"BTC","balance":0.25},
                    {"id":"w3","currency":"ETH","balance":"3.125","address":null}
                ]}"#,
            )
            .create_async()
            .await;

        let wallets = client_for(&server).with_token("jwt").wallets().await.unwrap();
        assert_eq!(wallets.len(), 3);
        assert_eq!(wallets[0].currency, "USDT");
        assert_eq!(wallets[0].balance, dec("1250.5"));
        assert_eq!(wallets[0].address.as_deref(), Some("TXa1b2c3"));
        assert_eq!(wallets[1].balance, dec("0.25"));
        assert_eq!(wallets[1].address, None);
        assert_eq!(wallets[2].balance, dec("3.125"));
    }

    #[tokio::test]
    async fn test_transactions_decode() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/wallet/transactions")
            .with_body(
                r#"{"success":true,"data":[
                    {"id":"t1","type":"DEPOSIT","amount":500,"currency":"USDT",
                     "reference_id":"9f8e7d6c5b4a","created_at":"2026-02-10T12:00:00.000Z"},
                    {"id":"t2","type":"TRADE","amount":-0.01,"currency":"BTC"}
                ]}"#,
            )
            .create_async()
            .await;

        let txs = client_for(&server)
            .with_token("jwt")
            .transactions()
            .await
            .unwrap();
        assert_eq!(txs.len(), 2);
        assert_eq!(txs[0].kind, "DEPOSIT");
        assert_eq!(txs[0].amount, dec("500"));
        assert_eq!(txs[0].reference_id.as_deref(), Some("9f8e7d6c5b4a"));
        assert!(txs[0].created_at.is_some());
        assert_eq!(txs[1].amount, dec("-0.01"));
        assert_eq!(txs[1].reference_id, None);
        assert_eq!(txs[1].created_at, None);
    }

    #[tokio::test]
    async fn test_deposit_success_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/wallet/deposit")
            .match_body(Matcher::Json(serde_json::json!({
                "amount": 250.5,
                "currency": "USDT",
                "txid": "0xabc123"
            })))
            .with_status(201)
            .with_body(r#"{"success":true,"data":{"id":"d1","status":"PENDING"},"message":"Deposit submitted"}"#)
            .create_async()
            .await;

        let data = client_for(&server)
            .with_token("jwt")
            .deposit(dec("250.5"), "usdt", "0xabc123")
            .await
            .unwrap();
        assert_eq!(data["status"], "PENDING");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_trade_history_decode() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/trade/history")
            .with_body(
                r#"{"success":true,"data":[
                    {"id":"tr1","pair":"BTC/USDT","type":"BUY","price":64230.5,"amount":0.01,
                     "created_at":"2026-02-11T08:30:00.000Z"},
                    {"id":"tr2","pair":"ETH/USDT","type":"SELL","price":"3450.20","amount":"1.5"}
                ]}"#,
            )
            .create_async()
            .await;

        let trades = client_for(&server)
            .with_token("jwt")
            .trade_history()
            .await
            .unwrap();
        assert_eq!(trades[0].side, TradeSide::Buy);
        assert_eq!(trades[0].price, dec("64230.5"));
        assert_eq!(trades[1].side, TradeSide::Sell);
        assert_eq!(trades[1].amount, dec("1.5"));
    }

    #[tokio::test]
    async fn test_admin_users_and_deposits_decode() {
        let mut server = mockito::Server::new_async().await;
        let _users = server
            .mock("GET", "/admin/users")
            .match_header("authorization", "Bearer admin-jwt")
            .with_body(
                r#"{"success":true,"data":[
                    {"id":"u1","name":"Ada","email":"ada@example.com","role":"ADMIN","status":"ACTIVE",
                     "created_at":"2026-01-05T00:00:00.000Z"},
                    {"id":"u2","name":"Bob","email":"bob@example.com","role":"USER","status":"BLOCKED",
                     "kyc":{"status":"PENDING"}}
                ]}"#,
            )
            .create_async()
            .await;
        let _deposits = server
            .mock("GET", "/admin/deposits")
            .with_body(
                r#"{"success":true,"data":[
                    {"id":"d1","amount":1000,"currency":"USDT","txid":"0xfeed",
                     "user":{"name":"Bob","email":"bob@example.com"},
                     "created_at":"2026-02-01T10:00:00.000Z"}
                ]}"#,
            )
            .create_async()
            .await;

        let client = client_for(&server).with_token("admin-jwt");

        let users = client.admin_users().await.unwrap();
        assert_eq!(users.len(), 2);
        assert!(users[0].is_admin());
        assert!(!users[1].is_admin());
        assert_eq!(users[1].status, "BLOCKED");
        assert!(users[1].kyc.is_some());

        let deposits = client.admin_deposits().await.unwrap();
        assert_eq!(deposits[0].amount, dec("1000"));
        assert_eq!(deposits[0].user.as_ref().unwrap().name, "Bob");
    }

    #[tokio::test]
    async fn test_upload_kyc_file_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("national_id.pdf");
        std::fs::write(&path, b"%PDF-1.4 scanned id").unwrap();

        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/kyc/upload")
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex("filename=\"national_id.pdf\"".to_string()),
                Matcher::Regex("NATIONAL_ID".to_string()),
                Matcher::Regex("application/pdf".to_string()),
            ]))
            .with_status(201)
            .with_body(
                r#"{"success":true,"data":{"id":"k1","status":"PENDING","document_type":"NATIONAL_ID",
                    "document_url":"/uploads/k1.pdf"}}"#,
            )
            .create_async()
            .await;

        let record = client_for(&server)
            .with_token("jwt")
            .upload_kyc_file(DocumentType::NationalId, &path)
            .await
            .unwrap();
        assert_eq!(record.id.as_deref(), Some("k1"));
        assert_eq!(record.document_url.as_deref(), Some("/uploads/k1.pdf"));
        mock.assert_async().await;

        let err = client_for(&server)
            .with_token("jwt")
            .upload_kyc_file(DocumentType::Passport, &dir.path().join("missing.png"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn test_set_token_ignores_blank() {
        let mut client = ApiClient::new(&ApiConfig::default()).unwrap();
        client.set_token(Some("  ".to_string()));
        assert!(client.token().is_none());
        client.set_token(Some("jwt".to_string()));
        assert_eq!(client.token(), Some("jwt"));
    }

    #[test]
    fn test_mime_for() {
        assert_eq!(mime_for("scan.PDF"), "application/pdf");
        assert_eq!(mime_for("id.jpeg"), "image/jpeg");
        assert_eq!(mime_for("noext"), "application/octet-stream");
    }
}
