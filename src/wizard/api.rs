//! Remote service boundary: gateway traits for the four collaborators and a
//! reqwest-backed client implementing all of them against one base address.

use serde::{Deserialize, Serialize};
use tokio::runtime::Runtime;

use super::domain::ApplicationSnapshot;

/// Failure raised at any gateway seam.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GatewayError {
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("service declined the request: {0}")]
    Declined(String),
}

/// One issued challenge: opaque identifier plus the human-presentable puzzle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengePuzzle {
    pub id: String,
    pub challenge: String,
}

/// Identity-lookup result. `holder_name` is `None` when the service resolved
/// the identifier but could not name a registered holder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityRecord {
    pub holder_name: Option<String>,
}

/// Server-assigned location of the synced record. Updates may move it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteAddress {
    pub row_id: String,
    pub sheet_name: String,
}

/// Acknowledgement returned by the final-submission service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionReceipt {
    pub message: Option<String>,
}

/// Challenge-code generation and checking.
pub trait ChallengeService: Send + Sync {
    fn generate(&self) -> Result<ChallengePuzzle, GatewayError>;
    fn check(&self, id: &str, guess: &str) -> Result<bool, GatewayError>;
}

/// Resolves a tax identifier to its registered holder.
pub trait IdentityLookup: Send + Sync {
    fn resolve(&self, tax_id: &str) -> Result<IdentityRecord, GatewayError>;
}

/// One row per applicant in the external record store.
pub trait RecordStore: Send + Sync {
    fn create(&self, phone_number: &str) -> Result<RemoteAddress, GatewayError>;
    fn update(
        &self,
        address: &RemoteAddress,
        snapshot: &ApplicationSnapshot,
    ) -> Result<RemoteAddress, GatewayError>;
}

/// Accepts the completed application payload.
pub trait SubmissionGateway: Send + Sync {
    fn submit(&self, snapshot: &ApplicationSnapshot) -> Result<SubmissionReceipt, GatewayError>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ChallengeCheckRequest<'a> {
    id: &'a str,
    user_input: &'a str,
}

#[derive(Debug, Deserialize)]
struct AckResponse {
    success: bool,
    message: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct IdentityRequest<'a> {
    tax_id: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IdentityResponse {
    success: bool,
    data: Option<IdentityData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IdentityData {
    full_name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateRecordRequest<'a> {
    phone_number: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateRecordRequest<'a> {
    row_id: &'a str,
    sheet_name: &'a str,
    data: &'a ApplicationSnapshot,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecordResponse {
    success: bool,
    row_id: Option<String>,
    sheet_name: Option<String>,
}

/// Thin wrapper around async reqwest allowing the single-threaded wizard to
/// call every remote collaborator through blocking trait methods.
pub struct ApiClient {
    http: reqwest::Client,
    runtime: Runtime,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, GatewayError> {
        let runtime = Runtime::new().map_err(|err| GatewayError::Transport(err.to_string()))?;
        Ok(Self {
            http: reqwest::Client::new(),
            runtime,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn map_error<E: std::fmt::Display>(err: E) -> GatewayError {
        GatewayError::Transport(err.to_string())
    }

    fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, GatewayError>
    where
        B: Serialize,
        T: for<'de> Deserialize<'de>,
    {
        let url = self.endpoint(path);
        self.runtime.block_on(async {
            let response = self
                .http
                .post(&url)
                .json(body)
                .send()
                .await
                .map_err(Self::map_error)?;
            response.json::<T>().await.map_err(Self::map_error)
        })
    }

    fn record_address(response: RecordResponse) -> Result<RemoteAddress, GatewayError> {
        if !response.success {
            return Err(GatewayError::Declined(
                "record store rejected the payload".to_string(),
            ));
        }
        match (response.row_id, response.sheet_name) {
            (Some(row_id), Some(sheet_name)) => Ok(RemoteAddress { row_id, sheet_name }),
            _ => Err(GatewayError::Declined(
                "record store response omitted the row address".to_string(),
            )),
        }
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl ChallengeService for ApiClient {
    fn generate(&self) -> Result<ChallengePuzzle, GatewayError> {
        let url = self.endpoint("/api/generate-captcha");
        self.runtime.block_on(async {
            let response = self.http.get(&url).send().await.map_err(Self::map_error)?;
            response
                .json::<ChallengePuzzle>()
                .await
                .map_err(Self::map_error)
        })
    }

    fn check(&self, id: &str, guess: &str) -> Result<bool, GatewayError> {
        let ack: AckResponse = self.post_json(
            "/api/verify-captcha",
            &ChallengeCheckRequest {
                id,
                user_input: guess,
            },
        )?;
        Ok(ack.success)
    }
}

impl IdentityLookup for ApiClient {
    fn resolve(&self, tax_id: &str) -> Result<IdentityRecord, GatewayError> {
        let response: IdentityResponse =
            self.post_json("/api/verify-pan", &IdentityRequest { tax_id })?;
        if !response.success {
            return Err(GatewayError::Declined(
                "identity service could not verify the number".to_string(),
            ));
        }
        let holder_name = response
            .data
            .and_then(|data| data.full_name)
            .filter(|name| !name.trim().is_empty());
        Ok(IdentityRecord { holder_name })
    }
}

impl RecordStore for ApiClient {
    fn create(&self, phone_number: &str) -> Result<RemoteAddress, GatewayError> {
        let response: RecordResponse =
            self.post_json("/api/create-record", &CreateRecordRequest { phone_number })?;
        Self::record_address(response)
    }

    fn update(
        &self,
        address: &RemoteAddress,
        snapshot: &ApplicationSnapshot,
    ) -> Result<RemoteAddress, GatewayError> {
        let url = self.endpoint("/api/update-record");
        let body = UpdateRecordRequest {
            row_id: &address.row_id,
            sheet_name: &address.sheet_name,
            data: snapshot,
        };
        let response: RecordResponse = self.runtime.block_on(async {
            let response = self
                .http
                .put(&url)
                .json(&body)
                .send()
                .await
                .map_err(Self::map_error)?;
            response
                .json::<RecordResponse>()
                .await
                .map_err(Self::map_error)
        })?;
        Self::record_address(response)
    }
}

impl SubmissionGateway for ApiClient {
    fn submit(&self, snapshot: &ApplicationSnapshot) -> Result<SubmissionReceipt, GatewayError> {
        let ack: AckResponse = self.post_json("/api/submit-loan", snapshot)?;
        if !ack.success {
            return Err(GatewayError::Declined(
                ack.message
                    .unwrap_or_else(|| "submission was not accepted".to_string()),
            ));
        }
        Ok(SubmissionReceipt {
            message: ack.message,
        })
    }
}
