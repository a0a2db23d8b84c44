use thiserror::Error;
use transatel_core::error::PayloadError;
use transatel_core::sim::SimLookup;
use transatel_core::summary::is_success;
use url::Url;

use crate::auth::BearerToken;

const DATA_SESSION_PATH: [&str; 5] = ["network", "data-session", "api", "data-session", "imsi"];
const CDR_PATH: [&str; 4] = ["network", "usage", "api", "cdr"];
const SIM_SEARCH_PATH: [&str; 4] = ["line-search-api", "api", "sim", "search"];
const ATTACH_HISTORY_PATH: [&str; 4] = ["network", "attach", "api", "history"];

/// Attach history is requested newest first.
const ATTACH_SORT: &str = "-eventDate";

pub const USER_AGENT: &str = concat!("transatel-mcp/", env!("CARGO_PKG_VERSION"));

/// Shared HTTP client for the token and operator endpoints.
pub fn client() -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder().user_agent(USER_AGENT).build()
}

#[derive(Debug, Error)]
pub enum OperatorError {
    #[error("operator API base URL cannot carry a path: {0}")]
    InvalidBaseUrl(String),
    #[error("failed to reach the {endpoint} endpoint: {source}")]
    Connection {
        endpoint: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("{endpoint} endpoint returned {status}: {body}")]
    Status {
        endpoint: &'static str,
        status: u16,
        body: String,
    },
    #[error(transparent)]
    Payload(#[from] PayloadError),
}

/// Raw upstream answer handed to the normalizers.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

/// GET access to the four operator endpoints.
#[derive(Clone, Debug)]
pub struct OperatorClient {
    base_url: Url,
    http: reqwest::Client,
}

impl OperatorClient {
    pub fn new(base_url: Url, http: reqwest::Client) -> Self {
        Self { base_url, http }
    }

    pub async fn data_session(
        &self,
        token: &BearerToken,
        imsi: &str,
    ) -> Result<ApiResponse, OperatorError> {
        let url = self.endpoint(&DATA_SESSION_PATH, Some(imsi))?;
        self.get("data-session", url, token, &[]).await
    }

    pub async fn cdr(&self, token: &BearerToken, imsi: &str) -> Result<ApiResponse, OperatorError> {
        let url = self.endpoint(&CDR_PATH, None)?;
        self.get("cdr", url, token, &[("imsi", imsi)]).await
    }

    /// Resolve an IMSI to the serial of the first matching SIM.
    pub async fn lookup_sim_serial(
        &self,
        token: &BearerToken,
        imsi: &str,
    ) -> Result<SimLookup, OperatorError> {
        let url = self.endpoint(&SIM_SEARCH_PATH, None)?;
        let response = self
            .get("sim-search", url, token, &[("primaryImsi", imsi)])
            .await?;
        if !is_success(response.status) {
            return Err(OperatorError::Status {
                endpoint: "sim-search",
                status: response.status,
                body: String::from_utf8_lossy(&response.body).into_owned(),
            });
        }
        Ok(SimLookup::from_body(&response.body)?)
    }

    pub async fn attach_history(
        &self,
        token: &BearerToken,
        sim_serial: &str,
    ) -> Result<ApiResponse, OperatorError> {
        let url = self.endpoint(&ATTACH_HISTORY_PATH, None)?;
        self.get(
            "network-attach",
            url,
            token,
            &[("simSerial", sim_serial), ("sort", ATTACH_SORT)],
        )
        .await
    }

    fn endpoint(&self, segments: &[&str], identifier: Option<&str>) -> Result<Url, OperatorError> {
        let mut url = self.base_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| OperatorError::InvalidBaseUrl(self.base_url.to_string()))?;
            path.pop_if_empty().extend(segments);
            if let Some(identifier) = identifier {
                path.push(identifier);
            }
        }
        Ok(url)
    }

    async fn get(
        &self,
        endpoint: &'static str,
        url: Url,
        token: &BearerToken,
        query: &[(&str, &str)],
    ) -> Result<ApiResponse, OperatorError> {
        let mut request = self.http.get(url).bearer_auth(token.as_str());
        if !query.is_empty() {
            request = request.query(query);
        }
        let response = request
            .send()
            .await
            .map_err(|source| OperatorError::Connection { endpoint, source })?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|source| OperatorError::Connection { endpoint, source })?
            .to_vec();
        tracing::debug!(
            event = "operator_api_response",
            endpoint,
            status,
            body_len = body.len(),
            "Operator API responded"
        );
        Ok(ApiResponse { status, body })
    }
}
