use std::error::Error as StdError;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use tracing::{debug, error, warn};

use super::domain::Lead;

pub const DEFAULT_CRM_TIMEOUT: Duration = Duration::from_millis(5000);
pub const DEFAULT_CRM_MAX_RETRIES: u32 = 3;
pub const DEFAULT_CRM_RETRY_DELAY: Duration = Duration::from_millis(1000);

/// Failure reported once CRM synchronization gave up.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ExternalServiceError {
    pub message: String,
    pub code: String,
}

impl ExternalServiceError {
    pub fn new(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: code.into(),
        }
    }
}

/// Outcome of a single failed delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CrmTransportError {
    #[error("connection refused")]
    ConnectionRefused,
    #[error("request timed out")]
    Timeout,
    #[error("transport failure: {}", message.as_deref().unwrap_or("no detail"))]
    Transport {
        message: Option<String>,
        code: Option<String>,
    },
    #[error("unexpected failure: {0}")]
    Internal(String),
}

impl CrmTransportError {
    pub fn classify(&self) -> ExternalServiceError {
        match self {
            CrmTransportError::ConnectionRefused => {
                ExternalServiceError::new("Connection Refused", "400")
            }
            CrmTransportError::Timeout => ExternalServiceError::new("Request Timeout", "408"),
            CrmTransportError::Transport { message, code } => ExternalServiceError::new(
                message.clone().unwrap_or_else(|| "Unknown error".to_string()),
                code.clone().unwrap_or_else(|| "500".to_string()),
            ),
            CrmTransportError::Internal(_) => {
                ExternalServiceError::new("Unknown error occurred", "500")
            }
        }
    }
}

/// Outbound delivery of a lead to the CRM.
#[async_trait]
pub trait CrmTransport: Send + Sync {
    async fn post_lead(&self, lead: &Lead) -> Result<(), CrmTransportError>;
}

/// Retry and timeout dials for CRM synchronization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrmSettings {
    pub timeout: Duration,
    pub max_retries: u32,
    pub retry_delay: Duration,
}

impl Default for CrmSettings {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_CRM_TIMEOUT,
            max_retries: DEFAULT_CRM_MAX_RETRIES,
            retry_delay: DEFAULT_CRM_RETRY_DELAY,
        }
    }
}

/// Pushes newly created leads to the CRM with a fixed-delay retry loop.
pub struct CrmSync<T> {
    transport: Arc<T>,
    settings: CrmSettings,
}

impl<T> CrmSync<T>
where
    T: CrmTransport + 'static,
{
    pub fn new(transport: Arc<T>, settings: CrmSettings) -> Self {
        Self {
            transport,
            settings,
        }
    }

    pub fn settings(&self) -> &CrmSettings {
        &self.settings
    }

    /// Deliver `lead`, retrying `max_retries` times before classifying the last failure.
    pub async fn sync_lead(&self, lead: &Lead) -> Result<(), ExternalServiceError> {
        let attempts = self.settings.max_retries.saturating_add(1);
        let mut attempt = 1;

        loop {
            match self.attempt(lead).await {
                Ok(()) => {
                    debug!(lead_id = %lead.id, attempt, "lead synced to crm");
                    return Ok(());
                }
                Err(err) if attempt < attempts => {
                    warn!(lead_id = %lead.id, attempt, error = %err, "crm sync attempt failed, retrying");
                    tokio::time::sleep(self.settings.retry_delay).await;
                    attempt += 1;
                }
                Err(err) => {
                    let classified = err.classify();
                    error!(
                        lead_id = %lead.id,
                        retries = self.settings.max_retries,
                        error = %err,
                        code = %classified.code,
                        "failed to sync lead to crm"
                    );
                    return Err(classified);
                }
            }
        }
    }

    async fn attempt(&self, lead: &Lead) -> Result<(), CrmTransportError> {
        match tokio::time::timeout(self.settings.timeout, self.transport.post_lead(lead)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(CrmTransportError::Timeout),
        }
    }
}

/// `POST <base_url>/lead` over HTTP.
#[derive(Debug, Clone)]
pub struct HttpCrmTransport {
    client: Client,
    endpoint: String,
}

impl HttpCrmTransport {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: format!("{}/lead", base_url.trim_end_matches('/')),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl CrmTransport for HttpCrmTransport {
    async fn post_lead(&self, lead: &Lead) -> Result<(), CrmTransportError> {
        let body = serde_json::to_vec(lead)
            .map_err(|err| CrmTransportError::Internal(err.to_string()))?;

        let response = self
            .client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        Err(CrmTransportError::Transport {
            message: Some(format!(
                "Request failed with status code {}",
                status.as_u16()
            )),
            code: Some(status.as_u16().to_string()),
        })
    }
}

fn transport_error(err: reqwest::Error) -> CrmTransportError {
    if err.is_timeout() {
        return CrmTransportError::Timeout;
    }
    if err.is_connect() && refused_in_chain(&err) {
        return CrmTransportError::ConnectionRefused;
    }

    CrmTransportError::Transport {
        message: Some(err.to_string()),
        code: err.status().map(|status| status.as_u16().to_string()),
    }
}

fn refused_in_chain(err: &(dyn StdError + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(cause) = current {
        if let Some(io) = cause.downcast_ref::<std::io::Error>() {
            if io.kind() == std::io::ErrorKind::ConnectionRefused {
                return true;
            }
        }
        if cause.to_string().to_ascii_lowercase().contains("connection refused") {
            return true;
        }
        current = cause.source();
    }
    false
}
