//! Backend API transport.
//!
//! [`EmergencyApi`] is the seam between the lifecycle engine and the
//! network: four request/response operations, each returning a typed
//! [`TransportError`] instead of panicking. [`HttpTransport`] implements it
//! over HTTP via `reqwest`; tests implement it with scripted responses.
//!
//! The trait uses return-position `impl Future + Send` instead of trait
//! objects, so callers are generic over the transport and every call can
//! run on a spawned task.

use std::future::Future;
use std::sync::Arc;

use goldenhour_types::{
    EmergencyId, EmergencyReport, NotifyAck, NotifyRequest, StatusPayload, TriageResult,
};
use reqwest::{RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::ClientConfig;
use crate::credentials::{CredentialStore, MemoryCredentials};
use crate::error::{ConfigError, TransportError};

/// Header carrying the per-call correlation id.
const REQUEST_ID_HEADER: &str = "x-request-id";

// ---------------------------------------------------------------------------
// Logical operations
// ---------------------------------------------------------------------------

/// The logical operations offered by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Submit a new emergency for triage.
    SubmitEmergency,
    /// Read the current status of an emergency.
    GetStatus,
    /// Read hospital detail for an emergency.
    GetHospitalDetail,
    /// Alert a hospital about an incoming emergency.
    NotifyHospital,
}

impl Operation {
    /// Snake-case name for logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SubmitEmergency => "submit_emergency",
            Self::GetStatus => "get_status",
            Self::GetHospitalDetail => "get_hospital_detail",
            Self::NotifyHospital => "notify_hospital",
        }
    }
}

impl core::fmt::Display for Operation {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Transport seam
// ---------------------------------------------------------------------------

/// The four backend operations the tracker depends on.
pub trait EmergencyApi: Send + Sync + 'static {
    /// Submit an emergency; the backend runs triage and assigns an id.
    fn submit_emergency(
        &self,
        report: &EmergencyReport,
    ) -> impl Future<Output = Result<TriageResult, TransportError>> + Send;

    /// Read the current status of an emergency.
    fn get_status(
        &self,
        emergency_id: &EmergencyId,
    ) -> impl Future<Output = Result<StatusPayload, TransportError>> + Send;

    /// Read hospital detail for an emergency.
    ///
    /// Returned as raw JSON: the backend answers with a bare list, a
    /// wrapped list or a single wrapped object, and normalization belongs
    /// to the consumer.
    fn get_hospital_detail(
        &self,
        emergency_id: &EmergencyId,
    ) -> impl Future<Output = Result<serde_json::Value, TransportError>> + Send;

    /// Alert a hospital about an emergency.
    fn notify_hospital(
        &self,
        request: &NotifyRequest,
    ) -> impl Future<Output = Result<NotifyAck, TransportError>> + Send;
}

impl<T: EmergencyApi> EmergencyApi for Arc<T> {
    fn submit_emergency(
        &self,
        report: &EmergencyReport,
    ) -> impl Future<Output = Result<TriageResult, TransportError>> + Send {
        (**self).submit_emergency(report)
    }

    fn get_status(
        &self,
        emergency_id: &EmergencyId,
    ) -> impl Future<Output = Result<StatusPayload, TransportError>> + Send {
        (**self).get_status(emergency_id)
    }

    fn get_hospital_detail(
        &self,
        emergency_id: &EmergencyId,
    ) -> impl Future<Output = Result<serde_json::Value, TransportError>> + Send {
        (**self).get_hospital_detail(emergency_id)
    }

    fn notify_hospital(
        &self,
        request: &NotifyRequest,
    ) -> impl Future<Output = Result<NotifyAck, TransportError>> + Send {
        (**self).notify_hospital(request)
    }
}

// ---------------------------------------------------------------------------
// HTTP implementation
// ---------------------------------------------------------------------------

/// [`EmergencyApi`] over HTTP.
///
/// Every call carries the configured timeout, a fresh `x-request-id` and,
/// when the credential store holds one, a bearer token.
pub struct HttpTransport {
    client: reqwest::Client,
    base: Url,
    credentials: Arc<dyn CredentialStore>,
}

impl HttpTransport {
    /// Build a transport whose credential store is seeded from the config.
    pub fn new(config: &ClientConfig) -> Result<Self, ConfigError> {
        let credentials = Arc::new(MemoryCredentials::new(config.auth_token.clone()));
        Self::with_credentials(config, credentials)
    }

    /// Build a transport reading tokens from the given store.
    pub fn with_credentials(
        config: &ClientConfig,
        credentials: Arc<dyn CredentialStore>,
    ) -> Result<Self, ConfigError> {
        let base = Url::parse(&config.api_url).map_err(|e| ConfigError::Invalid {
            name: "api_url".to_owned(),
            reason: e.to_string(),
        })?;
        if base.cannot_be_a_base() {
            return Err(ConfigError::Invalid {
                name: "api_url".to_owned(),
                reason: format!("{base} cannot be used as a base URL"),
            });
        }

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ConfigError::ClientBuild(e.to_string()))?;

        Ok(Self {
            client,
            base,
            credentials,
        })
    }

    /// The API base every path is resolved against.
    pub const fn base_url(&self) -> &Url {
        &self.base
    }

    /// Resolve `segments` below the API base, escaping each segment.
    fn endpoint(&self, operation: Operation, segments: &[&str]) -> Result<Url, TransportError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| TransportError::Unknown {
                operation,
                message: "API URL cannot be a base".to_owned(),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Send a prepared request and decode the JSON response body.
    async fn send<T: DeserializeOwned>(
        &self,
        operation: Operation,
        request: RequestBuilder,
    ) -> Result<T, TransportError> {
        let request_id = Uuid::now_v7();
        let mut request = request.header(REQUEST_ID_HEADER, request_id.to_string());
        if let Some(token) = self.credentials.token() {
            request = request.bearer_auth(token);
        }

        debug!(
            operation = %operation,
            request_id = %request_id,
            "sending backend request"
        );

        let response = request
            .send()
            .await
            .map_err(|e| classify_send_error(operation, &e))?;

        let status = response.status();
        if let Some(err) = classify_status(operation, status) {
            report_diagnostic(&err, request_id);
            return Err(err);
        }

        response.json::<T>().await.map_err(|e| TransportError::Unknown {
            operation,
            message: format!("response decode failed: {e}"),
        })
    }
}

impl EmergencyApi for HttpTransport {
    async fn submit_emergency(
        &self,
        report: &EmergencyReport,
    ) -> Result<TriageResult, TransportError> {
        let operation = Operation::SubmitEmergency;
        let url = self.endpoint(operation, &["triage"])?;
        self.send(operation, self.client.post(url).json(report)).await
    }

    async fn get_status(
        &self,
        emergency_id: &EmergencyId,
    ) -> Result<StatusPayload, TransportError> {
        let operation = Operation::GetStatus;
        let url = self.endpoint(operation, &["status", emergency_id.as_str()])?;
        self.send(operation, self.client.get(url)).await
    }

    async fn get_hospital_detail(
        &self,
        emergency_id: &EmergencyId,
    ) -> Result<serde_json::Value, TransportError> {
        let operation = Operation::GetHospitalDetail;
        let url = self.endpoint(operation, &["hospitals", emergency_id.as_str()])?;
        self.send(operation, self.client.get(url)).await
    }

    async fn notify_hospital(&self, request: &NotifyRequest) -> Result<NotifyAck, TransportError> {
        let operation = Operation::NotifyHospital;
        let url = self.endpoint(operation, &["notify"])?;
        self.send(operation, self.client.post(url).json(request)).await
    }
}

// ---------------------------------------------------------------------------
// Failure classification
// ---------------------------------------------------------------------------

/// Map a non-success HTTP status to its error class.
///
/// Returns `None` for 2xx responses.
pub fn classify_status(operation: Operation, status: StatusCode) -> Option<TransportError> {
    if status.is_success() {
        return None;
    }
    let err = match status {
        StatusCode::UNAUTHORIZED => TransportError::Unauthorized { operation },
        StatusCode::NOT_FOUND => TransportError::NotFound { operation },
        s if s.is_server_error() => TransportError::ServerFault {
            operation,
            status: s.as_u16(),
        },
        s => TransportError::Unknown {
            operation,
            message: format!("unexpected HTTP {}", s.as_u16()),
        },
    };
    Some(err)
}

/// Map a failure to obtain any response.
fn classify_send_error(operation: Operation, err: &reqwest::Error) -> TransportError {
    if err.is_builder() {
        return TransportError::Unknown {
            operation,
            message: format!("request could not be built: {err}"),
        };
    }
    let message = if err.is_timeout() {
        format!("timed out: {err}")
    } else {
        err.to_string()
    };
    TransportError::Network { operation, message }
}

/// Emit the diagnostic event for failure classes worth an operator's eye.
fn report_diagnostic(err: &TransportError, request_id: Uuid) {
    match err {
        TransportError::Unauthorized { operation } => warn!(
            operation = %operation,
            request_id = %request_id,
            "backend rejected credentials, session expired"
        ),
        TransportError::ServerFault { operation, status } => warn!(
            operation = %operation,
            request_id = %request_id,
            status = *status,
            "backend server error, backend might be down"
        ),
        other => debug!(
            request_id = %request_id,
            error = %other,
            "backend request failed"
        ),
    }
}
