//! Interceptor pipeline wrapped around every outgoing call.
//!
//! Request stages run in order before the transport; any stage may reject
//! the call, in which case later stages and the transport never run.
//! The transport result is then classified once and handed through every
//! response stage in order.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::transport::{ApiRequest, ApiResponse, Transport, TransportError};
use super::ApiError;
use crate::auth::{Claims, SessionManager, TeardownReason};

#[async_trait]
pub trait RequestStage: Send + Sync {
    async fn on_request(&self, request: &mut ApiRequest) -> Result<(), ApiError>;
}

#[async_trait]
pub trait ResponseStage: Send + Sync {
    async fn on_response(
        &self,
        request: &ApiRequest,
        outcome: Result<ApiResponse, ApiError>,
    ) -> Result<ApiResponse, ApiError>;
}

pub struct Pipeline {
    transport: Arc<dyn Transport>,
    request_stages: Vec<Arc<dyn RequestStage>>,
    response_stages: Vec<Arc<dyn ResponseStage>>,
}

impl Pipeline {
    /// Bare pipeline with no stages
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            request_stages: Vec::new(),
            response_stages: Vec::new(),
        }
    }

    /// Standard chain: bearer attachment with proactive expiry on the way
    /// out, tracing and authorization-failure teardown on the way back.
    pub fn authenticated(transport: Arc<dyn Transport>, session: Arc<SessionManager>) -> Self {
        Self::new(transport)
            .with_request_stage(Arc::new(BearerAuth::new(Arc::clone(&session))))
            .with_response_stage(Arc::new(TraceResponses))
            .with_response_stage(Arc::new(AuthFailureGuard::new(session)))
    }

    pub fn with_request_stage(mut self, stage: Arc<dyn RequestStage>) -> Self {
        self.request_stages.push(stage);
        self
    }

    pub fn with_response_stage(mut self, stage: Arc<dyn ResponseStage>) -> Self {
        self.response_stages.push(stage);
        self
    }

    pub async fn execute(&self, mut request: ApiRequest) -> Result<ApiResponse, ApiError> {
        for stage in &self.request_stages {
            stage.on_request(&mut request).await?;
        }

        let mut outcome = classify(self.transport.send(&request).await);

        for stage in &self.response_stages {
            outcome = stage.on_response(&request, outcome).await;
        }
        outcome
    }
}

/// Map a raw transport result onto the error taxonomy. A missing response is
/// never an authorization failure.
pub fn classify(result: Result<ApiResponse, TransportError>) -> Result<ApiResponse, ApiError> {
    match result {
        Ok(response) if response.is_success() => Ok(response),
        Ok(response) => Err(ApiError::from_status(response.status, &response.body)),
        Err(TransportError::Connect(msg)) => Err(ApiError::NoConnectivity(msg)),
        Err(TransportError::Timeout) => Err(ApiError::Timeout),
        Err(TransportError::Other(msg)) => Err(ApiError::Transport(msg)),
    }
}

/// Attaches the stored credential, or aborts the call if it has expired.
///
/// Checked on every call: time passes between calls and can cross the
/// expiration boundary.
pub struct BearerAuth {
    session: Arc<SessionManager>,
}

impl BearerAuth {
    pub fn new(session: Arc<SessionManager>) -> Self {
        Self { session }
    }
}

#[async_trait]
impl RequestStage for BearerAuth {
    async fn on_request(&self, request: &mut ApiRequest) -> Result<(), ApiError> {
        let stored = match self.session.stored_credential().await {
            Ok(stored) => stored,
            Err(e) => {
                warn!(error = %e, "Failed to read credential, sending unauthenticated");
                None
            }
        };

        let Some(token) = stored else {
            return Ok(());
        };

        match Claims::decode(&token) {
            Ok(claims) if !claims.is_expired() => request.attach_bearer(&token),
            Ok(_) => {
                debug!(path = %request.path, "Credential expired, aborting call");
                self.session.invalidate(&token, TeardownReason::Expired).await;
                Err(ApiError::ExpiredSession)
            }
            Err(e) => {
                warn!(error = %e, path = %request.path, "Stored credential unreadable, aborting call");
                self.session
                    .invalidate(&token, TeardownReason::Unreadable)
                    .await;
                Err(ApiError::ExpiredSession)
            }
        }
    }
}

/// Tears down the session whose credential the server rejected, then passes
/// the failure on to the caller. A call that went out without a credential
/// had nothing to reject, so its 401 leaves the session alone.
pub struct AuthFailureGuard {
    session: Arc<SessionManager>,
}

impl AuthFailureGuard {
    pub fn new(session: Arc<SessionManager>) -> Self {
        Self { session }
    }
}

#[async_trait]
impl ResponseStage for AuthFailureGuard {
    async fn on_response(
        &self,
        request: &ApiRequest,
        outcome: Result<ApiResponse, ApiError>,
    ) -> Result<ApiResponse, ApiError> {
        if let Err(ApiError::Unauthorized) = outcome {
            match request.credential() {
                Some(token) => {
                    warn!(path = %request.path, "Server rejected credential");
                    self.session
                        .invalidate(token, TeardownReason::Rejected)
                        .await;
                }
                None => {
                    debug!(path = %request.path, "Unauthorized on a call without credential");
                }
            }
        }
        outcome
    }
}

/// Debug-level log line per completed call.
pub struct TraceResponses;

#[async_trait]
impl ResponseStage for TraceResponses {
    async fn on_response(
        &self,
        request: &ApiRequest,
        outcome: Result<ApiResponse, ApiError>,
    ) -> Result<ApiResponse, ApiError> {
        match &outcome {
            Ok(response) => debug!(
                method = request.method.as_str(),
                path = %request.path,
                status = response.status,
                "Call succeeded"
            ),
            Err(e) => debug!(
                method = request.method.as_str(),
                path = %request.path,
                class = ?e.class(),
                error = %e,
                "Call failed"
            ),
        }
        outcome
    }
}
