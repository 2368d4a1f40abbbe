use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use shared::{
    domain::{FormField, FormState},
    error::ApiErrorBody,
    protocol::{ItineraryRequest, ItineraryResponse},
};
use tokio::sync::{broadcast, oneshot, Mutex};
use tracing::{debug, info, warn};
use url::Url;

pub mod config;
pub mod error;

pub use config::{load_settings, OverlapPolicy, Settings};
pub use error::SubmitError;

const EVENT_CHANNEL_CAPACITY: usize = 64;

pub type SubmissionId = u64;

#[async_trait]
pub trait ItineraryService: Send + Sync {
    async fn generate(&self, request: &ItineraryRequest)
        -> Result<ItineraryResponse, SubmitError>;
}

/// Talks to the generator over HTTP: one JSON `POST` per call, no retries.
pub struct HttpItineraryService {
    http: Client,
    endpoint: Url,
}

impl HttpItineraryService {
    pub fn new(endpoint: Url) -> Self {
        Self::with_client(Client::new(), endpoint)
    }

    pub fn with_client(http: Client, endpoint: Url) -> Self {
        Self { http, endpoint }
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = settings.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().context("failed to build http client")?;
        Ok(Self::with_client(http, settings.endpoint_url()?))
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl ItineraryService for HttpItineraryService {
    async fn generate(
        &self,
        request: &ItineraryRequest,
    ) -> Result<ItineraryResponse, SubmitError> {
        let res = self
            .http
            .post(self.endpoint.clone())
            .json(request)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let body = match res.text().await {
                Ok(body) => body,
                Err(err) => {
                    warn!(%status, error = %err, "failed to read itinerary error body");
                    String::new()
                }
            };
            let detail = match serde_json::from_str::<ApiErrorBody>(&body) {
                Ok(parsed) => Some(parsed.message()),
                Err(_) if body.trim().is_empty() => None,
                Err(_) => Some(body.trim().to_string()),
            };
            return Err(SubmitError::Status { status, detail });
        }

        let body = res.bytes().await?;
        serde_json::from_slice(&body).map_err(|err| SubmitError::MalformedResponse(err.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Pending,
    Displaying,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionSnapshot {
    pub form: FormState,
    pub result: Option<String>,
    pub busy: bool,
    pub phase: Phase,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone)]
pub enum ControllerEvent {
    SubmissionStarted {
        id: SubmissionId,
        request: ItineraryRequest,
    },
    ItineraryReady {
        id: SubmissionId,
        itinerary: String,
    },
    SubmissionFailed {
        id: SubmissionId,
        message: String,
    },
    SubmissionCancelled {
        id: SubmissionId,
    },
    SubmissionSuperseded {
        id: SubmissionId,
    },
}

#[derive(Debug, Clone, Copy)]
enum Interrupt {
    Cancelled,
    Superseded,
}

impl From<Interrupt> for SubmitError {
    fn from(value: Interrupt) -> Self {
        match value {
            Interrupt::Cancelled => SubmitError::Cancelled,
            Interrupt::Superseded => SubmitError::Superseded,
        }
    }
}

struct InFlight {
    id: SubmissionId,
    interrupt: oneshot::Sender<Interrupt>,
}

#[derive(Default)]
struct ControllerState {
    form: FormState,
    result: Option<String>,
    phase: Phase,
    last_error: Option<String>,
    next_id: SubmissionId,
    // Busy exactly while this is set.
    in_flight: Option<InFlight>,
}

impl ControllerState {
    /// Clears an in-flight entry whose `submit` future was dropped without
    /// settling. Its interrupt receiver went with it, so the sender is closed.
    fn reap_abandoned(&mut self) -> Option<SubmissionId> {
        if !self
            .in_flight
            .as_ref()
            .is_some_and(|in_flight| in_flight.interrupt.is_closed())
        {
            return None;
        }
        self.phase = Phase::Idle;
        self.in_flight.take().map(|in_flight| in_flight.id)
    }
}

/// Owns the form, the last itinerary and the busy flag, and drives one
/// generator call per accepted submission.
pub struct SubmissionController {
    service: Arc<dyn ItineraryService>,
    policy: OverlapPolicy,
    inner: Mutex<ControllerState>,
    events: broadcast::Sender<ControllerEvent>,
}

impl SubmissionController {
    pub fn new(service: Arc<dyn ItineraryService>) -> Arc<Self> {
        Self::new_with_policy(service, OverlapPolicy::default())
    }

    pub fn new_with_policy(service: Arc<dyn ItineraryService>, policy: OverlapPolicy) -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Arc::new(Self {
            service,
            policy,
            inner: Mutex::new(ControllerState::default()),
            events,
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Arc<Self>> {
        let service = HttpItineraryService::from_settings(settings)?;
        info!(
            endpoint = %service.endpoint(),
            overlap_policy = %settings.overlap_policy,
            "itinerary controller ready"
        );
        Ok(Self::new_with_policy(
            Arc::new(service),
            settings.overlap_policy,
        ))
    }

    pub fn policy(&self) -> OverlapPolicy {
        self.policy
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ControllerEvent> {
        self.events.subscribe()
    }

    pub async fn set_field(&self, field: FormField, value: impl Into<String>) {
        self.inner.lock().await.form.set(field, value);
    }

    pub async fn set_destination(&self, value: impl Into<String>) {
        self.set_field(FormField::Destination, value).await;
    }

    pub async fn set_budget(&self, value: impl Into<String>) {
        self.set_field(FormField::Budget, value).await;
    }

    pub async fn set_interests(&self, value: impl Into<String>) {
        self.set_field(FormField::Interests, value).await;
    }

    pub async fn form(&self) -> FormState {
        self.inner.lock().await.form.clone()
    }

    pub async fn result(&self) -> Option<String> {
        self.inner.lock().await.result.clone()
    }

    pub async fn is_busy(&self) -> bool {
        let mut guard = self.inner.lock().await;
        guard.reap_abandoned();
        guard.in_flight.is_some()
    }

    pub async fn phase(&self) -> Phase {
        let mut guard = self.inner.lock().await;
        guard.reap_abandoned();
        guard.phase
    }

    pub async fn snapshot(&self) -> SubmissionSnapshot {
        let mut guard = self.inner.lock().await;
        guard.reap_abandoned();
        SubmissionSnapshot {
            form: guard.form.clone(),
            result: guard.result.clone(),
            busy: guard.in_flight.is_some(),
            phase: guard.phase,
            last_error: guard.last_error.clone(),
        }
    }

    /// Builds a request from the current form and sends it.
    ///
    /// On failure the previous itinerary is kept. The busy flag is cleared
    /// once the call settles, whatever the outcome, or once this future is
    /// dropped unsettled.
    pub async fn submit(&self) -> Result<String, SubmitError> {
        let (id, request, mut interrupt_rx) = {
            let mut guard = self.inner.lock().await;

            if let Some(abandoned) = guard.reap_abandoned() {
                debug!(submission_id = abandoned, "cleared abandoned itinerary request");
            }

            if let Some(previous) = guard.in_flight.take() {
                match self.policy {
                    OverlapPolicy::Reject => {
                        debug!(
                            submission_id = previous.id,
                            "rejecting submit while a request is pending"
                        );
                        guard.in_flight = Some(previous);
                        return Err(SubmitError::Busy);
                    }
                    OverlapPolicy::Supersede => {
                        let _ = previous.interrupt.send(Interrupt::Superseded);
                        info!(
                            submission_id = previous.id,
                            "superseding pending itinerary request"
                        );
                        let _ = self
                            .events
                            .send(ControllerEvent::SubmissionSuperseded { id: previous.id });
                    }
                }
            }

            guard.next_id += 1;
            let id = guard.next_id;
            let request = guard.form.to_request();
            let (interrupt_tx, interrupt_rx) = oneshot::channel();
            guard.in_flight = Some(InFlight {
                id,
                interrupt: interrupt_tx,
            });
            guard.phase = Phase::Pending;
            guard.last_error = None;
            (id, request, interrupt_rx)
        };

        if request.budget.is_nan() {
            debug!(submission_id = id, "budget is not numeric; sending null");
        }
        info!(
            submission_id = id,
            destination = %request.destination,
            interests = request.interests.len(),
            "submitting itinerary request"
        );
        let _ = self.events.send(ControllerEvent::SubmissionStarted {
            id,
            request: request.clone(),
        });

        let outcome = tokio::select! {
            outcome = self.service.generate(&request) => outcome,
            interrupt = &mut interrupt_rx => {
                return Err(interrupt.map(SubmitError::from).unwrap_or(SubmitError::Cancelled));
            }
        };

        let mut guard = self.inner.lock().await;
        if guard.in_flight.as_ref().map(|in_flight| in_flight.id) != Some(id) {
            // Interrupted after the response arrived but before we got the lock.
            return Err(interrupt_rx
                .try_recv()
                .map(SubmitError::from)
                .unwrap_or(SubmitError::Cancelled));
        }
        guard.in_flight = None;

        let outcome = outcome.and_then(|response| {
            response.itinerary.ok_or_else(|| {
                SubmitError::MalformedResponse("response has no `itinerary` field".into())
            })
        });

        match outcome {
            Ok(itinerary) => {
                guard.result = Some(itinerary.clone());
                guard.phase = Phase::Displaying;
                drop(guard);

                info!(
                    submission_id = id,
                    chars = itinerary.chars().count(),
                    "itinerary received"
                );
                let _ = self.events.send(ControllerEvent::ItineraryReady {
                    id,
                    itinerary: itinerary.clone(),
                });
                Ok(itinerary)
            }
            Err(err) => {
                let message = err.to_string();
                guard.last_error = Some(message.clone());
                guard.phase = Phase::Idle;
                drop(guard);

                warn!(submission_id = id, error = %message, "error generating itinerary");
                let _ = self
                    .events
                    .send(ControllerEvent::SubmissionFailed { id, message });
                Err(err)
            }
        }
    }

    /// Abandons the pending request, if any. The itinerary is left as it was.
    pub async fn cancel(&self) -> bool {
        let mut guard = self.inner.lock().await;
        guard.reap_abandoned();
        let Some(in_flight) = guard.in_flight.take() else {
            return false;
        };
        let _ = in_flight.interrupt.send(Interrupt::Cancelled);
        guard.phase = Phase::Idle;
        drop(guard);

        info!(submission_id = in_flight.id, "cancelled pending itinerary request");
        let _ = self
            .events
            .send(ControllerEvent::SubmissionCancelled { id: in_flight.id });
        true
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
