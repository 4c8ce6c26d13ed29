use ::std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use reqwest::Client;
use thiserror::Error;

use crate::{
    common_types::Contact::{ContactPayload, LocationType, RelayReply},
    Cooldown::SubmitCooldown,
    Notification::Notification,
    Storage::{KeyValueStorage, StorageError},
    Time::{Clock, SystemClock},
};

#[derive(Debug, Clone, PartialEq)]
pub enum Geolocation {
    Position {
        latitude: f64,
        longitude: f64,
        source: LocationType,
    },
    Unavailable(String),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContactForm {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
    pub geolocation: Option<Geolocation>,
}

impl ContactForm {
    pub fn new<N, E, S, M>(name: N, email: E, subject: S, message: M) -> Self
    where
        N: Into<String>,
        E: Into<String>,
        S: Into<String>,
        M: Into<String>,
    {
        ContactForm {
            name: name.into(),
            email: email.into(),
            subject: subject.into(),
            message: message.into(),
            geolocation: None,
        }
    }

    pub fn clear(&mut self) {
        self.name.clear();
        self.email.clear();
        self.subject.clear();
        self.message.clear();
        self.geolocation = None;
    }

    pub fn to_payload(&self) -> ContactPayload {
        let mut payload = ContactPayload {
            name: Some(self.name.clone()),
            email: Some(self.email.clone()),
            subject: Some(self.subject.clone()),
            message: Some(self.message.clone()),
            ..Default::default()
        };
        match &self.geolocation {
            Some(Geolocation::Position { latitude, longitude, source }) => {
                payload.latitude = Some(*latitude);
                payload.longitude = Some(*longitude);
                payload.location_type = Some(*source);
            }
            Some(Geolocation::Unavailable(reason)) => {
                payload.location_error = Some(reason.clone());
            }
            None => (),
        }
        payload
    }
}

// Readable from anywhere while a submit is awaiting the relay,
// the submit control is disabled while this is true
#[derive(Debug, Clone, Default)]
pub struct SubmitState {
    in_flight: Arc<AtomicBool>,
}

impl SubmitState {
    pub fn is_submitting(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    fn begin(&self) -> Option<InFlight> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        Some(InFlight(Arc::clone(&self.in_flight)))
    }
}

// Clears the flag however the submit ends, including when its future is dropped
struct InFlight(Arc<AtomicBool>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[derive(Error, Debug)]
pub enum SubmitError {
    #[error("submitted less than a minute ago, retry in {retry_after_ms} ms")]
    RateLimited { retry_after_ms: i64 },
    #[error("a submission is already in flight")]
    AlreadySubmitting,
    #[error("failed to reach contact relay: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("contact relay answered {status}: {error}")]
    Rejected { status: u16, error: String },
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl SubmitError {
    // AlreadySubmitting has no notification, the control is disabled anyway
    pub fn notification(&self) -> Option<Notification> {
        match self {
            SubmitError::RateLimited { .. } => Some(Notification::rate_limited()),
            SubmitError::AlreadySubmitting => None,
            SubmitError::Transport(_)
            | SubmitError::Rejected { .. }
            | SubmitError::Storage(_) => Some(Notification::failure()),
        }
    }
}

pub struct ContactClient {
    http_client: Client,
    endpoint: String,
    cooldown: SubmitCooldown,
    clock: Arc<dyn Clock>,
    state: SubmitState,
}

impl ContactClient {
    pub fn new<U: Into<String>>(endpoint: U, storage: Arc<dyn KeyValueStorage>) -> Result<Self, SubmitError> {
        Ok(ContactClient {
            http_client: Client::builder().build()?,
            endpoint: endpoint.into(),
            cooldown: SubmitCooldown::new(storage),
            clock: Arc::new(SystemClock),
            state: SubmitState::default(),
        })
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn submit_state(&self) -> SubmitState {
        self.state.clone()
    }

    pub fn is_submitting(&self) -> bool {
        self.state.is_submitting()
    }

    // 1. Refuse if a request is already in flight
    // 2. Refuse locally if the last successful submit is under a minute old
    // 3. POST the form to the relay, holding the submitting flag meanwhile
    // 4. On success clear the form and remember when, on failure keep the fields
    #[tracing::instrument(skip_all, fields(endpoint=%self.endpoint))]
    pub async fn submit(&self, form: &mut ContactForm) -> Result<(), SubmitError> {
        let Some(_in_flight) = self.state.begin() else {
            return Err(SubmitError::AlreadySubmitting);
        };
        if let Some(remaining) = self.cooldown.remaining(self.clock.now())? {
            tracing::info!("Submission blocked locally, {} ms left", remaining.num_milliseconds());
            return Err(SubmitError::RateLimited {
                retry_after_ms: remaining.num_milliseconds(),
            });
        }

        self.send(&form.to_payload()).await?;

        form.clear();
        // The message went out, a storage hiccup here only loses the cooldown
        if let Err(err) = self.cooldown.record(self.clock.now()) {
            tracing::warn!("Failed to store last submit time, {err}");
        }
        tracing::info!("Contact form submitted");
        Ok(())
    }

    pub async fn submit_and_notify(&self, form: &mut ContactForm) -> Option<Notification> {
        match self.submit(form).await {
            Ok(()) => Some(Notification::success()),
            Err(err) => {
                tracing::warn!("Contact form submission failed, {err}");
                err.notification()
            }
        }
    }

    async fn send(&self, payload: &ContactPayload) -> Result<(), SubmitError> {
        let response = self.http_client.post(&self.endpoint).json(payload).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let error = match response.json::<RelayReply>().await {
            Ok(RelayReply::Failure(failure)) => failure.error,
            _ => status.canonical_reason().unwrap_or("Unknown error").to_string(),
        };
        Err(SubmitError::Rejected {
            status: status.as_u16(),
            error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Storage::MemoryStorage;

    #[test]
    fn payload_carries_geolocation() {
        let mut form = ContactForm::new("Ada", "ada@example.com", "Hi", "Hello");
        form.geolocation = Some(Geolocation::Position { latitude: 1.0, longitude: 2.0, source: LocationType::Gps });
        let payload = form.to_payload();
        assert_eq!(payload.latitude, Some(1.0));
        assert_eq!(payload.location_type, Some(LocationType::Gps));
        assert_eq!(payload.location_error, None);

        form.geolocation = Some(Geolocation::Unavailable("denied".to_string()));
        let payload = form.to_payload();
        assert_eq!(payload.latitude, None);
        assert_eq!(payload.location_error.as_deref(), Some("denied"));
    }

    #[test]
    fn in_flight_guard_is_exclusive_and_released_on_drop() {
        let state = SubmitState::default();
        let guard = state.begin().unwrap();
        assert!(state.is_submitting());
        assert!(state.begin().is_none());
        drop(guard);
        assert!(!state.is_submitting());
        assert!(state.begin().is_some());
    }

    #[tokio::test]
    async fn in_flight_client_does_not_resubmit() {
        // Nothing listens here, reaching the network would fail with Transport
        let client = ContactClient::new("http://127.0.0.1:1/contact", Arc::new(MemoryStorage::new())).unwrap();
        let _held = client.submit_state().begin().unwrap();
        let mut form = ContactForm::new("Ada", "ada@example.com", "Hi", "Hello");
        assert!(matches!(client.submit(&mut form).await, Err(SubmitError::AlreadySubmitting)));
        assert_eq!(form.name, "Ada");
        assert!(client.is_submitting());
    }

    #[test]
    fn errors_map_to_notifications() {
        assert_eq!(SubmitError::RateLimited { retry_after_ms: 5 }.notification(), Some(Notification::rate_limited()));
        assert_eq!(SubmitError::AlreadySubmitting.notification(), None);
        let rejected = SubmitError::Rejected { status: 400, error: "Input too long".to_string() };
        assert_eq!(rejected.notification(), Some(Notification::failure()));
    }
}
