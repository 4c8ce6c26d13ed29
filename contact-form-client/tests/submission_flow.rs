//! Form submission against a stubbed relay, with the clock and storage under test control.

use ::std::{sync::Arc, time::Duration};
use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use contact_form_client::{
    Cooldown::LAST_SUBMIT_KEY,
    Form::{ContactClient, ContactForm, SubmitError},
    Notification::{Notification, NotificationKind},
    Storage::{KeyValueStorage, MemoryStorage},
    Time::Clock,
};
use parking_lot::Mutex;
use serde_json::json;
use wiremock::{
    matchers::{body_partial_json, method, path},
    Mock, MockServer, ResponseTemplate,
};

struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    fn new() -> Arc<Self> {
        Arc::new(ManualClock {
            now: Mutex::new(Utc.with_ymd_and_hms(2026, 5, 4, 10, 0, 0).unwrap()),
        })
    }

    fn advance(&self, by: TimeDelta) {
        *self.now.lock() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

fn filled_form() -> ContactForm {
    ContactForm::new("Ada Lovelace", "ada@example.com", "Engine", "Shall we talk?")
}

async fn relay(status: u16, body: serde_json::Value, expected_calls: u64) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/contact"))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
        .expect(expected_calls)
        .mount(&server)
        .await;
    server
}

fn client(server: &MockServer, storage: Arc<MemoryStorage>, clock: Arc<ManualClock>) -> ContactClient {
    ContactClient::new(format!("{}/contact", server.uri()), storage)
        .unwrap()
        .with_clock(clock)
}

#[tokio::test]
async fn success_clears_form_and_starts_cooldown() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/contact"))
        .and(body_partial_json(json!({"name": "Ada Lovelace", "email": "ada@example.com"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true, "message": "Message sent successfully"})))
        .expect(1)
        .mount(&server)
        .await;
    let storage = Arc::new(MemoryStorage::new());
    let clock = ManualClock::new();
    let client = client(&server, Arc::clone(&storage), Arc::clone(&clock));

    let mut form = filled_form();
    let notification = client.submit_and_notify(&mut form).await;

    assert_eq!(notification, Some(Notification::success()));
    assert_eq!(form.name, "");
    assert_eq!(form.message, "");
    assert!(!client.is_submitting());
    let stored = storage.get(LAST_SUBMIT_KEY).unwrap().unwrap();
    assert_eq!(stored, clock.now().timestamp_millis().to_string());
}

#[tokio::test]
async fn second_attempt_within_a_minute_stays_local() {
    let server = relay(200, json!({"success": true, "message": "Message sent successfully"}), 1).await;
    let clock = ManualClock::new();
    let client = client(&server, Arc::new(MemoryStorage::new()), Arc::clone(&clock));

    let mut first = filled_form();
    client.submit(&mut first).await.unwrap();

    clock.advance(TimeDelta::seconds(30));
    let mut second = filled_form();
    let result = client.submit(&mut second).await;
    assert!(matches!(result, Err(SubmitError::RateLimited { retry_after_ms: 30_000 })));
    assert_eq!(second.name, "Ada Lovelace");

    let notification = client.submit_and_notify(&mut second).await.unwrap();
    assert_eq!(notification.kind, NotificationKind::RateLimited);
    assert_eq!(notification.title, "Please wait");
}

#[tokio::test]
async fn cooldown_expires_after_sixty_seconds() {
    let server = relay(200, json!({"success": true, "message": "Message sent successfully"}), 2).await;
    let clock = ManualClock::new();
    let client = client(&server, Arc::new(MemoryStorage::new()), Arc::clone(&clock));

    client.submit(&mut filled_form()).await.unwrap();
    clock.advance(TimeDelta::milliseconds(60_000));
    client.submit(&mut filled_form()).await.unwrap();
}

#[tokio::test]
async fn rejection_keeps_fields_and_does_not_start_cooldown() {
    let server = relay(400, json!({"error": "Invalid email format"}), 1).await;
    let storage = Arc::new(MemoryStorage::new());
    let client = client(&server, Arc::clone(&storage), ManualClock::new());

    let mut form = filled_form();
    let result = client.submit(&mut form).await;
    match result {
        Err(SubmitError::Rejected { status, error }) => {
            assert_eq!(status, 400);
            assert_eq!(error, "Invalid email format");
        }
        other => panic!("expected a rejection, got {other:?}"),
    }
    assert_eq!(form, filled_form());
    assert_eq!(storage.get(LAST_SUBMIT_KEY).unwrap(), None);
}

#[tokio::test]
async fn unreachable_relay_shows_failure() {
    let storage = Arc::new(MemoryStorage::new());
    let client = ContactClient::new("http://127.0.0.1:1/contact", storage.clone()).unwrap();

    let mut form = filled_form();
    let notification = client.submit_and_notify(&mut form).await;

    assert_eq!(notification, Some(Notification::failure()));
    assert_eq!(form.subject, "Engine");
    assert!(!client.is_submitting());
    assert_eq!(storage.get(LAST_SUBMIT_KEY).unwrap(), None);
}

fn slow_relay(delay_ms: u64) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_json(json!({"success": true, "message": "Message sent successfully"}))
        .set_delay(Duration::from_millis(delay_ms))
}

#[tokio::test]
async fn submitting_is_visible_while_the_relay_answers() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/contact"))
        .respond_with(slow_relay(300))
        .expect(1)
        .mount(&server)
        .await;
    let client = Arc::new(client(&server, Arc::new(MemoryStorage::new()), ManualClock::new()));
    let state = client.submit_state();
    assert!(!state.is_submitting());

    let pending = tokio::spawn({
        let client = Arc::clone(&client);
        async move {
            let mut form = filled_form();
            client.submit(&mut form).await.map(|()| form)
        }
    });

    let mut seen = false;
    for _ in 0..100 {
        if state.is_submitting() {
            seen = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert!(seen, "submit state never turned on while the relay was pending");

    let mut other = filled_form();
    assert!(matches!(client.submit(&mut other).await, Err(SubmitError::AlreadySubmitting)));
    assert_eq!(other, filled_form());

    let form = pending.await.unwrap().unwrap();
    assert_eq!(form.name, "");
    assert!(!state.is_submitting());
}

#[tokio::test]
async fn cancelled_submit_releases_the_form() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/contact"))
        .respond_with(slow_relay(500))
        .mount(&server)
        .await;
    let storage = Arc::new(MemoryStorage::new());
    let client = client(&server, Arc::clone(&storage), ManualClock::new());

    let mut form = filled_form();
    let attempt = tokio::time::timeout(Duration::from_millis(50), client.submit(&mut form)).await;
    assert!(attempt.is_err());
    assert!(!client.is_submitting());
    assert_eq!(form, filled_form());
    assert_eq!(storage.get(LAST_SUBMIT_KEY).unwrap(), None);

    client.submit(&mut form).await.unwrap();
    assert_eq!(form.name, "");
    assert!(storage.get(LAST_SUBMIT_KEY).unwrap().is_some());
}
