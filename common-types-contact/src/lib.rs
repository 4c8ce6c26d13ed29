use common_types;

pub type E = Box<dyn ::std::error::Error + Send + Sync + 'static>;

mod routes;
mod middleware;

#[allow(non_snake_case)]
pub mod Routes {
    pub use crate::routes::*;
}

#[allow(non_snake_case)]
pub mod Middleware {
    pub use crate::middleware::*;
}

#[allow(non_snake_case)]
pub mod Response {
    use axum::{http::StatusCode, Json};
    use thiserror::Error;
    use crate::common_types::Contact::RelayFailure;
    use crate::Discord::DeliveryError;

    pub type ServerResponse = (StatusCode, Json<RelayFailure>);

    pub fn status_response<E: ToString>(status: StatusCode, error: E) -> ServerResponse {
        (status, Json(RelayFailure {
            error: error.to_string(),
            details: None,
        }))
    }

    pub fn detailed_response<E: ToString, D: ToString>(status: StatusCode, error: E, details: D) -> ServerResponse {
        (status, Json(RelayFailure {
            error: error.to_string(),
            details: Some(details.to_string()),
        }))
    }

    pub fn internal_server_error<E: ToString>(err: E) -> ServerResponse {
        status_response(StatusCode::INTERNAL_SERVER_ERROR, err)
    }

    #[derive(Error, Debug)]
    pub enum RelayError {
        #[error("All fields are required")]
        MissingField,
        #[error("Invalid email format")]
        InvalidEmail,
        #[error("Input too long")]
        InputTooLong,
        #[error("Server configuration error")]
        Configuration,
        #[error("Failed to send message")]
        Delivery(#[from] DeliveryError),
        #[error("Failed to send message")]
        MalformedBody(String),
    }

    impl From<RelayError> for ServerResponse {
        fn from(err: RelayError) -> Self {
            match err {
                RelayError::MissingField
                | RelayError::InvalidEmail
                | RelayError::InputTooLong => status_response(StatusCode::BAD_REQUEST, err),
                RelayError::Configuration => internal_server_error(err),
                RelayError::Delivery(ref source) => {
                    detailed_response(StatusCode::INTERNAL_SERVER_ERROR, &err, source)
                }
                RelayError::MalformedBody(ref reason) => {
                    detailed_response(StatusCode::INTERNAL_SERVER_ERROR, &err, reason)
                }
            }
        }
    }
}

#[allow(non_snake_case)]
pub mod Discord {
    use ::std::net::IpAddr;
    use chrono::{DateTime, SecondsFormat, Utc};
    use reqwest::Client;
    use serde::Serialize;
    use thiserror::Error;
    use crate::common_types::Contact::LocationType;
    use crate::Routes::contact::submission::{Location, Submission};

    pub const MESSAGE_CONTENT: &str = "New Contact Form Submission";
    pub const EMBED_TITLE: &str = "New Contact Message!!!!";
    pub const EMBED_COLOR: u32 = 0x3498db;

    #[derive(Serialize, Debug, Clone, PartialEq)]
    pub struct WebhookMessage {
        pub content: String,
        pub embeds: Vec<Embed>,
    }

    #[derive(Serialize, Debug, Clone, PartialEq)]
    pub struct Embed {
        pub title: String,
        pub color: u32,
        pub fields: Vec<EmbedField>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub footer: Option<EmbedFooter>,
        pub timestamp: String,
    }

    #[derive(Serialize, Debug, Clone, PartialEq)]
    pub struct EmbedField {
        pub name: String,
        pub value: String,
        pub inline: bool,
    }

    #[derive(Serialize, Debug, Clone, PartialEq)]
    pub struct EmbedFooter {
        pub text: String,
    }

    impl EmbedField {
        fn new<N: Into<String>, V: Into<String>>(name: N, value: V, inline: bool) -> Self {
            EmbedField {
                name: name.into(),
                value: value.into(),
                inline,
            }
        }
    }

    fn location_value(location: &Location) -> String {
        match location {
            Location::Coordinates { latitude, longitude, kind } => {
                let (emoji, text) = match kind {
                    Some(LocationType::Gps) => ("🎯", "GPS (Precise Location)"),
                    Some(LocationType::Ip) => ("🌐", "IP-based (Estimated Location)"),
                    _ => ("📍", "Unknown"),
                };
                format!(
                    "{emoji} **Type:** {text}\n**Latitude:** {latitude:.6}\n**Longitude:** {longitude:.6}\n[📌 View on Google Maps](https://www.google.com/maps?q={latitude},{longitude})"
                )
            }
            Location::Unavailable(reason) => format!("❌ Unable to get location: {reason}"),
            Location::NotProvided => "Not available".to_string(),
        }
    }

    impl WebhookMessage {
        pub fn for_submission(submission: &Submission, ip: Option<IpAddr>, sent_at: DateTime<Utc>) -> Self {
            let ip = ip.map(|ip| ip.to_string()).unwrap_or_else(|| "Unknown".to_string());
            WebhookMessage {
                content: MESSAGE_CONTENT.to_string(),
                embeds: vec![Embed {
                    title: EMBED_TITLE.to_string(),
                    color: EMBED_COLOR,
                    fields: vec![
                        EmbedField::new("Name", submission.name.as_str(), true),
                        EmbedField::new("Email", submission.email.as_str(), true),
                        EmbedField::new("Subject", submission.subject.as_str(), false),
                        EmbedField::new("Message", submission.message.as_str(), false),
                        EmbedField::new("📍 Location", location_value(&submission.location), false),
                        EmbedField::new("🌐 IP Address", ip.as_str(), true),
                    ],
                    footer: Some(EmbedFooter {
                        text: format!("From IP: {ip}"),
                    }),
                    timestamp: sent_at.to_rfc3339_opts(SecondsFormat::Millis, true),
                }],
            }
        }
    }

    #[derive(Error, Debug)]
    pub enum DeliveryError {
        // Never built from a raw reqwest error, its text carries the secret webhook URL
        #[error("Failed to reach webhook: {0}")]
        Transport(reqwest::Error),
        #[error("Discord API error: {status} - {body}")]
        Rejected { status: u16, body: String },
    }

    // One attempt only, a failed delivery is reported to the caller as is
    pub async fn send(http_client: &Client, webhook_url: &str, message: &WebhookMessage) -> Result<(), DeliveryError> {
        let response = http_client
            .post(webhook_url)
            .json(message)
            .send()
            .await
            .map_err(|err| DeliveryError::Transport(err.without_url()))?;
        let status = response.status();
        tracing::info!("Discord response status: {status}");
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DeliveryError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }

}

#[allow(non_snake_case)]
pub mod State {
    use ::std::sync::Arc;
    use reqwest::Client;
    use crate::Constants::*;

    #[derive(Debug, Clone)]
    pub struct CorsPolicy {
        pub allowed_origins: Vec<String>,
        pub default_origin: String,
    }

    impl CorsPolicy {
        pub fn new<I, S>(allowed_origins: I, default_origin: S) -> Self
        where
            I: IntoIterator,
            I::Item: Into<String>,
            S: Into<String>,
        {
            CorsPolicy {
                allowed_origins: allowed_origins.into_iter().map(Into::into).collect(),
                default_origin: default_origin.into(),
            }
        }

        // Allow-listed origins are echoed back, anything else gets the default
        pub fn allow_origin<'a>(&'a self, origin: Option<&'a str>) -> &'a str {
            match origin {
                Some(origin) if self.allowed_origins.iter().any(|allowed| allowed == origin) => origin,
                _ => &self.default_origin,
            }
        }
    }

    pub struct InternalAppState {
        pub http_client: Client,
        pub webhook_url: Option<String>,
        pub cors: CorsPolicy,
        pub development_mode: bool,
    }
    pub type AppState = Arc<InternalAppState>;

    pub fn make_state() -> Result<AppState, crate::E> {
        tracing::info!("Setting up HTTP client");
        let http_client = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;

        if DISCORD_WEBHOOK_URL.is_none() {
            tracing::warn!("DISCORD_WEBHOOK_URL is not configured, every submission will be answered with a configuration error");
        }

        tracing::info!("Creating AppState");
        Ok(Arc::new(InternalAppState {
            http_client,
            webhook_url: DISCORD_WEBHOOK_URL.clone(),
            cors: CorsPolicy::new(ALLOWED_ORIGINS.iter().cloned(), DEFAULT_ORIGIN.clone()),
            development_mode: *DEVELOPMENT_MODE,
        }))
    }

}

#[allow(non_snake_case)]
pub mod Constants {
    use lazy_static::lazy_static;

    pub const DEFAULT_ALLOWED_ORIGINS: [&str; 6] = [
        "https://serelix.xyz",
        "https://www.serelix.xyz",
        "http://localhost:8080",
        "http://127.0.0.1:8080",
        "http://localhost:5173",
        "http://127.0.0.1:5173",
    ];

    // WARNING: These are global variables that get
    // initialised at the entry point, and should not
    // be written to after
    lazy_static!{
        // Missing is allowed here, the handler answers with a configuration error instead
        pub static ref DISCORD_WEBHOOK_URL: Option<String> = {
            dotenvy::var("DISCORD_WEBHOOK_URL").ok().filter(|url| !url.trim().is_empty())
        };
        pub static ref DEVELOPMENT_MODE: bool = {
            dotenvy::var("DEVELOPMENT_MODE").unwrap_or("false".to_owned()).parse().expect("Failed to parse DEVELOPMENT_MODE")
        };
        pub static ref ALLOWED_ORIGINS: Vec<String> = {
            match dotenvy::var("ALLOWED_ORIGINS") {
                Ok(origins) => {
                    let origins: Vec<String> = origins.split(',')
                        .map(|origin| origin.trim().to_owned())
                        .filter(|origin| !origin.is_empty())
                        .collect();
                    tracing::info!("Using custom ALLOWED_ORIGINS: {origins:?}");
                    origins
                }
                Err(_) => DEFAULT_ALLOWED_ORIGINS.iter().map(|origin| origin.to_string()).collect(),
            }
        };
        pub static ref DEFAULT_ORIGIN: String = {
            dotenvy::var("DEFAULT_ORIGIN").unwrap_or(DEFAULT_ALLOWED_ORIGINS[0].to_owned())
        };
        pub static ref LOCAL_PORT: u16 = {
            let maybe = dotenvy::var("LOCAL_PORT");
            let mut port = 3000;
            match maybe {
                Ok(value) => {
                    if let Ok(new_port) = value.parse() {
                        port = new_port;
                        tracing::info!("Using custom LOCAL_PORT: {port}");
                    } else {
                        tracing::info!("Failed to parse LOCAL_PORT, using default, {port}");
                    }
                }
                _ => ()
            }
            port
        };
    }
}
