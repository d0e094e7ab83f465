//! Settings and client construction.

use aws_config::{BehaviorVersion, Region, retry::RetryConfig};
use std::env;

const DEFAULT_TABLE_NAME: &str = "DoDeck";
const DEFAULT_REGION: &str = "us-west-2";
const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Where the table lives and how the client behaves.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Settings {
    /// The single table holding every row. `TABLE_NAME`.
    pub table_name: String,
    /// AWS region. `AWS_REGION`.
    pub region: String,
    /// Endpoint override, e.g. a local DynamoDB. `DYNAMODB_ENDPOINT_URL`.
    pub endpoint_url: Option<String>,
    /// Attempts per request, including the first, before transient errors surface.
    /// `DYNAMODB_MAX_ATTEMPTS`.
    pub max_attempts: u32,
    /// Whether shared access requires a verified email claim. `REQUIRE_EMAIL_VERIFIED`.
    pub require_email_verified: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            table_name: DEFAULT_TABLE_NAME.to_string(),
            region: DEFAULT_REGION.to_string(),
            endpoint_url: None,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            require_email_verified: true,
        }
    }
}

fn flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl Settings {
    /// Read settings from the process environment, falling back to defaults for unset or
    /// unparsable variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Read settings through `lookup`, which maps a variable name to its value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let present = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        Self {
            table_name: present("TABLE_NAME").unwrap_or(defaults.table_name),
            region: present("AWS_REGION").unwrap_or(defaults.region),
            endpoint_url: present("DYNAMODB_ENDPOINT_URL"),
            max_attempts: present("DYNAMODB_MAX_ATTEMPTS")
                .and_then(|value| value.trim().parse().ok())
                .filter(|attempts| *attempts > 0)
                .unwrap_or(defaults.max_attempts),
            require_email_verified: present("REQUIRE_EMAIL_VERIFIED")
                .and_then(|value| flag(&value))
                .unwrap_or(defaults.require_email_verified),
        }
    }
}

/// Build a DynamoDB client for `settings`.
///
/// Credentials come from the default provider chain. Throttling and transient failures are
/// retried by the client with the standard backoff, up to `max_attempts`.
pub async fn create_client(settings: &Settings) -> aws_sdk_dynamodb::Client {
    let mut loader = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(settings.region.clone()))
        .retry_config(RetryConfig::standard().with_max_attempts(settings.max_attempts));
    if let Some(endpoint_url) = &settings.endpoint_url {
        loader = loader.endpoint_url(endpoint_url);
    }
    let sdk_config = loader.load().await;
    aws_sdk_dynamodb::Client::new(&sdk_config)
}
