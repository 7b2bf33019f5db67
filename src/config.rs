use std::{env, str::FromStr, time::Duration};

use crate::error::ConfigError;

pub const DEFAULT_AMQP_URL: &str = "amqp://127.0.0.1:5672/%2f";
pub const DEFAULT_STREAM_URL: &str = "https://stream.twitter.com/1.1/statuses/filter.json";
pub const DEFAULT_TOPIC: &str = "votes";
pub const DEFAULT_CONSUMER_GROUP: &str = "counter";

/// Settings shared by both processes.
#[derive(Debug, Clone)]
pub struct CommonConfig {
    pub database_url: String,
    pub amqp_url: String,
    pub topic: String,
    pub db_health_interval: Duration,
}

/// Settings for the ingestion process (stream adapter, publisher, watchdog).
#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub common: CommonConfig,
    pub stream_url: String,
    pub backoff: Duration,
    pub dial_timeout: Duration,
    pub watchdog_interval: Duration,
    pub channel_capacity: usize,
    pub credentials: Credentials,
}

/// Settings for the aggregation process.
#[derive(Debug, Clone)]
pub struct CounterConfig {
    pub common: CommonConfig,
    pub consumer_group: String,
    pub flush_interval: Duration,
}

/// OAuth 1.0a credential set for the stream service.
#[derive(Clone)]
pub struct Credentials {
    pub consumer_key: String,
    pub consumer_secret: String,
    pub access_token: String,
    pub access_secret: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("consumer_key", &self.consumer_key)
            .field("consumer_secret", &"***")
            .field("access_token", &"***")
            .field("access_secret", &"***")
            .finish()
    }
}

impl Credentials {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            consumer_key: required("SP_TWITTER_KEY")?,
            consumer_secret: required("SP_TWITTER_SECRET")?,
            access_token: required("SP_TWITTER_ACCESSTOKEN")?,
            access_secret: required("SP_TWITTER_ACCESSSECRET")?,
        })
    }
}

impl CommonConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            database_url: required("DATABASE_URL")?,
            amqp_url: env::var("AMQP_URL").unwrap_or_else(|_| DEFAULT_AMQP_URL.to_string()),
            topic: env::var("VOTES_TOPIC").unwrap_or_else(|_| DEFAULT_TOPIC.to_string()),
            db_health_interval: Duration::from_secs(parsed("DB_HEALTH_INTERVAL_SECS", 60)?),
        })
    }
}

impl IngestConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let channel_capacity = parsed("VOTE_CHANNEL_CAPACITY", 1usize)?;
        if channel_capacity == 0 {
            return Err(ConfigError::Invalid {
                name: "VOTE_CHANNEL_CAPACITY",
                value: "0".to_string(),
            });
        }

        Ok(Self {
            common: CommonConfig::from_env()?,
            stream_url: env::var("STREAM_URL").unwrap_or_else(|_| DEFAULT_STREAM_URL.to_string()),
            backoff: Duration::from_secs(parsed("STREAM_BACKOFF_SECS", 10)?),
            dial_timeout: Duration::from_secs(parsed("STREAM_DIAL_TIMEOUT_SECS", 5)?),
            watchdog_interval: Duration::from_secs(parsed("WATCHDOG_INTERVAL_SECS", 60)?),
            channel_capacity,
            credentials: Credentials::from_env()?,
        })
    }
}

impl CounterConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            common: CommonConfig::from_env()?,
            consumer_group: env::var("VOTES_CONSUMER_GROUP")
                .unwrap_or_else(|_| DEFAULT_CONSUMER_GROUP.to_string()),
            flush_interval: Duration::from_millis(parsed("FLUSH_INTERVAL_MILLIS", 1000)?),
        })
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::Missing(name)),
    }
}

fn parsed<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value.trim().parse::<T>().map_err(|_| ConfigError::Invalid { name, value }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Each test uses its own variable names; the process environment is shared.

    #[test]
    fn test_parsed_falls_back_to_default() {
        assert_eq!(parsed("BALLOTS_TEST_UNSET_VAR", 42u64).unwrap(), 42);
    }

    #[test]
    fn test_parsed_rejects_garbage() {
        unsafe {
            env::set_var("BALLOTS_TEST_GARBAGE_VAR", "ten");
        }
        let err = parsed("BALLOTS_TEST_GARBAGE_VAR", 10u64).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid { name: "BALLOTS_TEST_GARBAGE_VAR", .. }
        ));
    }

    #[test]
    fn test_required_treats_blank_as_missing() {
        unsafe {
            env::set_var("BALLOTS_TEST_BLANK_VAR", "  ");
        }
        assert!(matches!(
            required("BALLOTS_TEST_BLANK_VAR"),
            Err(ConfigError::Missing("BALLOTS_TEST_BLANK_VAR"))
        ));
    }

    #[test]
    fn test_credentials_debug_hides_secrets() {
        let creds = Credentials {
            consumer_key: "key".to_string(),
            consumer_secret: "shh".to_string(),
            access_token: "token".to_string(),
            access_secret: "secret".to_string(),
        };
        let rendered = format!("{creds:?}");
        assert!(rendered.contains("key"));
        assert!(!rendered.contains("shh"));
        assert!(!rendered.contains("secret\""));
    }
}
