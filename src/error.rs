use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Error, Debug)]
pub enum StreamError {
    #[error("failed to load tracked terms: {0}")]
    Terms(#[from] sqlx::Error),
    #[error("no tracked terms to filter on")]
    NoTerms,
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("stream returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("failed to decode stream item: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("stream ended")]
    Eof,
    #[error("connection closed")]
    Closed,
    #[error("vote channel closed")]
    SinkClosed,
}

#[derive(Error, Debug)]
pub enum QueueError {
    #[error("AMQP error: {0}")]
    Amqp(#[from] lapin::Error),
    #[error("queue connection closed")]
    Closed,
}
