//! Filtered read of the external text stream, turned into vote events.

pub mod auth;
pub mod connection;
pub mod decode;
pub mod matcher;

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use reqwest::header::AUTHORIZATION;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::config::{Credentials, IngestConfig};
use crate::db::TermSource;
use crate::error::StreamError;
use crate::shutdown::TaskHandle;
use crate::vote::VoteEvent;

pub use auth::OAuthSigner;
pub use connection::ConnectionHandle;
pub use decode::{StreamItem, decode_items};
pub use matcher::TermMatcher;

#[derive(Debug, Clone)]
pub struct StreamSettings {
    pub url: String,
    pub backoff: Duration,
    pub dial_timeout: Duration,
}

impl From<&IngestConfig> for StreamSettings {
    fn from(config: &IngestConfig) -> Self {
        Self {
            url: config.stream_url.clone(),
            backoff: config.backoff,
            dial_timeout: config.dial_timeout,
        }
    }
}

/// Connects to the stream, matches items against tracked terms and emits one
/// [`VoteEvent`] per match. Owns its HTTP client, signer and connection
/// handle; nothing is shared through globals.
pub struct StreamAdapter {
    terms: Arc<dyn TermSource>,
    client: reqwest::Client,
    signer: OAuthSigner,
    settings: StreamSettings,
    connection: ConnectionHandle,
}

impl StreamAdapter {
    pub fn new(
        terms: Arc<dyn TermSource>,
        credentials: Credentials,
        settings: StreamSettings,
    ) -> Result<Self, StreamError> {
        // No overall timeout: the response body is read for as long as the
        // server keeps it open.
        let client = reqwest::Client::builder()
            .connect_timeout(settings.dial_timeout)
            .build()?;

        Ok(Self {
            terms,
            client,
            signer: OAuthSigner::new(credentials),
            settings,
            connection: ConnectionHandle::new(),
        })
    }

    /// Handle for force-closing the current connection from other tasks.
    pub fn connection(&self) -> ConnectionHandle {
        self.connection.clone()
    }

    pub fn spawn(self, stop: CancellationToken, votes: mpsc::Sender<VoteEvent>) -> TaskHandle {
        TaskHandle::spawn("stream adapter", stop.clone(), self.run(stop, votes))
    }

    /// Connect, stream and match until `stop` is raised, reconnecting after
    /// a fixed backoff whenever a connection ends.
    pub async fn run(self, stop: CancellationToken, votes: mpsc::Sender<VoteEvent>) {
        loop {
            if stop.is_cancelled() {
                info!("stopping stream adapter");
                break;
            }

            info!(url = %self.settings.url, "querying stream");
            let mut sent = 0u64;
            let Err(err) = self.read_cycle(&stop, &votes, &mut sent).await;
            match &err {
                StreamError::Closed => info!(votes = sent, "stream connection closed"),
                StreamError::SinkClosed => {
                    error!(votes = sent, "vote channel closed under the adapter; stopping");
                    break;
                }
                e => warn!(votes = sent, error = %e, "stream cycle ended"),
            }

            if stop.is_cancelled() {
                info!("stopping stream adapter");
                break;
            }
            debug!(backoff = ?self.settings.backoff, "waiting before reconnect");
            tokio::select! {
                _ = stop.cancelled() => {}
                _ = tokio::time::sleep(self.settings.backoff) => {}
            }
        }
        info!("stream adapter stopped");
    }

    /// One connect → stream → match cycle. Only ever ends with an error.
    async fn read_cycle(
        &self,
        stop: &CancellationToken,
        votes: &mpsc::Sender<VoteEvent>,
        sent: &mut u64,
    ) -> Result<Infallible, StreamError> {
        let options = self.terms.list_current_options().await?;
        let matcher = TermMatcher::new(options);
        if matcher.is_empty() {
            return Err(StreamError::NoTerms);
        }
        debug!(terms = matcher.len(), "loaded tracked terms");

        let guard = self.connection.open(stop);
        let result = self.stream_votes(&matcher, &guard, votes, sent).await;
        guard.cancel();
        result
    }

    async fn stream_votes(
        &self,
        matcher: &TermMatcher,
        guard: &CancellationToken,
        votes: &mpsc::Sender<VoteEvent>,
        sent: &mut u64,
    ) -> Result<Infallible, StreamError> {
        let track = matcher.track_param();
        let params = [("track", track.as_str())];
        let authorization = self
            .signer
            .authorization_header("POST", &self.settings.url, &params);

        let request = self
            .client
            .post(&self.settings.url)
            .header(AUTHORIZATION, authorization)
            .form(&params)
            .send();

        let response = tokio::select! {
            _ = guard.cancelled() => return Err(StreamError::Closed),
            response = request => response?,
        };

        let status = response.status();
        if !status.is_success() {
            let body = tokio::select! {
                _ = guard.cancelled() => return Err(StreamError::Closed),
                body = response.text() => body.unwrap_or_else(|_| "<unreadable>".to_string()),
            };
            return Err(StreamError::Status { status, body });
        }

        let items = decode_items(response.bytes_stream());
        futures::pin_mut!(items);

        loop {
            let item = tokio::select! {
                biased;
                _ = guard.cancelled() => return Err(StreamError::Closed),
                item = items.next() => item,
            };
            let item = item.ok_or(StreamError::Eof)??;

            for option in matcher.matches(&item.text) {
                debug!(option, "vote");
                // Blocks while the publisher is behind.
                votes
                    .send(VoteEvent::new(option))
                    .await
                    .map_err(|_| StreamError::SinkClosed)?;
                *sent += 1;
            }
        }
    }
}
