//! Vote ingestion and aggregation.
//!
//! `ballots-ingest` matches a live text stream against poll options and
//! publishes one vote per match to a durable queue; `ballots-counter` consumes
//! those votes and periodically adds them to the stored poll results.

#[macro_use]
extern crate tracing;

pub mod aggregator;
pub mod config;
pub mod db;
pub mod error;
pub mod publisher;
pub mod queue;
pub mod shutdown;
pub mod signal;
pub mod startup;
pub mod stream;
pub mod vote;
pub mod watchdog;
