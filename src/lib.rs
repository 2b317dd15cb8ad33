//! gmharvest — GroupMe group harvester.
//!
//! Fetches a bounded slice of a group's message history via backward
//! cursor pagination, flags aggressive messages through a pluggable
//! classification strategy, and archives unique image attachments from a
//! time window into per-group storage, deduplicated by a crash-safe
//! ledger file.

pub mod classify;
pub mod config;
pub mod error;
pub mod extract;
pub mod groupme;
pub mod ledger;
pub mod logging;

pub use config::Config;
pub use error::PipelineError;
