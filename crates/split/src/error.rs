//! Error types for splitting persons into output channels.

use snb_model::{PersonId, Timestamp};
use thiserror::Error;

use crate::channel::ChannelKind;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that abort a worker, and with it the whole stage.
#[derive(Error, Debug)]
pub enum Error {
    /// A channel could not be opened at worker start.
    #[error("worker {worker}: failed to open {kind} channel: {source}")]
    Open {
        worker: usize,
        kind: ChannelKind,
        source: std::io::Error,
    },

    /// A record could not be written.
    #[error("worker {worker}: failed to write to {kind} channel: {source}")]
    Write {
        worker: usize,
        kind: ChannelKind,
        source: std::io::Error,
    },

    /// Flushing or finalizing a channel failed; its output may be incomplete.
    #[error("worker {worker}: failed to close {kind} channel: {source}")]
    Close {
        worker: usize,
        kind: ChannelKind,
        source: std::io::Error,
    },

    /// The same person reached more than one batch.
    #[error("person {0} was delivered in more than one batch")]
    SplitBatch(PersonId),

    /// A batch carried a knows edge owned by another person.
    #[error("knows edge {person1}-{person2} was delivered with person {owner}")]
    ForeignEdge {
        owner: PersonId,
        person1: PersonId,
        person2: PersonId,
    },

    /// A record deleted before it was created, with strict lifespans on.
    #[error("{record}: deleted at {deletion} before its creation at {creation}")]
    InvertedLifespan {
        record: String,
        creation: Timestamp,
        deletion: Timestamp,
    },

    /// A worker thread panicked.
    #[error("worker {0} panicked")]
    WorkerPanicked(usize),

    /// Invalid stage setup.
    #[error("configuration error: {0}")]
    Config(String),
}
