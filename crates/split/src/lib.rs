//! Splits persons and their knows edges into a bulk load snapshot and
//! insert/delete update streams.
//!
//! [`grouping`] hands each worker whole persons, [`classifier`] decides the
//! channels of every person and edge, and [`router`] writes them while
//! rotating update stream partitions. [`stage`] runs the workers in parallel.

pub mod channel;
pub mod classifier;
pub mod error;
pub mod grouping;
pub mod memory;
pub mod router;
pub mod settings;
pub mod stage;
pub mod worker;

pub use channel::{Channel, ChannelFactory, ChannelKind, ChannelSet};
pub use classifier::{RoutingDecision, SplitMode, classify};
pub use error::{Error, Result};
pub use grouping::{Batch, BlockKey, BlockPartitioner, group_batches};
pub use router::{ChannelRouter, ExportStats, PartitionCursor};
pub use settings::SplitSettings;
pub use stage::{StageReport, run_stage};
pub use worker::Worker;
