//! Decides which output channels receive a person or a knows edge.
//!
//! In [`SplitMode::TemporalSplit`] a record is classified by where its
//! creation `c` and deletion `d` fall relative to the bulk load threshold `B`
//! and the simulation end `E` (`d` is `+∞` for records never deleted):
//!
//! | condition              | decision                                 |
//! |------------------------|------------------------------------------|
//! | `c < B`, `B <= d <= E` | snapshot, plus a delete event if explicit |
//! | `c < B`, `d > E`       | snapshot                                 |
//! | `c >= B`, `B <= d <= E`| insert event, plus a delete event if explicit |
//! | `c >= B`, `d > E`      | insert event                             |
//! | `d < B`                | nothing                                  |

use snb_model::{Lifespan, Thresholds, Timestamp};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitMode {
    /// Everything goes to the snapshot, dates are ignored.
    Raw,
    TemporalSplit(Thresholds),
}

impl SplitMode {
    /// Whether the insert and delete streams are in use.
    pub fn splits_streams(&self) -> bool {
        matches!(self, SplitMode::TemporalSplit(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoutingDecision {
    SnapshotOnly,
    SnapshotPlusDelete,
    InsertOnly,
    InsertPlusDelete,
    None,
}

impl RoutingDecision {
    pub fn snapshot(self) -> bool {
        matches!(self, Self::SnapshotOnly | Self::SnapshotPlusDelete)
    }

    pub fn insert(self) -> bool {
        matches!(self, Self::InsertOnly | Self::InsertPlusDelete)
    }

    pub fn delete(self) -> bool {
        matches!(self, Self::SnapshotPlusDelete | Self::InsertPlusDelete)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Deletion {
    BeforeBulkLoad,
    Simulated,
    AfterSimulation,
}

fn deletion_window(deletion: Option<Timestamp>, thresholds: &Thresholds) -> Deletion {
    match deletion {
        Some(d) if d < thresholds.bulk_load_threshold() => Deletion::BeforeBulkLoad,
        Some(d) if d <= thresholds.simulation_end() => Deletion::Simulated,
        _ => Deletion::AfterSimulation,
    }
}

pub fn classify(lifespan: &Lifespan, mode: &SplitMode) -> RoutingDecision {
    let thresholds = match mode {
        SplitMode::Raw => return RoutingDecision::SnapshotOnly,
        SplitMode::TemporalSplit(thresholds) => thresholds,
    };

    let bulk_loaded = lifespan.creation < thresholds.bulk_load_threshold();
    let deletion = deletion_window(lifespan.deletion, thresholds);

    match (bulk_loaded, deletion, lifespan.explicitly_deleted) {
        (_, Deletion::BeforeBulkLoad, _) => RoutingDecision::None,
        (true, Deletion::Simulated, true) => RoutingDecision::SnapshotPlusDelete,
        (true, Deletion::Simulated, false) | (true, Deletion::AfterSimulation, _) => {
            RoutingDecision::SnapshotOnly
        }
        (false, Deletion::Simulated, true) => RoutingDecision::InsertPlusDelete,
        (false, Deletion::Simulated, false) | (false, Deletion::AfterSimulation, _) => {
            RoutingDecision::InsertOnly
        }
    }
}
