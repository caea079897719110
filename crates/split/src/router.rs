use std::num::NonZeroUsize;
use std::ops::AddAssign;

use snb_model::Record;
use tracing::{trace, warn};

use crate::channel::{Channel, ChannelKind, ChannelSet};
use crate::classifier::{RoutingDecision, classify};
use crate::error::{Error, Result};
use crate::grouping::Batch;
use crate::settings::SplitSettings;

/// Round robin position over the partitions of one update stream.
///
/// After `k` advances the index is `k mod partitions`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionCursor {
    index: usize,
    partitions: NonZeroUsize,
}

impl PartitionCursor {
    pub fn new(partitions: NonZeroUsize) -> Self {
        PartitionCursor {
            index: 0,
            partitions,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn advance(&mut self) {
        self.index = (self.index + 1) % self.partitions.get();
    }
}

/// Records written per channel by one worker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportStats {
    pub snapshot: u64,
    pub inserts: u64,
    pub deletes: u64,
    /// Records no channel received.
    pub dropped: u64,
    /// Records deleted before their creation.
    pub inverted: u64,
}

impl AddAssign for ExportStats {
    fn add_assign(&mut self, other: Self) {
        self.snapshot += other.snapshot;
        self.inserts += other.inserts;
        self.deletes += other.deletes;
        self.dropped += other.dropped;
        self.inverted += other.inverted;
    }
}

/// Dispatches the records of one worker to its channels.
///
/// Snapshot and insert writes come before the delete write of the same
/// record. Every update stream write moves that stream to its next partition.
pub struct ChannelRouter<C> {
    settings: SplitSettings,
    channels: ChannelSet<C>,
    insert_cursor: PartitionCursor,
    delete_cursor: PartitionCursor,
    stats: ExportStats,
}

impl<C: Channel> ChannelRouter<C> {
    pub fn new(settings: SplitSettings, channels: ChannelSet<C>) -> Self {
        ChannelRouter {
            settings,
            channels,
            insert_cursor: PartitionCursor::new(settings.num_partitions),
            delete_cursor: PartitionCursor::new(settings.num_partitions),
            stats: ExportStats::default(),
        }
    }

    pub fn stats(&self) -> ExportStats {
        self.stats
    }

    pub fn cursor(&self, kind: ChannelKind) -> Option<PartitionCursor> {
        match kind {
            ChannelKind::Snapshot => None,
            ChannelKind::InsertStream => Some(self.insert_cursor),
            ChannelKind::DeleteStream => Some(self.delete_cursor),
        }
    }

    /// Routes the person first, then each of its knows edges on its own.
    pub fn process(&mut self, batch: &Batch) -> Result<()> {
        let person = &batch.person;
        self.route(Record::Person(person))?;
        for knows in &person.knows {
            self.route(Record::Knows(knows))?;
        }
        Ok(())
    }

    pub fn route(&mut self, record: Record<'_>) -> Result<RoutingDecision> {
        let lifespan = record.lifespan();
        // Raw mode ignores dates altogether.
        if self.settings.mode.splits_streams() && lifespan.is_inverted() {
            self.inverted(record)?;
        }

        let decision = classify(&lifespan, &self.settings.mode);
        if decision == RoutingDecision::None {
            trace!(record = %describe(record), "record not exported");
            self.stats.dropped += 1;
            return Ok(decision);
        }

        if decision.snapshot() {
            self.write(ChannelKind::Snapshot, record)?;
        }
        if decision.insert() {
            self.write(ChannelKind::InsertStream, record)?;
        }
        if decision.delete() {
            self.write(ChannelKind::DeleteStream, record)?;
        }
        Ok(decision)
    }

    fn inverted(&mut self, record: Record<'_>) -> Result<()> {
        let lifespan = record.lifespan();
        let deletion = lifespan.deletion.unwrap_or(lifespan.creation);
        if self.settings.strict_lifespans {
            return Err(Error::InvertedLifespan {
                record: describe(record),
                creation: lifespan.creation,
                deletion,
            });
        }
        warn!(
            record = %describe(record),
            creation = %lifespan.creation,
            %deletion,
            "record deleted before its creation"
        );
        self.stats.inverted += 1;
        Ok(())
    }

    fn write(&mut self, kind: ChannelKind, record: Record<'_>) -> Result<()> {
        let worker = self.channels.worker();
        let partition = match kind {
            ChannelKind::Snapshot => 0,
            ChannelKind::InsertStream => self.insert_cursor.index(),
            ChannelKind::DeleteStream => self.delete_cursor.index(),
        };

        let channel = self
            .channels
            .get_mut(kind)
            .ok_or_else(|| Error::Config(format!("worker {worker}: {kind} channel is not open")))?;
        channel
            .write(partition, record)
            .map_err(|source| Error::Write {
                worker,
                kind,
                source,
            })?;

        match kind {
            ChannelKind::Snapshot => self.stats.snapshot += 1,
            ChannelKind::InsertStream => {
                self.stats.inserts += 1;
                self.insert_cursor.advance();
            }
            ChannelKind::DeleteStream => {
                self.stats.deletes += 1;
                self.delete_cursor.advance();
            }
        }
        Ok(())
    }

    pub fn close(self) -> Result<ExportStats> {
        self.channels.close()?;
        Ok(self.stats)
    }

    pub fn discard(self) {
        self.channels.discard();
    }
}

fn describe(record: Record<'_>) -> String {
    match record {
        Record::Person(person) => format!("person {}", person.id),
        Record::Knows(knows) => format!("knows {}-{}", knows.person1, knows.person2),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grouping::BlockKey;
    use crate::memory::{Exported, MemoryChannels};
    use snb_model::{Knows, Person, PersonId, Thresholds, Timestamp};

    fn settings(partitions: usize) -> SplitSettings {
        let thresholds =
            Thresholds::new(Timestamp::from_days(100), Timestamp::from_days(200)).unwrap();
        SplitSettings::temporal(thresholds, NonZeroUsize::new(partitions).unwrap())
    }

    fn person(id: u64, creation: i64, deletion: Option<i64>, explicitly_deleted: bool) -> Person {
        Person {
            id: PersonId::new(id),
            first_name: "Grace".into(),
            last_name: "Hopper".into(),
            creation_date: Timestamp::from_days(creation),
            deletion_date: deletion.map(Timestamp::from_days),
            explicitly_deleted,
            knows: Vec::new(),
        }
    }

    fn knows(from: u64, to: u64, creation: i64, deletion: Option<i64>, explicitly_deleted: bool) -> Knows {
        Knows {
            person1: PersonId::new(from),
            person2: PersonId::new(to),
            creation_date: Timestamp::from_days(creation),
            deletion_date: deletion.map(Timestamp::from_days),
            explicitly_deleted,
            weight: 1.0,
        }
    }

    fn batch(person: Person) -> Batch {
        Batch {
            key: BlockKey {
                block: 0,
                person: person.id,
            },
            person,
        }
    }

    fn router(channels: &MemoryChannels, settings: SplitSettings) -> ChannelRouter<crate::memory::MemoryChannel> {
        let set = ChannelSet::open(channels, 0, &settings).unwrap();
        ChannelRouter::new(settings, set)
    }

    #[test]
    fn cursor_cycles_over_partitions() {
        let mut cursor = PartitionCursor::new(NonZeroUsize::new(3).unwrap());
        let mut seen = Vec::new();
        for k in 0..7 {
            assert_eq!(cursor.index(), k % 3);
            seen.push(cursor.index());
            cursor.advance();
        }
        assert_eq!(seen, vec![0, 1, 2, 0, 1, 2, 0]);
    }

    #[test]
    fn edge_is_routed_apart_from_its_owner() -> anyhow::Result<()> {
        let channels = MemoryChannels::new();
        let mut router = router(&channels, settings(2));

        let mut owner = person(1, 50, Some(300), false);
        owner.knows.push(knows(1, 2, 120, Some(180), true));
        router.process(&batch(owner))?;
        let stats = router.close()?;

        assert_eq!(
            stats,
            ExportStats {
                snapshot: 1,
                inserts: 1,
                deletes: 1,
                ..Default::default()
            }
        );
        let snapshot = channels.written_to(ChannelKind::Snapshot);
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].record, Exported::Person(PersonId::new(1)));

        let knows = Exported::Knows(PersonId::new(1), PersonId::new(2));
        assert_eq!(channels.written_to(ChannelKind::InsertStream)[0].record, knows);
        assert_eq!(channels.written_to(ChannelKind::DeleteStream)[0].record, knows);
        Ok(())
    }

    #[test]
    fn bulk_loaded_explicit_deletion_goes_to_snapshot_and_delete_stream() -> anyhow::Result<()> {
        let channels = MemoryChannels::new();
        let mut router = router(&channels, settings(1));
        router.process(&batch(person(1, 50, Some(150), true)))?;
        router.close()?;

        let kinds: Vec<_> = channels.written().iter().map(|written| written.kind).collect();
        assert_eq!(kinds, vec![ChannelKind::Snapshot, ChannelKind::DeleteStream]);
        Ok(())
    }

    #[test]
    fn implicit_deletion_produces_no_delete_event() -> anyhow::Result<()> {
        let channels = MemoryChannels::new();
        let mut router = router(&channels, settings(1));
        assert_eq!(
            router.route(Record::Person(&person(1, 50, Some(150), false)))?,
            RoutingDecision::SnapshotOnly
        );
        assert_eq!(
            router.route(Record::Person(&person(2, 120, Some(180), false)))?,
            RoutingDecision::InsertOnly
        );
        let stats = router.close()?;
        assert_eq!(stats.deletes, 0);
        assert!(channels.written_to(ChannelKind::DeleteStream).is_empty());
        Ok(())
    }

    #[test]
    fn update_streams_rotate_independently() -> anyhow::Result<()> {
        let channels = MemoryChannels::new();
        let mut router = router(&channels, settings(3));

        // Four inserts, two of them also deleted.
        for (id, explicitly_deleted) in [(1, true), (2, false), (3, true), (4, false)] {
            router.process(&batch(person(id, 120, Some(180), explicitly_deleted)))?;
        }
        assert_eq!(router.cursor(ChannelKind::InsertStream).map(|c| c.index()), Some(1));
        assert_eq!(router.cursor(ChannelKind::DeleteStream).map(|c| c.index()), Some(2));
        assert_eq!(router.cursor(ChannelKind::Snapshot), None);
        router.close()?;

        let partitions = |kind| {
            channels
                .written_to(kind)
                .iter()
                .map(|written| written.partition)
                .collect::<Vec<_>>()
        };
        assert_eq!(partitions(ChannelKind::InsertStream), vec![0, 1, 2, 0]);
        assert_eq!(partitions(ChannelKind::DeleteStream), vec![0, 1]);
        Ok(())
    }

    #[test]
    fn snapshot_writes_do_not_rotate() -> anyhow::Result<()> {
        let channels = MemoryChannels::new();
        let mut router = router(&channels, settings(4));
        for id in 0..5 {
            router.process(&batch(person(id, 50, None, false)))?;
        }
        assert_eq!(router.cursor(ChannelKind::InsertStream).map(|c| c.index()), Some(0));
        router.close()?;
        assert!(
            channels
                .written_to(ChannelKind::Snapshot)
                .iter()
                .all(|written| written.partition == 0)
        );
        Ok(())
    }

    #[test]
    fn raw_mode_snapshots_everything() -> anyhow::Result<()> {
        let channels = MemoryChannels::new();
        let mut router = router(&channels, SplitSettings::raw());

        let mut owner = person(1, 150, Some(50), true);
        owner.knows.push(knows(1, 2, 120, Some(180), true));
        owner.knows.push(knows(1, 3, 10, None, false));
        router.process(&batch(owner))?;
        let stats = router.close()?;

        assert_eq!(stats.snapshot, 3);
        assert_eq!(stats.inserts + stats.deletes + stats.dropped + stats.inverted, 0);
        assert_eq!(
            channels.opened(),
            vec![(0, ChannelKind::Snapshot)],
            "update streams are never opened in raw mode"
        );
        Ok(())
    }

    #[test]
    fn records_deleted_before_bulk_load_are_dropped() -> anyhow::Result<()> {
        let channels = MemoryChannels::new();
        let mut router = router(&channels, settings(1));
        router.process(&batch(person(1, 10, Some(20), true)))?;
        let stats = router.close()?;
        assert_eq!(stats.dropped, 1);
        assert_eq!(stats.inverted, 0);
        assert!(channels.written().is_empty());
        Ok(())
    }

    #[test]
    fn inverted_lifespan_is_counted_or_rejected() -> anyhow::Result<()> {
        let inverted = person(1, 150, Some(50), true);

        let channels = MemoryChannels::new();
        let mut lenient = router(&channels, settings(1));
        assert_eq!(lenient.route(Record::Person(&inverted))?, RoutingDecision::None);
        let stats = lenient.close()?;
        assert_eq!((stats.dropped, stats.inverted), (1, 1));

        let channels = MemoryChannels::new();
        let mut strict = router(&channels, settings(1).with_strict_lifespans(true));
        let err = strict.route(Record::Person(&inverted)).unwrap_err();
        assert!(matches!(err, Error::InvertedLifespan { .. }));
        assert!(err.to_string().starts_with("person 1"));
        Ok(())
    }

    #[test]
    fn raw_mode_ignores_strict_lifespans() -> anyhow::Result<()> {
        let channels = MemoryChannels::new();
        let mut router = router(&channels, SplitSettings::raw().with_strict_lifespans(true));
        assert_eq!(
            router.route(Record::Person(&person(1, 150, Some(50), true)))?,
            RoutingDecision::SnapshotOnly
        );
        let stats = router.close()?;

        assert_eq!(stats.snapshot, 1);
        assert_eq!(stats.inverted, 0);
        assert_eq!(channels.written_to(ChannelKind::Snapshot).len(), 1);
        Ok(())
    }

    #[test]
    fn inverted_lifespan_inside_window_is_still_routed() -> anyhow::Result<()> {
        let channels = MemoryChannels::new();
        let mut router = router(&channels, settings(1));
        assert_eq!(
            router.route(Record::Person(&person(1, 180, Some(150), true)))?,
            RoutingDecision::InsertPlusDelete
        );
        let stats = router.close()?;

        assert_eq!((stats.inserts, stats.deletes), (1, 1));
        assert_eq!((stats.inverted, stats.dropped), (1, 0));
        Ok(())
    }

    #[test]
    fn write_failure_names_the_channel() {
        let channels = MemoryChannels::failing_write(ChannelKind::DeleteStream);
        let mut router = router(&channels, settings(1));
        let err = router
            .process(&batch(person(1, 50, Some(150), true)))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Write {
                worker: 0,
                kind: ChannelKind::DeleteStream,
                ..
            }
        ));
    }
}
