use std::fmt;
use std::io;

use scopeguard::ScopeGuard;
use snb_model::Record;

use crate::error::{Error, Result};
use crate::settings::SplitSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ChannelKind {
    Snapshot,
    InsertStream,
    DeleteStream,
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ChannelKind::Snapshot => "snapshot",
            ChannelKind::InsertStream => "insert stream",
            ChannelKind::DeleteStream => "delete stream",
        })
    }
}

/// An output owned by exactly one worker.
///
/// Snapshot channels are opened with a single partition; update streams with
/// the configured number of partitions. The router picks the partition.
pub trait Channel: Send {
    fn write(&mut self, partition: usize, record: Record<'_>) -> io::Result<()>;

    /// Flushes and finalizes everything written so far.
    fn close(self) -> io::Result<()>;

    /// Releases the channel and removes whatever it wrote.
    fn discard(self);
}

/// Opens the channels of every worker in a stage.
pub trait ChannelFactory: Sync {
    type Channel: Channel;

    fn open(&self, worker: usize, kind: ChannelKind, partitions: usize)
    -> io::Result<Self::Channel>;

    /// Removes the artifacts of every worker after a failed stage.
    fn discard_all(&self) -> io::Result<()> {
        Ok(())
    }
}

pub struct UpdateStreams<C> {
    pub insert: C,
    pub delete: C,
}

/// The channels of one worker. Insert and delete streams exist only when the
/// mode splits streams.
pub struct ChannelSet<C> {
    worker: usize,
    snapshot: C,
    streams: Option<UpdateStreams<C>>,
}

impl<C: Channel> ChannelSet<C> {
    /// Opens every channel the mode needs. Channels already opened are
    /// discarded when a later one fails.
    pub fn open<F>(factory: &F, worker: usize, settings: &SplitSettings) -> Result<Self>
    where
        F: ChannelFactory<Channel = C>,
    {
        let open = |kind, partitions| {
            factory
                .open(worker, kind, partitions)
                .map_err(|source| Error::Open {
                    worker,
                    kind,
                    source,
                })
        };

        let snapshot = scopeguard::guard(open(ChannelKind::Snapshot, 1)?, C::discard);
        let streams = if settings.mode.splits_streams() {
            let partitions = settings.num_partitions.get();
            let insert = scopeguard::guard(open(ChannelKind::InsertStream, partitions)?, C::discard);
            let delete = open(ChannelKind::DeleteStream, partitions)?;
            Some(UpdateStreams {
                insert: ScopeGuard::into_inner(insert),
                delete,
            })
        } else {
            None
        };

        Ok(ChannelSet {
            worker,
            snapshot: ScopeGuard::into_inner(snapshot),
            streams,
        })
    }

    pub fn worker(&self) -> usize {
        self.worker
    }

    pub fn get_mut(&mut self, kind: ChannelKind) -> Option<&mut C> {
        match kind {
            ChannelKind::Snapshot => Some(&mut self.snapshot),
            ChannelKind::InsertStream => self.streams.as_mut().map(|streams| &mut streams.insert),
            ChannelKind::DeleteStream => self.streams.as_mut().map(|streams| &mut streams.delete),
        }
    }

    /// Closes every channel, even after a failure. The first failure wins.
    pub fn close(self) -> Result<()> {
        let worker = self.worker;
        let close = |kind, channel: C| {
            channel.close().map_err(|source| Error::Close {
                worker,
                kind,
                source,
            })
        };

        let mut result = close(ChannelKind::Snapshot, self.snapshot);
        if let Some(streams) = self.streams {
            let insert = close(ChannelKind::InsertStream, streams.insert);
            let delete = close(ChannelKind::DeleteStream, streams.delete);
            result = result.and(insert).and(delete);
        }
        result
    }

    pub fn discard(self) {
        self.snapshot.discard();
        if let Some(streams) = self.streams {
            streams.insert.discard();
            streams.delete.discard();
        }
    }
}
