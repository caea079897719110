//! Channels that keep exported records in memory, with optional injected
//! failures. Records become visible in [`MemoryChannels::written`] once the
//! channel that received them is closed.

use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use snb_model::{PersonId, Record};

use crate::channel::{Channel, ChannelFactory, ChannelKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Exported {
    Person(PersonId),
    Knows(PersonId, PersonId),
}

impl From<Record<'_>> for Exported {
    fn from(record: Record<'_>) -> Self {
        match record {
            Record::Person(person) => Exported::Person(person.id),
            Record::Knows(knows) => Exported::Knows(knows.person1, knows.person2),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Written {
    pub worker: usize,
    pub kind: ChannelKind,
    pub partition: usize,
    pub record: Exported,
}

#[derive(Debug, Default)]
struct Shared {
    written: Vec<Written>,
    opened: Vec<(usize, ChannelKind)>,
    discarded: Vec<(usize, ChannelKind)>,
    fail_open: Option<ChannelKind>,
    fail_write: Option<ChannelKind>,
    fail_close: Option<ChannelKind>,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryChannels {
    shared: Arc<Mutex<Shared>>,
}

impl MemoryChannels {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_open(kind: ChannelKind) -> Self {
        let channels = Self::new();
        channels.lock().fail_open = Some(kind);
        channels
    }

    pub fn failing_write(kind: ChannelKind) -> Self {
        let channels = Self::new();
        channels.lock().fail_write = Some(kind);
        channels
    }

    pub fn failing_close(kind: ChannelKind) -> Self {
        let channels = Self::new();
        channels.lock().fail_close = Some(kind);
        channels
    }

    fn lock(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn written(&self) -> Vec<Written> {
        self.lock().written.clone()
    }

    pub fn written_to(&self, kind: ChannelKind) -> Vec<Written> {
        self.lock()
            .written
            .iter()
            .filter(|written| written.kind == kind)
            .copied()
            .collect()
    }

    pub fn opened(&self) -> Vec<(usize, ChannelKind)> {
        self.lock().opened.clone()
    }

    pub fn discarded(&self) -> Vec<(usize, ChannelKind)> {
        self.lock().discarded.clone()
    }
}

impl ChannelFactory for MemoryChannels {
    type Channel = MemoryChannel;

    fn open(&self, worker: usize, kind: ChannelKind, partitions: usize) -> io::Result<MemoryChannel> {
        let mut shared = self.lock();
        if shared.fail_open == Some(kind) {
            return Err(io::Error::other(format!("cannot open {kind}")));
        }
        shared.opened.push((worker, kind));
        Ok(MemoryChannel {
            worker,
            kind,
            partitions,
            buffer: Vec::new(),
            shared: Arc::clone(&self.shared),
        })
    }

    fn discard_all(&self) -> io::Result<()> {
        self.lock().written.clear();
        Ok(())
    }
}

pub struct MemoryChannel {
    worker: usize,
    kind: ChannelKind,
    partitions: usize,
    buffer: Vec<Written>,
    shared: Arc<Mutex<Shared>>,
}

impl MemoryChannel {
    fn lock(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Channel for MemoryChannel {
    fn write(&mut self, partition: usize, record: Record<'_>) -> io::Result<()> {
        if self.lock().fail_write == Some(self.kind) {
            return Err(io::Error::other(format!("cannot write to {}", self.kind)));
        }
        if partition >= self.partitions {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("partition {partition} out of {}", self.partitions),
            ));
        }
        self.buffer.push(Written {
            worker: self.worker,
            kind: self.kind,
            partition,
            record: record.into(),
        });
        Ok(())
    }

    fn close(self) -> io::Result<()> {
        let mut shared = self.lock();
        if shared.fail_close == Some(self.kind) {
            return Err(io::Error::other(format!("cannot close {}", self.kind)));
        }
        shared.written.extend_from_slice(&self.buffer);
        Ok(())
    }

    fn discard(self) {
        self.lock().discarded.push((self.worker, self.kind));
    }
}
