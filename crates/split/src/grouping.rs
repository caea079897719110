//! Delivery of persons to workers.
//!
//! Persons are ranked by id and cut into blocks of `block_size`. Blocks are
//! dealt to workers round robin, so the block key `(block, person)` spreads
//! the load while every person, together with all knows edges it owns,
//! lands in exactly one batch on exactly one worker.

use std::collections::HashSet;

use snb_model::{Person, PersonId};
use tracing::debug;

use crate::error::{Error, Result};

/// Sort key of a person inside a worker's stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockKey {
    pub block: u64,
    pub person: PersonId,
}

/// One person and every knows edge it owns.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub key: BlockKey,
    pub person: Person,
}

#[derive(Debug, Clone, Copy)]
pub struct BlockPartitioner {
    block_size: u64,
    workers: usize,
}

impl BlockPartitioner {
    pub fn new(block_size: usize, workers: usize) -> Result<Self> {
        if block_size == 0 {
            return Err(Error::Config("block size must be at least 1".into()));
        }
        if workers == 0 {
            return Err(Error::Config("at least one worker is required".into()));
        }
        Ok(BlockPartitioner {
            block_size: block_size as u64,
            workers,
        })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn key(&self, rank: u64, person: PersonId) -> BlockKey {
        BlockKey {
            block: rank / self.block_size,
            person,
        }
    }

    pub fn worker(&self, key: &BlockKey) -> usize {
        (key.block % self.workers as u64) as usize
    }

    /// Returns the batches of every worker, each stream in block key order.
    pub fn distribute(&self, persons: impl IntoIterator<Item = Person>) -> Result<Vec<Vec<Batch>>> {
        let mut persons: Vec<Person> = persons.into_iter().collect();
        persons.sort_by_key(|person| person.id);

        let mut streams: Vec<Vec<(BlockKey, Person)>> = vec![Vec::new(); self.workers];
        let mut previous = None;
        for (rank, person) in persons.into_iter().enumerate() {
            if previous == Some(person.id) {
                return Err(Error::SplitBatch(person.id));
            }
            previous = Some(person.id);

            let key = self.key(rank as u64, person.id);
            streams[self.worker(&key)].push((key, person));
        }

        debug!(
            workers = self.workers,
            block_size = self.block_size,
            sizes = ?streams.iter().map(Vec::len).collect::<Vec<_>>(),
            "distributed persons"
        );

        streams.into_iter().map(group_batches).collect()
    }
}

/// Groups one worker's keyed stream into a batch per person.
///
/// A person seen twice or a knows edge owned by someone else breaks the
/// delivery contract and fails the stage.
pub fn group_batches(mut records: Vec<(BlockKey, Person)>) -> Result<Vec<Batch>> {
    records.sort_by_key(|(key, _)| *key);

    let mut seen = HashSet::with_capacity(records.len());
    let mut batches = Vec::with_capacity(records.len());
    for (key, person) in records {
        if !seen.insert(person.id) {
            return Err(Error::SplitBatch(person.id));
        }
        if let Some(knows) = person.knows.iter().find(|knows| knows.person1 != person.id) {
            return Err(Error::ForeignEdge {
                owner: person.id,
                person1: knows.person1,
                person2: knows.person2,
            });
        }
        batches.push(Batch { key, person });
    }
    Ok(batches)
}
