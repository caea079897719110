use std::fmt;

use crate::dates::{Lifespan, Timestamp};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct PersonId(u64);

impl PersonId {
    pub const fn new(id: u64) -> Self {
        PersonId(id)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for PersonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A `knows` edge, owned by `person1`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Knows {
    pub person1: PersonId,
    pub person2: PersonId,
    pub creation_date: Timestamp,
    #[serde(default)]
    pub deletion_date: Option<Timestamp>,
    #[serde(default)]
    pub explicitly_deleted: bool,
    #[serde(default)]
    pub weight: f32,
}

impl Knows {
    pub fn lifespan(&self) -> Lifespan {
        Lifespan {
            creation: self.creation_date,
            deletion: self.deletion_date,
            explicitly_deleted: self.explicitly_deleted,
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Person {
    pub id: PersonId,
    pub first_name: String,
    pub last_name: String,
    pub creation_date: Timestamp,
    #[serde(default)]
    pub deletion_date: Option<Timestamp>,
    #[serde(default)]
    pub explicitly_deleted: bool,
    #[serde(default)]
    pub knows: Vec<Knows>,
}

impl Person {
    pub fn lifespan(&self) -> Lifespan {
        Lifespan {
            creation: self.creation_date,
            deletion: self.deletion_date,
            explicitly_deleted: self.explicitly_deleted,
        }
    }
}

/// A single row handed to an output channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Record<'a> {
    Person(&'a Person),
    Knows(&'a Knows),
}

impl Record<'_> {
    pub fn lifespan(&self) -> Lifespan {
        match self {
            Record::Person(person) => person.lifespan(),
            Record::Knows(knows) => knows.lifespan(),
        }
    }
}
