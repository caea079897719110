//! `|`-delimited CSV rows for snapshot files and update streams.
//!
//! ```text
//! person: id|firstName|lastName|creationDate|deletionDate|explicitlyDeleted
//! knows:  person1|person2|creationDate|deletionDate|explicitlyDeleted|weight
//! event:  eventDate|eventType|<person or knows row>
//! ```
//!
//! `deletionDate` is left empty for records that are never deleted.

use std::io::Write;

use crate::dates::Timestamp;
use crate::person::{Knows, Person, Record};

pub const DELIMITER: u8 = b'|';

pub fn writer<W: Write>(inner: W) -> csv::Writer<W> {
    csv::WriterBuilder::new()
        .delimiter(DELIMITER)
        .has_headers(false)
        .from_writer(inner)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    InsertPerson,
    InsertKnows,
    DeletePerson,
    DeleteKnows,
}

impl EventType {
    pub fn insert(record: &Record<'_>) -> Self {
        match record {
            Record::Person(_) => EventType::InsertPerson,
            Record::Knows(_) => EventType::InsertKnows,
        }
    }

    pub fn delete(record: &Record<'_>) -> Self {
        match record {
            Record::Person(_) => EventType::DeletePerson,
            Record::Knows(_) => EventType::DeleteKnows,
        }
    }

    pub fn is_delete(self) -> bool {
        matches!(self, EventType::DeletePerson | EventType::DeleteKnows)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EventType::InsertPerson => "INSERT_PERSON",
            EventType::InsertKnows => "INSERT_KNOWS",
            EventType::DeletePerson => "DELETE_PERSON",
            EventType::DeleteKnows => "DELETE_KNOWS",
        }
    }
}

fn optional_date(date: Option<Timestamp>) -> String {
    date.map(|date| date.to_string()).unwrap_or_default()
}

impl Person {
    fn write_fields<W: Write>(&self, writer: &mut csv::Writer<W>) -> csv::Result<()> {
        writer.write_field(self.id.to_string())?;
        writer.write_field(&self.first_name)?;
        writer.write_field(&self.last_name)?;
        writer.write_field(self.creation_date.to_string())?;
        writer.write_field(optional_date(self.deletion_date))?;
        writer.write_field(self.explicitly_deleted.to_string())?;
        Ok(())
    }
}

impl Knows {
    fn write_fields<W: Write>(&self, writer: &mut csv::Writer<W>) -> csv::Result<()> {
        writer.write_field(self.person1.to_string())?;
        writer.write_field(self.person2.to_string())?;
        writer.write_field(self.creation_date.to_string())?;
        writer.write_field(optional_date(self.deletion_date))?;
        writer.write_field(self.explicitly_deleted.to_string())?;
        writer.write_field(self.weight.to_string())?;
        Ok(())
    }
}

impl Record<'_> {
    fn write_fields<W: Write>(&self, writer: &mut csv::Writer<W>) -> csv::Result<()> {
        match self {
            Record::Person(person) => person.write_fields(writer),
            Record::Knows(knows) => knows.write_fields(writer),
        }
    }

    /// Snapshot row.
    pub fn serialize_csv<W: Write>(&self, writer: &mut csv::Writer<W>) -> csv::Result<()> {
        self.write_fields(writer)?;
        writer.write_record(None::<&[u8]>)?;
        Ok(())
    }

    /// Update stream row. Inserts are dated by creation, deletes by deletion.
    pub fn serialize_event_csv<W: Write>(
        &self,
        event: EventType,
        writer: &mut csv::Writer<W>,
    ) -> csv::Result<()> {
        let lifespan = self.lifespan();
        let event_date = if event.is_delete() {
            optional_date(lifespan.deletion)
        } else {
            lifespan.creation.to_string()
        };
        writer.write_field(event_date)?;
        writer.write_field(event.as_str())?;
        self.write_fields(writer)?;
        writer.write_record(None::<&[u8]>)?;
        Ok(())
    }
}
