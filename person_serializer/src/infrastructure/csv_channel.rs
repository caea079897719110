use std::fs::{self, File};
use std::io;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};

use snb_model::Record;
use snb_model::codec::{self, EventType};
use snb_split::{Channel, ChannelKind};

use crate::application::ports::ChannelFactory;

const SNAPSHOT_DIR: &str = "dynamic";
const INSERTS_DIR: &str = "inserts";
const DELETES_DIR: &str = "deletes";

// --- Public Struct ---

/// An adapter that implements the `ChannelFactory` port with `|`-delimited
/// CSV files under one output directory:
///
/// ```text
/// dynamic/person_{worker}_0.csv
/// dynamic/person_knows_person_{worker}_0.csv
/// inserts/insert_stream_{worker}_{partition}.csv
/// deletes/delete_stream_{worker}_{partition}.csv
/// ```
///
/// The factory remembers every file and directory it creates, so that
/// [`ChannelFactory::discard_all`] removes this run's output and nothing else.
pub struct CsvChannelFactory {
    output_dir: PathBuf,
    created: Mutex<Created>,
}

#[derive(Default)]
struct Created {
    dirs: Vec<PathBuf>,
    files: Vec<PathBuf>,
}

impl CsvChannelFactory {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            created: Mutex::default(),
        }
    }

    fn created(&self) -> MutexGuard<'_, Created> {
        self.created.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn create_dir(&self, kind: ChannelKind) -> io::Result<PathBuf> {
        let dir = self.dir(kind);
        let mut created = self.created();
        if !dir.exists() {
            fs::create_dir_all(&dir)?;
            created.dirs.push(dir.clone());
        }
        Ok(dir)
    }

    fn create_file(&self, path: PathBuf) -> io::Result<CsvFile> {
        let file = CsvFile::create(path.clone())?;
        self.created().files.push(path);
        Ok(file)
    }

    fn dir(&self, kind: ChannelKind) -> PathBuf {
        self.output_dir.join(match kind {
            ChannelKind::Snapshot => SNAPSHOT_DIR,
            ChannelKind::InsertStream => INSERTS_DIR,
            ChannelKind::DeleteStream => DELETES_DIR,
        })
    }
}

// --- Port Implementation ---

impl ChannelFactory for CsvChannelFactory {
    type Channel = CsvChannel;

    fn open(&self, worker: usize, kind: ChannelKind, partitions: usize) -> io::Result<CsvChannel> {
        let dir = self.create_dir(kind)?;

        match kind {
            ChannelKind::Snapshot => {
                let person = self.create_file(dir.join(format!("person_{worker}_0.csv")))?;
                let knows = match self.create_file(dir.join(format!("person_knows_person_{worker}_0.csv"))) {
                    Ok(knows) => knows,
                    Err(err) => {
                        person.discard();
                        return Err(err);
                    }
                };
                Ok(CsvChannel::Snapshot { person, knows })
            }
            ChannelKind::InsertStream | ChannelKind::DeleteStream => {
                let prefix = match kind {
                    ChannelKind::InsertStream => "insert_stream",
                    _ => "delete_stream",
                };
                let mut files = Vec::with_capacity(partitions);
                for partition in 0..partitions {
                    match self.create_file(dir.join(format!("{prefix}_{worker}_{partition}.csv"))) {
                        Ok(file) => files.push(file),
                        Err(err) => {
                            files.into_iter().for_each(CsvFile::discard);
                            return Err(err);
                        }
                    }
                }
                Ok(CsvChannel::Stream { kind, files })
            }
        }
    }

    fn discard_all(&self) -> io::Result<()> {
        let Created { dirs, files } = std::mem::take(&mut *self.created());
        tracing::info!("Removing {} partial output files", files.len());

        let mut result = Ok(());
        for path in files {
            match fs::remove_file(&path) {
                Err(err) if err.kind() != io::ErrorKind::NotFound => {
                    tracing::error!("Failed to remove {:?}: {}", path, err);
                    result = result.and(Err(err));
                }
                _ => {}
            }
        }
        for dir in dirs.into_iter().rev() {
            // Only directories left empty go away.
            if fs::remove_dir(&dir).is_err() {
                tracing::debug!("Keeping {:?}", dir);
            }
        }
        result
    }
}

// --- Core Logic ---

pub struct CsvFile {
    path: PathBuf,
    writer: csv::Writer<File>,
}

impl CsvFile {
    fn create(path: PathBuf) -> io::Result<Self> {
        let file = File::create(&path)?;
        Ok(Self {
            writer: codec::writer(file),
            path,
        })
    }

    fn finish(self) -> io::Result<()> {
        let file = self.writer.into_inner().map_err(|err| err.into_error())?;
        file.sync_all()
    }

    fn discard(self) {
        let CsvFile { path, writer } = self;
        drop(writer);
        if let Err(err) = fs::remove_file(&path) {
            tracing::warn!("Failed to remove {:?}: {}", path, err);
        }
    }
}

/// The files of one channel of one worker.
pub enum CsvChannel {
    /// Persons and knows edges go to separate files.
    Snapshot { person: CsvFile, knows: CsvFile },
    /// Event rows, one file per partition.
    Stream { kind: ChannelKind, files: Vec<CsvFile> },
}

impl CsvChannel {
    fn into_files(self) -> Vec<CsvFile> {
        match self {
            CsvChannel::Snapshot { person, knows } => vec![person, knows],
            CsvChannel::Stream { files, .. } => files,
        }
    }
}

impl Channel for CsvChannel {
    fn write(&mut self, partition: usize, record: Record<'_>) -> io::Result<()> {
        match self {
            CsvChannel::Snapshot { person, knows } => {
                let file = match record {
                    Record::Person(_) => person,
                    Record::Knows(_) => knows,
                };
                record.serialize_csv(&mut file.writer)?;
            }
            CsvChannel::Stream { kind, files } => {
                let partitions = files.len();
                let file = files.get_mut(partition).ok_or_else(|| {
                    io::Error::new(
                        io::ErrorKind::InvalidInput,
                        format!("partition {partition} out of {partitions}"),
                    )
                })?;
                let event = match kind {
                    ChannelKind::DeleteStream => EventType::delete(&record),
                    _ => EventType::insert(&record),
                };
                record.serialize_event_csv(event, &mut file.writer)?;
            }
        }
        Ok(())
    }

    fn close(self) -> io::Result<()> {
        let mut result = Ok(());
        for file in self.into_files() {
            let path = file.path.clone();
            if let Err(err) = file.finish() {
                tracing::error!("Failed to finish {:?}: {}", path, err);
                result = result.and(Err(err));
            }
        }
        result
    }

    fn discard(self) {
        self.into_files().into_iter().for_each(CsvFile::discard);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use snb_model::{Knows, Person, PersonId, Timestamp};

    fn person() -> Person {
        Person {
            id: PersonId::new(4),
            first_name: "Barbara".into(),
            last_name: "Liskov".into(),
            creation_date: Timestamp::from_millis(10),
            deletion_date: Some(Timestamp::from_millis(30)),
            explicitly_deleted: true,
            knows: vec![Knows {
                person1: PersonId::new(4),
                person2: PersonId::new(1),
                creation_date: Timestamp::from_millis(20),
                deletion_date: None,
                explicitly_deleted: false,
                weight: 0.25,
            }],
        }
    }

    fn read(path: PathBuf) -> String {
        fs::read_to_string(path).unwrap()
    }

    #[test]
    fn snapshot_splits_persons_and_knows() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let factory = CsvChannelFactory::new(dir.path());
        let person = person();

        let mut channel = factory.open(2, ChannelKind::Snapshot, 1)?;
        channel.write(0, Record::Person(&person))?;
        channel.write(0, Record::Knows(&person.knows[0]))?;
        channel.close()?;

        let snapshot = dir.path().join(SNAPSHOT_DIR);
        assert_eq!(
            read(snapshot.join("person_2_0.csv")),
            "4|Barbara|Liskov|10|30|true\n"
        );
        assert_eq!(
            read(snapshot.join("person_knows_person_2_0.csv")),
            "4|1|20||false|0.25\n"
        );
        Ok(())
    }

    #[test]
    fn streams_write_one_file_per_partition() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let factory = CsvChannelFactory::new(dir.path());
        let person = person();

        let mut inserts = factory.open(1, ChannelKind::InsertStream, 2)?;
        inserts.write(0, Record::Person(&person))?;
        inserts.write(1, Record::Knows(&person.knows[0]))?;
        inserts.close()?;

        let mut deletes = factory.open(1, ChannelKind::DeleteStream, 2)?;
        deletes.write(0, Record::Person(&person))?;
        deletes.close()?;

        let inserts = dir.path().join(INSERTS_DIR);
        assert_eq!(
            read(inserts.join("insert_stream_1_0.csv")),
            "10|INSERT_PERSON|4|Barbara|Liskov|10|30|true\n"
        );
        assert_eq!(
            read(inserts.join("insert_stream_1_1.csv")),
            "20|INSERT_KNOWS|4|1|20||false|0.25\n"
        );

        let deletes = dir.path().join(DELETES_DIR);
        assert_eq!(
            read(deletes.join("delete_stream_1_0.csv")),
            "30|DELETE_PERSON|4|Barbara|Liskov|10|30|true\n"
        );
        assert_eq!(read(deletes.join("delete_stream_1_1.csv")), "");
        Ok(())
    }

    #[test]
    fn out_of_range_partition_is_rejected() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let factory = CsvChannelFactory::new(dir.path());
        let person = person();

        let mut inserts = factory.open(0, ChannelKind::InsertStream, 1)?;
        let err = inserts.write(1, Record::Person(&person)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        Ok(())
    }

    #[test]
    fn discard_removes_written_files() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let factory = CsvChannelFactory::new(dir.path());
        let person = person();

        let mut snapshot = factory.open(0, ChannelKind::Snapshot, 1)?;
        snapshot.write(0, Record::Person(&person))?;
        snapshot.discard();
        assert!(!dir.path().join(SNAPSHOT_DIR).join("person_0_0.csv").exists());

        factory.open(0, ChannelKind::DeleteStream, 3)?.close()?;
        factory.discard_all()?;
        assert!(!dir.path().join(DELETES_DIR).exists());
        Ok(())
    }

    #[test]
    fn discard_all_keeps_files_from_earlier_runs() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let snapshot = dir.path().join(SNAPSHOT_DIR);
        fs::create_dir_all(&snapshot)?;
        let earlier = snapshot.join("person_9_0.csv");
        fs::write(&earlier, "1|Edsger|Dijkstra|5||false\n")?;

        let factory = CsvChannelFactory::new(dir.path());
        let person = person();
        let mut channel = factory.open(0, ChannelKind::Snapshot, 1)?;
        channel.write(0, Record::Person(&person))?;
        channel.close()?;
        factory.open(0, ChannelKind::InsertStream, 2)?.close()?;

        factory.discard_all()?;
        assert_eq!(read(earlier), "1|Edsger|Dijkstra|5||false\n");
        assert!(!snapshot.join("person_0_0.csv").exists());
        assert!(!snapshot.join("person_knows_person_0_0.csv").exists());
        assert!(!dir.path().join(INSERTS_DIR).exists());
        Ok(())
    }
}
