pub mod codec;
pub mod dates;
pub mod generator;
pub mod person;

pub use dates::{InvalidThresholds, Lifespan, Thresholds, Timestamp};
pub use person::{Knows, Person, PersonId, Record};

/// Reads persons stored one JSON document per line, skipping blank lines.
pub fn read_persons_jsonl(reader: impl std::io::BufRead) -> anyhow::Result<Vec<Person>> {
    let mut persons = Vec::new();
    for (number, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let person = serde_json::from_str(&line)
            .map_err(|err| anyhow::anyhow!("invalid person on line {}: {err}", number + 1))?;
        persons.push(person);
    }
    Ok(persons)
}

/// Writes persons one JSON document per line.
pub fn write_persons_jsonl(
    mut writer: impl std::io::Write,
    persons: impl IntoIterator<Item = Person>,
) -> anyhow::Result<usize> {
    let mut written = 0;
    for person in persons {
        serde_json::to_writer(&mut writer, &person)?;
        writer.write_all(b"\n")?;
        written += 1;
    }
    writer.flush()?;
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use generator::PersonGenerator;

    #[test]
    fn jsonl_keeps_persons_intact() -> anyhow::Result<()> {
        let persons: Vec<_> =
            PersonGenerator::seeded(Timestamp::from_days(0), Timestamp::from_days(10), 3)
                .take(20)
                .collect();

        let mut buffer = Vec::new();
        assert_eq!(write_persons_jsonl(&mut buffer, persons.clone())?, 20);

        let read = read_persons_jsonl(buffer.as_slice())?;
        assert_eq!(read, persons);
        Ok(())
    }

    #[test]
    fn jsonl_defaults_optional_fields() -> anyhow::Result<()> {
        let input = r#"
{"id":1,"first_name":"Ada","last_name":"Lovelace","creation_date":50}
"#;
        let persons = read_persons_jsonl(input.as_bytes())?;
        assert_eq!(persons.len(), 1);
        assert_eq!(persons[0].deletion_date, None);
        assert!(!persons[0].explicitly_deleted);
        assert!(persons[0].knows.is_empty());
        Ok(())
    }

    #[test]
    fn jsonl_reports_bad_line() {
        let err = read_persons_jsonl("{}\n".as_bytes()).unwrap_err();
        assert!(err.to_string().contains("line 1"));
    }
}
