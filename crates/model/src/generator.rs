use num_rational::Ratio;

use rand::rngs::SmallRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};

use crate::dates::Timestamp;
use crate::person::{Knows, Person, PersonId};

/// Endless stream of synthetic persons created inside `[start, end)`.
///
/// Deletions may fall past `end` so that every routing bucket gets
/// populated once thresholds are placed inside the window.
pub struct PersonGenerator {
    rng: SmallRng,
    start: Timestamp,
    end: Timestamp,
    next_id: u64,
    known: Vec<(PersonId, Timestamp)>,
}

impl PersonGenerator {
    const DELETED: Ratio<u32> = Ratio::new_raw(1, 4);
    const EXPLICITLY_DELETED: Ratio<u32> = Ratio::new_raw(3, 4);
    const MAX_KNOWS: usize = 6;

    const FIRST_NAMES: &[&str] = &["Ada", "Alan", "Barbara", "Edsger", "Grace", "Niklaus"];
    const LAST_NAMES: &[&str] = &["Dijkstra", "Hopper", "Liskov", "Lovelace", "Turing", "Wirth"];

    pub fn new(start: Timestamp, end: Timestamp) -> Self {
        Self::with_rng(start, end, SmallRng::from_os_rng())
    }

    pub fn seeded(start: Timestamp, end: Timestamp, seed: u64) -> Self {
        Self::with_rng(start, end, SmallRng::seed_from_u64(seed))
    }

    fn with_rng(start: Timestamp, end: Timestamp, rng: SmallRng) -> Self {
        assert!(start < end, "generation window is empty");
        PersonGenerator {
            rng,
            start,
            end,
            next_id: 0,
            known: Vec::new(),
        }
    }

    fn random_ratio(&mut self, ratio: Ratio<u32>) -> bool {
        self.rng.random_ratio(*ratio.numer(), *ratio.denom())
    }

    /// Uniform in `[from, end)`, or `from` itself when it is already past the window.
    fn random_date(&mut self, from: Timestamp) -> Timestamp {
        let from = from.as_millis();
        let end = self.end.as_millis();
        if from >= end {
            return Timestamp::from_millis(from);
        }
        Timestamp::from_millis(self.rng.random_range(from..end))
    }

    fn random_deletion(&mut self, creation: Timestamp) -> (Option<Timestamp>, bool) {
        if !self.random_ratio(Self::DELETED) {
            return (None, false);
        }
        let span = self.end.as_millis() - self.start.as_millis();
        let horizon = self.end.as_millis() + span / 4;
        let deletion = self.rng.random_range(creation.as_millis()..=horizon.max(creation.as_millis()));
        let explicitly_deleted = self.random_ratio(Self::EXPLICITLY_DELETED);
        (Some(Timestamp::from_millis(deletion)), explicitly_deleted)
    }

    fn random_name(&mut self, names: &[&str]) -> String {
        names.choose(&mut self.rng).copied().unwrap_or_default().to_string()
    }

    fn random_knows(&mut self, id: PersonId, creation: Timestamp) -> Vec<Knows> {
        let amount = self.rng.random_range(0..=Self::MAX_KNOWS).min(self.known.len());
        let targets: Vec<_> = self
            .known
            .choose_multiple(&mut self.rng, amount)
            .copied()
            .collect();

        let mut knows = Vec::with_capacity(targets.len());
        for (target, target_creation) in targets {
            let creation_date = self.random_date(creation.max(target_creation));
            let (deletion_date, explicitly_deleted) = self.random_deletion(creation_date);
            knows.push(Knows {
                person1: id,
                person2: target,
                creation_date,
                deletion_date,
                explicitly_deleted,
                weight: self.rng.random(),
            });
        }
        knows
    }
}

impl Iterator for PersonGenerator {
    type Item = Person;

    fn next(&mut self) -> Option<Self::Item> {
        let id = PersonId::new(self.next_id);
        self.next_id += 1;

        let creation_date = self.random_date(self.start);
        let (deletion_date, explicitly_deleted) = self.random_deletion(creation_date);
        let knows = self.random_knows(id, creation_date);
        self.known.push((id, creation_date));

        Some(Person {
            id,
            first_name: self.random_name(Self::FIRST_NAMES),
            last_name: self.random_name(Self::LAST_NAMES),
            creation_date,
            deletion_date,
            explicitly_deleted,
            knows,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window() -> (Timestamp, Timestamp) {
        (Timestamp::from_days(0), Timestamp::from_days(300))
    }

    #[test]
    fn same_seed_same_persons() {
        let (start, end) = window();
        let a: Vec<_> = PersonGenerator::seeded(start, end, 42).take(50).collect();
        let b: Vec<_> = PersonGenerator::seeded(start, end, 42).take(50).collect();
        assert_eq!(a, b);
    }

    #[test]
    fn generated_lifespans_are_well_formed() {
        let (start, end) = window();
        for person in PersonGenerator::seeded(start, end, 7).take(500) {
            assert!(person.creation_date >= start && person.creation_date < end);
            assert!(!person.lifespan().is_inverted());
            if person.deletion_date.is_none() {
                assert!(!person.explicitly_deleted);
            }
            for knows in &person.knows {
                assert_eq!(knows.person1, person.id);
                assert!(knows.person2 < person.id);
                assert!(knows.creation_date >= person.creation_date);
                assert!(!knows.lifespan().is_inverted());
            }
        }
    }

    #[test]
    fn ids_are_sequential() {
        let (start, end) = window();
        let ids: Vec<_> = PersonGenerator::seeded(start, end, 1)
            .take(5)
            .map(|person| person.id.get())
            .collect();
        assert_eq!(ids, vec![0, 1, 2, 3, 4]);
    }
}
