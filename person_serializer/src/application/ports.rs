use snb_model::Person;

/// A contract for a service that performs Stage 1:
/// loading the persons to split, each with every knows edge it owns.
pub trait PersonSource {
    fn load(&self) -> anyhow::Result<Vec<Person>>;
}

/// A contract for the outputs of Stage 3: one snapshot, insert stream and
/// delete stream per worker.
pub use snb_split::ChannelFactory;
