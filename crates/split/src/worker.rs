use scopeguard::ScopeGuard;
use tracing::{info, info_span, warn};

use crate::channel::{ChannelFactory, ChannelSet};
use crate::error::Result;
use crate::grouping::Batch;
use crate::router::{ChannelRouter, ExportStats};
use crate::settings::SplitSettings;

/// Splits one stream of batches into the worker's own channels.
pub struct Worker<'a, F> {
    id: usize,
    settings: &'a SplitSettings,
    factory: &'a F,
}

impl<'a, F: ChannelFactory> Worker<'a, F> {
    pub fn new(id: usize, settings: &'a SplitSettings, factory: &'a F) -> Self {
        Worker {
            id,
            settings,
            factory,
        }
    }

    /// Channels are opened before the first batch and closed after the
    /// last one. Any failure in between discards them instead.
    pub fn run(&self, batches: impl IntoIterator<Item = Batch>) -> Result<ExportStats> {
        let span = info_span!("worker", id = self.id);
        let _guard = span.enter();

        let channels = ChannelSet::open(self.factory, self.id, self.settings)?;
        let mut router = scopeguard::guard(
            ChannelRouter::new(*self.settings, channels),
            |router| {
                warn!("discarding partial output");
                router.discard();
            },
        );

        let mut persons = 0u64;
        for batch in batches {
            router.process(&batch)?;
            persons += 1;
        }

        let stats = ScopeGuard::into_inner(router).close()?;
        info!(
            persons,
            snapshot = stats.snapshot,
            inserts = stats.inserts,
            deletes = stats.deletes,
            dropped = stats.dropped,
            "worker finished"
        );
        Ok(stats)
    }
}
