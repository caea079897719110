use tracing::{debug, error, info};

use crate::channel::ChannelFactory;
use crate::error::{Error, Result};
use crate::grouping::Batch;
use crate::router::ExportStats;
use crate::settings::SplitSettings;
use crate::worker::Worker;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageReport {
    /// Per worker, indexed by worker id.
    pub workers: Vec<ExportStats>,
    pub total: ExportStats,
}

/// Runs one worker thread per stream and waits for all of them.
///
/// The stage fails as a whole when any worker fails; the error of the
/// lowest failing worker id is returned.
pub fn run_stage<F: ChannelFactory>(
    settings: &SplitSettings,
    factory: &F,
    streams: Vec<Vec<Batch>>,
) -> Result<StageReport> {
    debug!(workers = streams.len(), ?settings, "starting split stage");

    let results: Vec<Result<ExportStats>> = std::thread::scope(|scope| {
        let handles: Vec<_> = streams
            .into_iter()
            .enumerate()
            .map(|(id, batches)| scope.spawn(move || Worker::new(id, settings, factory).run(batches)))
            .collect();

        handles
            .into_iter()
            .enumerate()
            .map(|(id, handle)| handle.join().unwrap_or(Err(Error::WorkerPanicked(id))))
            .collect()
    });

    let mut report = StageReport::default();
    let mut failure = None;
    for (id, result) in results.into_iter().enumerate() {
        match result {
            Ok(stats) => {
                report.total += stats;
                report.workers.push(stats);
            }
            Err(err) => {
                error!(worker = id, "{err}");
                failure.get_or_insert(err);
            }
        }
    }
    if let Some(err) = failure {
        return Err(err);
    }

    info!(
        workers = report.workers.len(),
        snapshot = report.total.snapshot,
        inserts = report.total.inserts,
        deletes = report.total.deletes,
        dropped = report.total.dropped,
        inverted = report.total.inverted,
        "split stage finished"
    );
    Ok(report)
}
