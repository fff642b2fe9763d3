use crate::error::Result;
use crate::game::installer::core::artifact::Artifact;
use crate::game::installer::core::downloader::fetch_to_store;
use crate::game::installer::core::store::is_satisfied;
use crate::game::installer::types::ProgressReporter;
use futures::stream::{self, StreamExt, TryStreamExt};
use reqwest::Client;
use std::collections::HashSet;

/// What a finished batch did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub fetched: usize,
    pub cached: usize,
    pub bytes_received: u64,
}

/// Running byte-weighted completion of one batch.
///
/// Only the batch's completion loop writes to it.
struct ProgressAccumulator {
    total_bytes: u64,
    total_items: usize,
    completed_bytes: u64,
    completed_items: usize,
}

impl ProgressAccumulator {
    fn new(artifacts: &[Artifact]) -> Self {
        Self {
            total_bytes: artifacts.iter().map(Artifact::size).sum(),
            total_items: artifacts.len(),
            completed_bytes: 0,
            completed_items: 0,
        }
    }

    fn credit(&mut self, artifact: &Artifact) -> f64 {
        self.completed_bytes += artifact.size();
        self.completed_items += 1;
        self.fraction()
    }

    fn fraction(&self) -> f64 {
        if self.completed_items >= self.total_items {
            return 1.0;
        }
        if self.total_bytes == 0 {
            return self.completed_items as f64 / self.total_items as f64;
        }
        self.completed_bytes as f64 / self.total_bytes as f64
    }
}

pub struct BatchDownloader {
    client: Client,
    concurrency: usize,
}

impl BatchDownloader {
    pub fn new(client: Client, concurrency: usize) -> Self {
        Self {
            client,
            concurrency: concurrency.max(1),
        }
    }

    /// Fetch every artifact concurrently; the first failure aborts the batch.
    ///
    /// Artifacts already in the store are credited before any network call.
    /// Files committed before a failure stay on disk.
    pub async fn download_batch(
        &self,
        artifacts: Vec<Artifact>,
        label: &str,
        reporter: &dyn ProgressReporter,
    ) -> Result<BatchSummary> {
        // Deduplicate artifacts by path to avoid concurrent writes to the same file
        let mut unique_artifacts = Vec::new();
        let mut seen_paths = HashSet::new();
        for artifact in artifacts {
            if seen_paths.insert(artifact.path().to_path_buf()) {
                unique_artifacts.push(artifact);
            }
        }

        let total = unique_artifacts.len();
        log::info!("Starting batch '{}' ({} artifacts)", label, total);
        reporter.start_step(label, total);

        let mut progress = ProgressAccumulator::new(&unique_artifacts);
        let mut summary = BatchSummary::default();

        if total == 0 {
            reporter.set_progress(label, 1.0);
            reporter.done(label, true);
            return Ok(summary);
        }

        let result = self
            .run(unique_artifacts, label, reporter, &mut progress, &mut summary)
            .await;

        match result {
            Ok(()) => {
                log::info!(
                    "Batch '{}' complete: {} fetched ({} bytes), {} cached",
                    label,
                    summary.fetched,
                    summary.bytes_received,
                    summary.cached
                );
                reporter.done(label, true);
                Ok(summary)
            }
            Err(e) => {
                log::error!("Batch '{}' failed: {}", label, e);
                reporter.done(label, false);
                Err(e)
            }
        }
    }

    async fn run(
        &self,
        artifacts: Vec<Artifact>,
        label: &str,
        reporter: &dyn ProgressReporter,
        progress: &mut ProgressAccumulator,
        summary: &mut BatchSummary,
    ) -> Result<()> {
        // Store pass: stale files are removed here, satisfied ones credited
        let checked: Vec<(Artifact, bool)> = stream::iter(artifacts)
            .map(|artifact| async move {
                let satisfied = is_satisfied(artifact.path(), artifact.sha1()).await?;
                Ok::<_, crate::error::InstallError>((artifact, satisfied))
            })
            .buffer_unordered(self.concurrency)
            .try_collect()
            .await?;

        let mut pending = Vec::new();
        for (artifact, satisfied) in checked {
            if satisfied {
                summary.cached += 1;
                reporter.set_progress(label, progress.credit(&artifact));
            } else {
                pending.push(artifact);
            }
        }

        if pending.is_empty() {
            log::debug!("Batch '{}' fully cached", label);
            return Ok(());
        }

        let pending_count = pending.len();
        let mut fetches = stream::iter(pending)
            .map(|artifact| {
                let client = self.client.clone();
                async move {
                    let received = fetch_to_store(&client, &artifact).await?;
                    Ok::<_, crate::error::InstallError>((artifact, received))
                }
            })
            .buffer_unordered(self.concurrency);

        while let Some(outcome) = fetches.next().await {
            let (artifact, received) = outcome?;
            summary.fetched += 1;
            summary.bytes_received += received;
            let fraction = progress.credit(&artifact);
            reporter.set_progress(label, fraction);

            if summary.fetched % 10 == 0 || summary.fetched == pending_count {
                log::info!(
                    "Batch '{}' progress: {}/{} fetched ({:.0}%)",
                    label,
                    summary.fetched,
                    pending_count,
                    fraction * 100.0
                );
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artifact(size: u64, name: &str) -> Artifact {
        Artifact::new(format!("http://unused/{name}"), "00", size, name)
    }

    #[test]
    fn accumulator_is_byte_weighted() {
        let all = vec![artifact(10, "a"), artifact(20, "b"), artifact(70, "c")];
        let mut acc = ProgressAccumulator::new(&all);
        assert!((acc.credit(&all[1]) - 0.2).abs() < 1e-9);
        assert!((acc.credit(&all[0]) - 0.3).abs() < 1e-9);
        assert_eq!(acc.credit(&all[2]), 1.0);
    }

    #[test]
    fn accumulator_counts_items_when_sizes_are_unknown() {
        let all = vec![artifact(0, "a"), artifact(0, "b")];
        let mut acc = ProgressAccumulator::new(&all);
        assert_eq!(acc.credit(&all[0]), 0.5);
        assert_eq!(acc.credit(&all[1]), 1.0);
    }

    #[test]
    fn accumulator_never_decreases_with_zero_sized_members() {
        let all = vec![artifact(5, "a"), artifact(0, "b")];
        let mut acc = ProgressAccumulator::new(&all);
        assert_eq!(acc.credit(&all[0]), 1.0);
        assert_eq!(acc.credit(&all[1]), 1.0);
    }
}
