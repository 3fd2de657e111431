//! Parallel dispatch of import requests.
//!
//! Requests are split into contiguous chunks of `concurrency` requests. Each
//! chunk becomes one worker-group that imports its requests one after another
//! on a blocking thread. At most `concurrency` groups run at the same time,
//! and [`BatchScheduler::run`] returns only after every group has finished.

use super::address::ImportRequest;
use super::worker::{ImportOutcome, ImportWorker};
use futures::future::join_all;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, error};

/// Aggregated results of a batch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Fragment of every successful import, each exactly once
    pub fragments: Vec<PathBuf>,
    pub imported: usize,
    pub already_managed: usize,
    pub not_found: usize,
    pub failed: usize,
}

impl BatchReport {
    fn absorb(&mut self, outcome: ImportOutcome) {
        match outcome {
            ImportOutcome::Imported(path) => {
                self.imported += 1;
                self.fragments.push(path);
            }
            ImportOutcome::AlreadyManaged => self.already_managed += 1,
            ImportOutcome::NotFound => self.not_found += 1,
            ImportOutcome::Failed(_) => self.failed += 1,
        }
    }

    fn merge(&mut self, other: BatchReport) {
        self.fragments.extend(other.fragments);
        self.imported += other.imported;
        self.already_managed += other.already_managed;
        self.not_found += other.not_found;
        self.failed += other.failed;
    }

    /// Number of requests accounted for
    pub fn total(&self) -> usize {
        self.imported + self.already_managed + self.not_found + self.failed
    }
}

/// Split requests into ceil(N / concurrency) contiguous chunks of at most
/// `concurrency` requests. A concurrency of 0 is treated as 1.
pub fn partition(requests: Vec<ImportRequest>, concurrency: usize) -> Vec<Vec<ImportRequest>> {
    let size = concurrency.max(1);
    let mut chunks = Vec::with_capacity(requests.len().div_ceil(size));
    let mut iter = requests.into_iter().peekable();

    while iter.peek().is_some() {
        chunks.push(iter.by_ref().take(size).collect());
    }

    chunks
}

pub struct BatchScheduler {
    worker: Arc<ImportWorker>,
    concurrency: usize,
}

impl BatchScheduler {
    pub fn new(worker: Arc<ImportWorker>, concurrency: usize) -> Self {
        Self {
            worker,
            concurrency: concurrency.max(1),
        }
    }

    /// Import every request and wait for all worker-groups
    pub async fn run(&self, requests: Vec<ImportRequest>) -> BatchReport {
        let mut report = BatchReport::default();
        if requests.is_empty() {
            return report;
        }

        let chunks = partition(requests, self.concurrency);
        debug!(
            groups = chunks.len(),
            concurrency = self.concurrency,
            "dispatching worker-groups"
        );

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut handles = Vec::with_capacity(chunks.len());

        for (group, chunk) in chunks.into_iter().enumerate() {
            let size = chunk.len();
            let semaphore = Arc::clone(&semaphore);
            let worker = Arc::clone(&self.worker);

            let handle = tokio::spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(e) => return Err(format!("worker-group {} not admitted: {}", group, e)),
                };

                // Imports block on the tool process, so the group runs off the async threads
                tokio::task::spawn_blocking(move || run_group(&worker, group, chunk))
                    .await
                    .map_err(|e| format!("worker-group {} panicked: {}", group, e))
            });

            handles.push(async move {
                let result = match handle.await {
                    Ok(result) => result,
                    Err(e) => Err(format!("worker-group {} aborted: {}", group, e)),
                };
                (group, size, result)
            });
        }

        for (group, size, result) in join_all(handles).await {
            match result {
                Ok(group_report) => report.merge(group_report),
                Err(message) => {
                    // Outcomes of the lost group are unknown; treat them as
                    // failures so they are retried next run
                    error!(group, size, %message, "worker-group failed");
                    report.failed += size;
                }
            }
        }

        report
    }
}

fn run_group(worker: &ImportWorker, group: usize, chunk: Vec<ImportRequest>) -> BatchReport {
    debug!(group, size = chunk.len(), "worker-group started");
    let mut report = BatchReport::default();

    for request in &chunk {
        report.absorb(worker.process(request));
    }

    debug!(group, imported = report.imported, "worker-group finished");
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::MockExecutor;
    use crate::import::ledger::ProgressLedger;
    use crate::traits::{MockFileSystem, MockOutput};
    use std::collections::HashSet;
    use std::path::Path;
    use std::time::Duration;

    fn requests(n: usize) -> Vec<ImportRequest> {
        (0..n)
            .map(|i| {
                ImportRequest::parse_line(&format!("aws_s3_bucket.b{i} bucket-{i} us-east-1"), " ", i + 1)
                    .unwrap()
            })
            .collect()
    }

    fn scheduler_with(executor: Arc<MockExecutor>, fs: Arc<MockFileSystem>, concurrency: usize) -> BatchScheduler {
        let ledger = Arc::new(ProgressLedger::load(fs.clone(), Path::new("/work/imported.txt")).unwrap());
        let worker = ImportWorker::new(
            executor,
            fs,
            Arc::new(MockOutput::new()),
            ledger,
            Path::new("/work"),
            "AWS_DEFAULT_REGION",
        );
        BatchScheduler::new(Arc::new(worker), concurrency)
    }

    #[test]
    fn test_partition_covers_every_request_once() {
        for n in 0..=25 {
            for c in 1..=7 {
                let chunks = partition(requests(n), c);

                assert_eq!(chunks.len(), n.div_ceil(c), "n={} c={}", n, c);
                assert!(chunks.iter().all(|chunk| !chunk.is_empty() && chunk.len() <= c));

                let flattened: Vec<ImportRequest> = chunks.into_iter().flatten().collect();
                assert_eq!(flattened, requests(n), "n={} c={}", n, c);
            }
        }
    }

    #[test]
    fn test_partition_concurrency_larger_than_input() {
        let chunks = partition(requests(3), 10);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].len(), 3);
    }

    #[test]
    fn test_partition_zero_concurrency_treated_as_one() {
        let chunks = partition(requests(3), 0);
        assert_eq!(chunks.len(), 3);
    }

    #[tokio::test]
    async fn test_run_empty_returns_immediately() {
        let fs = Arc::new(MockFileSystem::new());
        let executor = Arc::new(MockExecutor::new(fs.clone()));
        let scheduler = scheduler_with(executor.clone(), fs, 4);

        let report = scheduler.run(Vec::new()).await;

        assert_eq!(report, BatchReport::default());
        assert_eq!(executor.import_count(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_run_collects_each_fragment_once() {
        let fs = Arc::new(MockFileSystem::new());
        let executor = Arc::new(
            MockExecutor::new(fs.clone())
                .fail("aws_s3_bucket.b3", "Error: Resource already managed by Terraform")
                .fail("aws_s3_bucket.b7", "Error: Cannot import non-existent remote object")
                .fail("aws_s3_bucket.b8", "Error: throttled"),
        );
        let scheduler = scheduler_with(executor.clone(), fs.clone(), 3);

        let report = scheduler.run(requests(10)).await;

        assert_eq!(executor.import_count(), 10);
        assert_eq!(report.imported, 7);
        assert_eq!(report.already_managed, 1);
        assert_eq!(report.not_found, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.total(), 10);

        let unique: HashSet<&PathBuf> = report.fragments.iter().collect();
        assert_eq!(unique.len(), 7);
        assert!(report.fragments.iter().all(|p| fs.has_file(p)));

        let ledger = fs.get_file_contents(Path::new("/work/imported.txt")).unwrap();
        assert_eq!(ledger.lines().count(), 9);
        assert!(!ledger.contains("aws_s3_bucket.b8"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_run_bounds_simultaneous_imports() {
        let fs = Arc::new(MockFileSystem::new());
        let executor = Arc::new(MockExecutor::new(fs.clone()).with_delay(Duration::from_millis(20)));
        let scheduler = scheduler_with(executor.clone(), fs, 2);

        let report = scheduler.run(requests(12)).await;

        assert_eq!(report.imported, 12);
        assert!(executor.max_in_flight() <= 2, "saw {}", executor.max_in_flight());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_requests_within_a_group_run_in_order() {
        let fs = Arc::new(MockFileSystem::new());
        let executor = Arc::new(MockExecutor::new(fs.clone()));
        // One group holds every request
        let scheduler = scheduler_with(executor.clone(), fs, 5);

        scheduler.run(requests(5)).await;

        let order: Vec<String> = executor.calls().into_iter().map(|(a, _, _)| a).collect();
        let expected: Vec<String> = requests(5).into_iter().map(|r| r.address).collect();
        assert_eq!(order, expected);
    }
}
