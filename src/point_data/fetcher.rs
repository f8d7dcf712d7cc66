//! Concurrent retrieval of point series with a single orchestration-level retry.

use crate::config::{ExistingArtifacts, RunConfig};
use crate::point_data::client::PowerClient;
use crate::point_data::error::PointDataError;
use crate::types::location::Location;
use crate::types::ordinal_date::DateRange;
use log::{info, warn};
use std::collections::BTreeSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::NamedTempFile;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;

pub const ARTIFACT_EXTENSION: &str = "WTH";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStatus {
    Pending,
    Succeeded,
    Failed,
}

/// One point request. Only the worker that dequeued it changes its status.
#[derive(Debug, Clone)]
pub struct FetchTask {
    pub location: Location,
    pub range: DateRange,
    pub status: FetchStatus,
}

impl FetchTask {
    pub fn new(location: Location, range: DateRange) -> Self {
        Self {
            location,
            range,
            status: FetchStatus::Pending,
        }
    }
}

/// Outcome of a complete fetch, after the retry pass if one was needed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchReport {
    /// Distinct point identifiers requested.
    pub requested: usize,
    /// Requested points with a file on disk.
    pub succeeded: usize,
    /// Points that were missing after the first pass and requested again.
    pub retried: Vec<i64>,
    /// Points still without a file after the retry pass.
    pub still_missing: Vec<i64>,
}

impl FetchReport {
    pub fn is_complete(&self) -> bool {
        self.still_missing.is_empty()
    }

    pub fn ensure_complete(&self) -> Result<(), PointDataError> {
        if self.is_complete() {
            Ok(())
        } else {
            Err(PointDataError::Incomplete {
                missing: self.still_missing.clone(),
            })
        }
    }
}

/// Path of the raw point artifact for `external_point_id` inside `dir`.
pub fn artifact_path(dir: &Path, external_point_id: i64) -> PathBuf {
    dir.join(format!("{}.{}", external_point_id, ARTIFACT_EXTENSION))
}

/// Fetches one series per distinct point through a fixed pool of workers.
pub struct PointFetcher {
    base_url: String,
    workers: usize,
    timeout: Duration,
    connect_retries: u32,
    existing: ExistingArtifacts,
}

impl PointFetcher {
    pub fn from_config(config: &RunConfig) -> Self {
        Self {
            base_url: config.power_base_url.clone(),
            workers: config.workers.max(1),
            timeout: config.request_timeout,
            connect_retries: config.connect_retries,
            existing: config.existing_artifacts,
        }
    }

    /// Fetches every distinct point of `points` into `out_dir`.
    ///
    /// Individual request failures never fail the call: the point is left missing and
    /// retried once after all workers have drained the queue. The returned report
    /// says what is still missing; use [`FetchReport::ensure_complete`] to turn that
    /// into an error.
    pub async fn fetch(
        &self,
        points: &[Location],
        range: DateRange,
        out_dir: &Path,
    ) -> Result<FetchReport, PointDataError> {
        tokio::fs::create_dir_all(out_dir)
            .await
            .map_err(|e| PointDataError::DirCreation(out_dir.to_path_buf(), e))?;

        let mut distinct: Vec<Location> = Vec::with_capacity(points.len());
        let mut requested = BTreeSet::new();
        for point in points {
            if requested.insert(point.external_point_id) {
                distinct.push(point.clone());
            }
        }
        info!("Number of points requested: {}", requested.len());

        let first_pass: Vec<Location> = match self.existing {
            ExistingArtifacts::Overwrite => distinct.clone(),
            ExistingArtifacts::SkipExisting => distinct
                .iter()
                .filter(|p| !artifact_path(out_dir, p.external_point_id).exists())
                .cloned()
                .collect(),
        };
        if first_pass.len() < distinct.len() {
            info!(
                "Skipping {} point(s) already on disk",
                distinct.len() - first_pass.len()
            );
        }
        self.run_pass(first_pass, range, out_dir).await?;

        let missing = reconcile(&requested, out_dir)?;
        if missing.is_empty() {
            info!("All requested point data were downloaded successfully.");
            return Ok(FetchReport {
                requested: requested.len(),
                succeeded: requested.len(),
                retried: Vec::new(),
                still_missing: Vec::new(),
            });
        }

        warn!("{} missing point file(s): {:?}", missing.len(), missing);
        let retry: Vec<Location> = distinct
            .into_iter()
            .filter(|p| missing.contains(&p.external_point_id))
            .collect();
        self.run_pass(retry, range, out_dir).await?;

        let still_missing = reconcile(&requested, out_dir)?;
        if still_missing.is_empty() {
            info!("All requested point data were downloaded successfully after retry.");
        }
        Ok(FetchReport {
            requested: requested.len(),
            succeeded: requested.len() - still_missing.len(),
            retried: missing.into_iter().collect(),
            still_missing: still_missing.into_iter().collect(),
        })
    }

    /// Runs one pass over `points` and returns every task with its final status.
    /// Returns only once the queue is drained and all workers have finished.
    pub async fn run_pass(
        &self,
        points: Vec<Location>,
        range: DateRange,
        out_dir: &Path,
    ) -> Result<Vec<FetchTask>, PointDataError> {
        if points.is_empty() {
            return Ok(Vec::new());
        }

        let (sender, receiver) = mpsc::unbounded_channel();
        for point in points {
            // The receiver is alive until the workers below exit.
            let _ = sender.send(FetchTask::new(point, range));
        }
        drop(sender);
        let queue = Arc::new(Mutex::new(receiver));

        let mut workers = JoinSet::new();
        for worker_id in 0..self.workers {
            let client = PowerClient::new(&self.base_url, self.timeout, self.connect_retries)?;
            workers.spawn(worker_loop(
                worker_id,
                client,
                Arc::clone(&queue),
                out_dir.to_path_buf(),
            ));
        }

        let mut finished = Vec::new();
        while let Some(joined) = workers.join_next().await {
            finished.extend(joined?);
        }
        Ok(finished)
    }
}

async fn worker_loop(
    worker_id: usize,
    client: PowerClient,
    queue: Arc<Mutex<mpsc::UnboundedReceiver<FetchTask>>>,
    out_dir: PathBuf,
) -> Vec<FetchTask> {
    let mut finished = Vec::new();
    loop {
        let next = queue.lock().await.recv().await;
        let Some(mut task) = next else {
            break;
        };
        let point_id = task.location.external_point_id;
        info!("Worker {} requesting data for: {}", worker_id, point_id);

        let outcome = match client.daily_point(&task.location, &task.range).await {
            Ok(body) => {
                let dir = out_dir.clone();
                match tokio::task::spawn_blocking(move || write_artifact(&dir, point_id, &body))
                    .await
                {
                    Ok(written) => written,
                    Err(join_error) => Err(PointDataError::TaskJoin(join_error)),
                }
            }
            Err(e) => Err(e),
        };

        match outcome {
            Ok(path) => {
                info!("Data obtained for: {} ({})", point_id, path.display());
                task.status = FetchStatus::Succeeded;
            }
            Err(e) => {
                warn!("Error in point {}: {}", point_id, e);
                task.status = FetchStatus::Failed;
            }
        }
        finished.push(task);
    }
    finished
}

/// Writes through a temporary file so a point file is either complete or absent.
fn write_artifact(dir: &Path, external_point_id: i64, body: &str) -> Result<PathBuf, PointDataError> {
    let path = artifact_path(dir, external_point_id);
    let write_error = |e| PointDataError::ArtifactWrite(path.clone(), e);
    let mut temp = NamedTempFile::new_in(dir).map_err(write_error)?;
    temp.write_all(body.as_bytes()).map_err(write_error)?;
    temp.flush().map_err(write_error)?;
    temp.persist(&path).map_err(|e| write_error(e.error))?;
    Ok(path)
}

/// Point identifiers with a file in `dir`.
pub fn downloaded_points(dir: &Path) -> Result<BTreeSet<i64>, PointDataError> {
    let entries = std::fs::read_dir(dir).map_err(|e| PointDataError::DirRead(dir.to_path_buf(), e))?;
    let mut found = BTreeSet::new();
    for entry in entries {
        let entry = entry.map_err(|e| PointDataError::DirRead(dir.to_path_buf(), e))?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some(ARTIFACT_EXTENSION) {
            continue;
        }
        match path.file_stem().and_then(|s| s.to_str()).map(str::parse::<i64>) {
            Some(Ok(id)) => {
                found.insert(id);
            }
            _ => warn!("Ignoring unexpected file {} in point data directory", path.display()),
        }
    }
    Ok(found)
}

/// Compares requested points against files on disk and returns the missing ones.
fn reconcile(requested: &BTreeSet<i64>, dir: &Path) -> Result<BTreeSet<i64>, PointDataError> {
    let downloaded = downloaded_points(dir)?;
    info!(
        "Number of points requested: {}, downloaded: {}",
        requested.len(),
        downloaded.len()
    );
    if downloaded.len() > requested.len() {
        return Err(PointDataError::Inconsistent {
            requested: requested.len(),
            downloaded: downloaded.len(),
        });
    }
    Ok(requested.difference(&downloaded).copied().collect())
}
