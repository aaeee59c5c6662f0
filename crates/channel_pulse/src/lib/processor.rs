use std::{
    fs::{remove_dir, remove_dir_all},
    path::{Path, PathBuf},
    sync::atomic::{AtomicBool, Ordering},
};

use channel_store::StorageSink;
use chrono_tz::Tz;
use tokio::sync::Mutex;

use crate::{
    acquisition::{AcquisitionEngine, AcquisitionError, AcquisitionRequest},
    clock::Clock,
    freshness::is_fresh_today,
    resolver::ChannelResolver,
    types::{Completion, RunResult, SkipReason},
};

pub mod builder;

/// The resolve → filter → acquire → upload → clean up pipeline.
///
/// Collaborators are created once per process and shared across runs; the
/// only state a run leaves behind is its log output.
pub struct AudioPipeline<R, S>
where
    R: ChannelResolver + Send + Sync + 'static,
    S: StorageSink + Send + Sync + 'static,
{
    workdir: PathBuf,
    zone: Tz,
    resolver: R,
    engine: AcquisitionEngine,
    sink: S,
    clock: Box<dyn Clock + Send + Sync>,
    run_lock: Mutex<()>,
    running: AtomicBool,
}

impl<R, S> AudioPipeline<R, S>
where
    R: ChannelResolver + Send + Sync + 'static,
    S: StorageSink + Send + Sync + 'static,
{
    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Runs the pipeline once. Overlapping calls return immediately with
    /// [`SkipReason::RunInProgress`].
    #[tracing::instrument(skip(self), fields(workdir = ?self.workdir, zone = %self.zone))]
    pub async fn run(&self) -> RunResult {
        let Ok(_guard) = self.run_lock.try_lock() else {
            tracing::warn!("A run is already in progress, skipping");
            return RunResult::Ok(Completion::Skipped(SkipReason::RunInProgress));
        };
        let _flag = RunningFlag::raise(&self.running);

        let result = self.run_once().await;
        match &result {
            RunResult::Ok(completion) => tracing::info!(?completion, "Run finished"),
            RunResult::Partial { artifact, error } => {
                tracing::warn!(%artifact, %error, "Run finished without storing its artifact")
            }
            RunResult::Fail { attempts } => tracing::error!(?attempts, "Run failed"),
        }
        result
    }

    async fn run_once(&self) -> RunResult {
        let run_dir = RunDir::new(&self.workdir);

        let Some(descriptor) = self.resolver.resolve_latest().await else {
            tracing::info!("No video found for channel");
            return RunResult::Ok(Completion::Skipped(SkipReason::NoVideo));
        };
        tracing::info!(video_id = %descriptor.id, title = %descriptor.title, published = ?descriptor.published, "Found video");

        if !is_fresh_today(&descriptor, self.clock.now(), self.zone) {
            tracing::info!(video_id = %descriptor.id, "Latest video was not published today");
            return RunResult::Ok(Completion::Skipped(SkipReason::NotFresh {
                video_id: descriptor.id,
            }));
        }

        if let Err(e) = run_dir.create() {
            tracing::error!(error = ?e, path = ?run_dir.path(), "Failed to create run directory");
            return RunResult::Fail { attempts: vec![] };
        }

        let request = AcquisitionRequest::new(&descriptor, run_dir.path());
        let artifact = match self.engine.acquire(&request).await {
            Ok(artifact) => artifact,
            Err(AcquisitionError::Exhausted { attempts }) => return RunResult::Fail { attempts },
        };

        match self.sink.upload(&artifact.path).await {
            Ok(receipt) => RunResult::Ok(Completion::Uploaded(receipt)),
            Err(e) => {
                tracing::error!(error = ?e, path = ?artifact.path, "Upload failed");
                RunResult::Partial {
                    artifact: artifact.path.display().to_string(),
                    error: format!("{e:#}"),
                }
            }
        }
    }
}

/// A run's private transient directory under the work directory, removed
/// when the run ends on any path.
struct RunDir {
    workdir: PathBuf,
    path: PathBuf,
}

impl RunDir {
    fn new(workdir: &Path) -> Self {
        let run_id = uuid::Uuid::new_v4();
        RunDir {
            workdir: workdir.to_path_buf(),
            path: workdir.join(run_id.to_string()),
        }
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn create(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.path)
    }
}

impl Drop for RunDir {
    fn drop(&mut self) {
        if self.path.exists() {
            if let Err(e) = remove_dir_all(&self.path) {
                tracing::warn!(error = ?e, path = ?self.path, "Failed to clean up run directory");
            } else {
                tracing::info!(path = ?self.path, "Cleaned up run directory");
            }
        }

        // other runs may still own entries here; only an empty workdir goes
        if self.workdir.exists() {
            let _ = remove_dir(&self.workdir);
        }
    }
}

/// Mirrors the run lock for status checks, which must never contend for it.
struct RunningFlag<'a>(&'a AtomicBool);

impl<'a> RunningFlag<'a> {
    fn raise(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::Release);
        Self(flag)
    }
}

impl Drop for RunningFlag<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_dir_removed_on_drop() {
        let root = tempfile::tempdir().unwrap();
        let workdir = root.path().join("downloads");

        let path = {
            let run_dir = RunDir::new(&workdir);
            run_dir.create().unwrap();
            std::fs::write(run_dir.path().join("episode.mp3"), b"x").unwrap();
            run_dir.path().to_path_buf()
        };

        assert!(!path.exists());
        assert!(!workdir.exists(), "empty workdir should be removed too");
    }

    #[test]
    fn test_run_dir_keeps_shared_workdir_with_other_entries() {
        let root = tempfile::tempdir().unwrap();
        let workdir = root.path().join("downloads");
        let other_run = workdir.join("other-run");
        std::fs::create_dir_all(&other_run).unwrap();

        {
            let run_dir = RunDir::new(&workdir);
            run_dir.create().unwrap();
        }

        assert!(other_run.exists());
    }

    #[test]
    fn test_run_dirs_are_unique() {
        let workdir = Path::new("/tmp/downloads");
        let a = RunDir::new(workdir);
        let b = RunDir::new(workdir);
        assert_ne!(a.path(), b.path());
        assert!(a.path().starts_with(workdir));
    }
}
