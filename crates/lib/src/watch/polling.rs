use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::trace;

use super::{FileWatcher, WatchChanges, WatchFuture, WatchRequest};
use crate::compiler::WatchOptions;
use crate::fs::{FileStat, InputFileSystem};

type Snapshot = BTreeMap<PathBuf, Option<FileStat>>;

/// Watches by polling `stat` on every watched path.
///
/// A path counts as changed when its modification time moves past both the
/// first poll and the build start, or when it appears. Once something
/// changed, the watcher waits the aggregate timeout and polls again so that
/// a burst of writes is reported as one batch.
#[derive(Clone)]
pub struct PollingWatcher {
  fs: Arc<dyn InputFileSystem>,
}

impl PollingWatcher {
  pub fn new(fs: Arc<dyn InputFileSystem>) -> Self {
    Self { fs }
  }

  async fn scan(&self, request: &WatchRequest, options: &WatchOptions) -> Snapshot {
    let mut snapshot = Snapshot::new();
    for path in request.files.iter().chain(&request.contexts) {
      if options.is_ignored(path) {
        continue;
      }
      let stat = self.fs.stat(path).await.ok();
      snapshot.insert(path.clone(), stat);
    }
    snapshot
  }
}

impl FileWatcher for PollingWatcher {
  fn wait<'a>(&'a self, request: &'a WatchRequest, options: &'a WatchOptions) -> WatchFuture<'a> {
    Box::pin(async move {
      let interval = Duration::from_millis(options.poll_interval_ms.max(1));
      let baseline = self.scan(request, options).await;
      let mut current = baseline.clone();
      loop {
        if !diff(&baseline, &current, request).is_empty() {
          trace!(aggregate_timeout_ms = options.aggregate_timeout_ms, "change detected, aggregating");
          tokio::time::sleep(Duration::from_millis(options.aggregate_timeout_ms)).await;
          let settled = self.scan(request, options).await;
          return Ok(diff(&baseline, &settled, request));
        }
        tokio::time::sleep(interval).await;
        current = self.scan(request, options).await;
      }
    })
  }
}

fn diff(baseline: &Snapshot, current: &Snapshot, request: &WatchRequest) -> WatchChanges {
  let mut changes = WatchChanges::default();
  for (path, now) in current {
    let before = baseline.get(path).copied().flatten();
    match (before, now) {
      (Some(before), Some(now)) => {
        if now.modified_ms > before.modified_ms || now.modified_ms > request.start_time {
          changes.changed.push(path.clone());
        }
      }
      (None, Some(_)) => changes.changed.push(path.clone()),
      (Some(_), None) => changes.removed.push(path.clone()),
      (None, None) => {}
    }
    if let Some(now) = now {
      let map = if request.contexts.contains(path) {
        &mut changes.context_timestamps
      } else {
        &mut changes.file_timestamps
      };
      map.insert(path.clone(), now.modified_ms);
    }
  }
  changes
}
