use crate::file_scanner::is_skip_file;
use anyhow::Result;
use notify::event::{EventKind, ModifyKind};
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{Receiver, TryRecvError, channel};
use std::time::{Duration, Instant};

pub const REFRESH_DEBOUNCE: Duration = Duration::from_millis(300);

/// What a batch of filesystem events means for the file list.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct FolderActivity {
    pub new_files: Vec<PathBuf>,
    pub refresh: bool,
}

/// Relevant file paths of one event, or nothing for events we do not care about.
fn relevant_paths(event: &Event) -> Vec<PathBuf> {
    match event.kind {
        EventKind::Create(_) | EventKind::Remove(_) | EventKind::Modify(_) => {}
        _ => return Vec::new(),
    }
    if matches!(event.kind, EventKind::Modify(ModifyKind::Metadata(_))) {
        return Vec::new();
    }
    event
        .paths
        .iter()
        .filter(|p| {
            p.file_name()
                .map(|n| !is_skip_file(&n.to_string_lossy()))
                .unwrap_or(false)
        })
        .cloned()
        .collect()
}

/// Coalesces bursts of events into a single refresh.
#[derive(Debug, Default)]
pub struct Debounce {
    due: Option<Instant>,
}

impl Debounce {
    pub fn touch(&mut self, now: Instant) {
        self.due = Some(now + REFRESH_DEBOUNCE);
    }

    pub fn fire(&mut self, now: Instant) -> bool {
        match self.due {
            Some(at) if now >= at => {
                self.due = None;
                true
            }
            _ => false,
        }
    }
}

/// Non-recursive watch over one input folder.
pub struct FolderWatcher {
    _watcher: RecommendedWatcher,
    rx: Receiver<notify::Result<Event>>,
    debounce: Debounce,
    path: PathBuf,
}

impl FolderWatcher {
    pub fn watch(dir: &Path) -> Result<Self> {
        let (tx, rx) = channel();
        let mut watcher: RecommendedWatcher = Watcher::new(
            tx,
            notify::Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;
        watcher.watch(dir, RecursiveMode::NonRecursive)?;
        tracing::debug!("watching {}", dir.display());
        Ok(FolderWatcher {
            _watcher: watcher,
            rx,
            debounce: Debounce::default(),
            path: dir.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Drains pending events without blocking.
    pub fn drain(&mut self, now: Instant) -> FolderActivity {
        let mut activity = FolderActivity::default();
        loop {
            match self.rx.try_recv() {
                Ok(Ok(event)) => {
                    let paths = relevant_paths(&event);
                    if paths.is_empty() {
                        continue;
                    }
                    if matches!(event.kind, EventKind::Create(_)) {
                        activity.new_files.extend(paths);
                    }
                    self.debounce.touch(now);
                }
                Ok(Err(e)) => tracing::warn!("watch error on {}: {}", self.path.display(), e),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        activity.refresh = self.debounce.fire(now);
        activity
    }
}
