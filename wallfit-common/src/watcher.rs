use std::path::{Path, PathBuf};
use std::time::Duration;
use notify_debouncer_mini::notify::{RecommendedWatcher, RecursiveMode, Watcher};
use notify_debouncer_mini::{new_debouncer, DebounceEventResult, DebouncedEvent, Debouncer};
use crate::catalog::is_supported;
use crate::error::{WallfitError, CatalogError};
use crate::Result;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Watches the image directory and reports when supported images appear,
/// change or disappear. Dropping the watcher stops it.
pub struct DirectoryWatcher {
    directory: PathBuf,
    _debouncer: Debouncer<RecommendedWatcher>,
}

impl DirectoryWatcher {
    /// `on_change` runs on the watcher thread with the number of relevant
    /// paths in the debounced batch. With `recursive`, a subdirectory moved in
    /// or out of the tree counts too, since it may carry images.
    pub fn start<F>(directory: &Path, recursive: bool, debounce: Duration, on_change: F) -> Result<Self>
    where
        F: Fn(usize) + Send + 'static,
    {
        let watch_error = |e: notify_debouncer_mini::notify::Error| {
            WallfitError::Catalog(CatalogError::DirectoryRead {
                path: directory.to_path_buf(),
                source: std::io::Error::other(e.to_string()),
            })
        };

        let root = directory.to_path_buf();
        let mut debouncer = new_debouncer(debounce, move |res: DebounceEventResult| match res {
            Ok(events) => {
                let relevant = relevant_events(&events, &root, recursive);
                if relevant > 0 {
                    log::debug!("Directory change: {} image path(s) affected", relevant);
                    on_change(relevant);
                }
            }
            Err(e) => log::warn!("File watcher error: {}", e),
        })
        .map_err(watch_error)?;

        let mode = if recursive { RecursiveMode::Recursive } else { RecursiveMode::NonRecursive };
        debouncer.watcher().watch(directory, mode).map_err(watch_error)?;

        log::info!("Watching {:?} for image changes", directory);
        Ok(Self {
            directory: directory.to_path_buf(),
            _debouncer: debouncer,
        })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }
}

fn relevant_events(events: &[DebouncedEvent], root: &Path, recursive: bool) -> usize {
    events
        .iter()
        .filter(|event| event.path != root)
        .filter(|event| is_supported(&event.path) || (recursive && may_be_directory(&event.path)))
        .count()
}

// A removed directory no longer answers `is_dir`, so extension-less paths
// count as well.
fn may_be_directory(path: &Path) -> bool {
    path.is_dir() || path.extension().is_none()
}
