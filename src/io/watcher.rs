use std::path::{Path, PathBuf};
use std::sync::mpsc;

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

/// Events pushed from the store watcher to consumers. In-memory case lists
/// are read caches; an event means the store changed underneath them and
/// they should reload.
#[derive(Debug)]
pub enum FeedEvent {
    /// One or more store files changed on disk.
    Changed(Vec<PathBuf>),
}

/// A push feed over the `tramita/` directory.
pub struct CaseFeed {
    _watcher: RecommendedWatcher,
    rx: mpsc::Receiver<FeedEvent>,
}

impl CaseFeed {
    /// Start watching the given `tramita/` directory.
    /// Returns a `CaseFeed` whose `poll()` method should be called each tick.
    pub fn start(tramita_dir: &Path) -> Result<Self, notify::Error> {
        let (tx, rx) = mpsc::channel();
        let tramita_dir_owned = tramita_dir.to_path_buf();

        let mut watcher = RecommendedWatcher::new(
            move |result: Result<Event, notify::Error>| {
                let event = match result {
                    Ok(e) => e,
                    Err(_) => return,
                };

                // We only care about creates, modifications, and removes of
                // case files, notifications.json, and config.toml
                match event.kind {
                    EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_) => {}
                    _ => return,
                }

                let relevant: Vec<PathBuf> = event
                    .paths
                    .into_iter()
                    .filter(|p| {
                        // Must be inside the tramita directory
                        if !p.starts_with(&tramita_dir_owned) {
                            return false;
                        }
                        // Skip session state and the recovery log
                        if let Some(name) = p.file_name().and_then(|n| n.to_str())
                            && (name == ".state.json" || name == ".recovery.log")
                        {
                            return false;
                        }
                        matches!(
                            p.extension().and_then(|e| e.to_str()),
                            Some("json") | Some("toml")
                        )
                    })
                    .collect();

                if !relevant.is_empty() {
                    let _ = tx.send(FeedEvent::Changed(relevant));
                }
            },
            Config::default(),
        )?;

        watcher.watch(tramita_dir, RecursiveMode::Recursive)?;
        Ok(CaseFeed {
            _watcher: watcher,
            rx,
        })
    }

    /// Non-blocking poll for pending feed events.
    /// Returns all queued events (may be empty).
    pub fn poll(&self) -> Vec<FeedEvent> {
        let mut events = Vec::new();
        while let Ok(evt) = self.rx.try_recv() {
            events.push(evt);
        }
        events
    }
}
