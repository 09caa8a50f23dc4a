use std::path::{Path, PathBuf};

use engine::{FileWatch, ReloadError, WatchEvent};
use tracing::{error, info, warn};

use super::config::BehaviorConfig;

pub(crate) const DEFAULT_POLL_INTERVAL_TICKS: u64 = 30;

/// Drains file notifications for the behavior config on a tick cadence and
/// hands back a new, validated config when its content changes. Rejected
/// edits leave the caller's active config untouched.
#[derive(Debug)]
pub(crate) struct ConfigReloader {
    watch: FileWatch,
    poll_interval_ticks: u64,
    ticks_since_poll: u64,
}

impl ConfigReloader {
    /// `applied_contents` is the text the active config was parsed from; it
    /// is not reported again as a change.
    pub(crate) fn new(
        path: impl Into<PathBuf>,
        poll_interval_ticks: u64,
        applied_contents: Option<&str>,
    ) -> Result<Self, ReloadError> {
        let mut watch = FileWatch::new(path)?;
        if let Some(contents) = applied_contents {
            watch.mark_seen(contents);
        }
        Ok(Self {
            watch,
            poll_interval_ticks: poll_interval_ticks.max(1),
            ticks_since_poll: 0,
        })
    }

    pub(crate) fn path(&self) -> &Path {
        self.watch.path()
    }

    pub(crate) fn tick(&mut self) -> Option<BehaviorConfig> {
        self.ticks_since_poll = self.ticks_since_poll.saturating_add(1);
        if self.ticks_since_poll < self.poll_interval_ticks {
            return None;
        }
        self.ticks_since_poll = 0;
        let event = self.watch.poll();
        self.apply(event)
    }

    /// Reads the file immediately instead of waiting for a notification.
    #[cfg(test)]
    pub(crate) fn poll_now(&mut self) -> Option<BehaviorConfig> {
        let event = self.watch.check();
        self.apply(event)
    }

    fn apply(&self, event: Result<WatchEvent, ReloadError>) -> Option<BehaviorConfig> {
        let path = self.watch.path().display().to_string();
        match event {
            Ok(WatchEvent::Unchanged) => None,
            Ok(WatchEvent::Missing) => {
                warn!(path = %path, "config_missing; keeping active config");
                None
            }
            Ok(WatchEvent::Changed {
                contents,
                fingerprint,
            }) => match BehaviorConfig::parse_json(&contents) {
                Ok(config) => {
                    info!(
                        path = %path,
                        byte_len = fingerprint.byte_len,
                        sha256 = %fingerprint.hash_hex,
                        "config_change_detected"
                    );
                    Some(config)
                }
                Err(error) => {
                    error!(path = %path, error = %error, "config_reload_rejected");
                    None
                }
            },
            Err(error) => {
                warn!(error = %error, "config_poll_failed");
                None
            }
        }
    }
}
