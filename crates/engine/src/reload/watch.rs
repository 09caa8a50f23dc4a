use std::ffi::OsString;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver};

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::warn;

use super::hashing::{fingerprint_bytes, ContentFingerprint};
use super::types::ReloadError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    Unchanged,
    Changed {
        contents: String,
        fingerprint: ContentFingerprint,
    },
    /// Reported once when the file disappears; later polls stay `Unchanged`
    /// until it comes back.
    Missing,
}

/// Watches a single text file through OS file notifications.
///
/// The parent directory is watched rather than the file itself, so atomic
/// replace-by-rename and delete-then-recreate are both seen. Notifications
/// only trigger a read; the content fingerprint decides whether anything
/// changed, so a touch or an identical rewrite is not reported.
pub struct FileWatch {
    path: PathBuf,
    file_name: Option<OsString>,
    _watcher: RecommendedWatcher,
    events: Receiver<notify::Result<Event>>,
    read_pending: bool,
    last_fingerprint: Option<ContentFingerprint>,
    missing: bool,
}

impl fmt::Debug for FileWatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileWatch")
            .field("path", &self.path)
            .field("read_pending", &self.read_pending)
            .field("missing", &self.missing)
            .finish_non_exhaustive()
    }
}

impl FileWatch {
    /// Starts watching. The parent directory of `path` must exist; the file
    /// itself may not yet.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, ReloadError> {
        let path = path.into();
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let (tx, events) = channel();
        let mut watcher = notify::recommended_watcher(move |res| {
            let _ = tx.send(res);
        })
        .map_err(|source| ReloadError::Watch {
            path: dir.clone(),
            source,
        })?;
        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .map_err(|source| ReloadError::Watch {
                path: dir.clone(),
                source,
            })?;

        Ok(Self {
            file_name: path.file_name().map(OsString::from),
            path,
            _watcher: watcher,
            events,
            read_pending: true,
            last_fingerprint: None,
            missing: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Records `contents` as already applied so only later edits are
    /// reported.
    pub fn mark_seen(&mut self, contents: &str) -> ContentFingerprint {
        let fingerprint = fingerprint_bytes(contents.as_bytes());
        self.last_fingerprint = Some(fingerprint.clone());
        self.read_pending = false;
        self.missing = false;
        fingerprint
    }

    /// Drains queued notifications without blocking and reads the file only
    /// when one of them concerns it.
    pub fn poll(&mut self) -> Result<WatchEvent, ReloadError> {
        if self.drain_events() {
            self.read_pending = true;
        }
        if !self.read_pending {
            return Ok(WatchEvent::Unchanged);
        }
        self.check()
    }

    /// Reads and fingerprints the file now, whatever the notifications say.
    pub fn check(&mut self) -> Result<WatchEvent, ReloadError> {
        self.read_pending = false;
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                if self.missing {
                    return Ok(WatchEvent::Unchanged);
                }
                self.missing = true;
                return Ok(WatchEvent::Missing);
            }
            Err(source) => {
                return Err(ReloadError::ReadFile {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        self.missing = false;

        let fingerprint = fingerprint_bytes(&bytes);
        if self.last_fingerprint.as_ref() == Some(&fingerprint) {
            return Ok(WatchEvent::Unchanged);
        }

        // Recorded before decoding so a bad file is reported once per edit.
        self.last_fingerprint = Some(fingerprint.clone());
        let contents = String::from_utf8(bytes).map_err(|_| ReloadError::NotUtf8 {
            path: self.path.clone(),
        })?;
        Ok(WatchEvent::Changed {
            contents,
            fingerprint,
        })
    }

    fn drain_events(&mut self) -> bool {
        let mut touched = false;
        while let Ok(event) = self.events.try_recv() {
            match event {
                Ok(event) => {
                    touched |= is_content_event(&event.kind)
                        && event.paths.iter().any(|path| self.is_watched_file(path));
                }
                Err(error) => {
                    // Notifications may have been lost; fall back to a read.
                    warn!(path = %self.path.display(), error = %error, "file_watch_error");
                    touched = true;
                }
            }
        }
        touched
    }

    fn is_watched_file(&self, path: &Path) -> bool {
        self.file_name.is_some() && path.file_name() == self.file_name.as_deref()
    }
}

fn is_content_event(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Any | EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    )
}

#[cfg(test)]
mod tests {
    use std::thread;
    use std::time::{Duration, Instant};

    use tempfile::TempDir;

    use super::*;

    fn poll_until_reported(watch: &mut FileWatch) -> WatchEvent {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            let event = watch.poll().expect("poll");
            if event != WatchEvent::Unchanged || Instant::now() >= deadline {
                return event;
            }
            thread::sleep(Duration::from_millis(20));
        }
    }

    fn assert_quiet_for(watch: &mut FileWatch, window: Duration) {
        let deadline = Instant::now() + window;
        while Instant::now() < deadline {
            assert_eq!(watch.poll().expect("poll"), WatchEvent::Unchanged);
            thread::sleep(Duration::from_millis(20));
        }
    }

    #[test]
    fn first_poll_reports_existing_content() {
        let temp = TempDir::new().expect("tempdir");
        let path = temp.path().join("behavior.json");
        fs::write(&path, "{}").expect("write");

        let mut watch = FileWatch::new(&path).expect("watch");
        match watch.poll().expect("poll") {
            WatchEvent::Changed { contents, .. } => assert_eq!(contents, "{}"),
            other => panic!("expected change, got {other:?}"),
        }
        assert_eq!(watch.poll().expect("poll"), WatchEvent::Unchanged);
    }

    #[test]
    fn edit_arrives_as_notification() {
        let temp = TempDir::new().expect("tempdir");
        let path = temp.path().join("behavior.json");
        fs::write(&path, "{\"a\":1}").expect("write");

        let mut watch = FileWatch::new(&path).expect("watch");
        watch.mark_seen("{\"a\":1}");
        assert_eq!(watch.poll().expect("poll"), WatchEvent::Unchanged);

        fs::write(&path, "{\"a\":2}").expect("edit");
        match poll_until_reported(&mut watch) {
            WatchEvent::Changed { contents, .. } => assert_eq!(contents, "{\"a\":2}"),
            other => panic!("expected change, got {other:?}"),
        }
    }

    #[test]
    fn sibling_files_do_not_trigger_reads() {
        let temp = TempDir::new().expect("tempdir");
        let path = temp.path().join("behavior.json");
        fs::write(&path, "{}").expect("write");

        let mut watch = FileWatch::new(&path).expect("watch");
        watch.mark_seen("{}");
        fs::write(temp.path().join("other.json"), "{}").expect("sibling");
        thread::sleep(Duration::from_millis(100));
        assert!(!watch.drain_events());
    }

    #[test]
    fn rewrite_with_identical_bytes_is_not_a_change() {
        let temp = TempDir::new().expect("tempdir");
        let path = temp.path().join("behavior.json");
        fs::write(&path, "{\"a\":1}").expect("write");

        let mut watch = FileWatch::new(&path).expect("watch");
        watch.mark_seen("{\"a\":1}");
        fs::write(&path, "{\"a\":1}").expect("touch");
        assert_quiet_for(&mut watch, Duration::from_millis(300));

        fs::write(&path, "{\"a\":3}").expect("edit");
        assert!(matches!(
            poll_until_reported(&mut watch),
            WatchEvent::Changed { .. }
        ));
    }

    #[test]
    fn missing_is_reported_once_then_recovery_is_a_change() {
        let temp = TempDir::new().expect("tempdir");
        let path = temp.path().join("behavior.json");
        fs::write(&path, "{}").expect("write");

        let mut watch = FileWatch::new(&path).expect("watch");
        watch.mark_seen("{}");
        fs::remove_file(&path).expect("remove");
        assert_eq!(poll_until_reported(&mut watch), WatchEvent::Missing);
        assert_quiet_for(&mut watch, Duration::from_millis(100));

        fs::write(&path, "{ }").expect("restore");
        assert!(matches!(
            poll_until_reported(&mut watch),
            WatchEvent::Changed { .. }
        ));
    }

    #[test]
    fn non_utf8_content_is_an_error_once() {
        let temp = TempDir::new().expect("tempdir");
        let path = temp.path().join("behavior.json");
        fs::write(&path, [0xff, 0xfe, 0x00]).expect("write");

        let mut watch = FileWatch::new(&path).expect("watch");
        let error = watch.poll().expect_err("should fail");
        assert!(matches!(error, ReloadError::NotUtf8 { .. }));
        assert_eq!(watch.check().expect("check"), WatchEvent::Unchanged);
    }

    #[test]
    fn missing_parent_directory_is_a_watch_error() {
        let temp = TempDir::new().expect("tempdir");
        let path = temp.path().join("absent").join("behavior.json");
        let error = FileWatch::new(&path).err().expect("watch error");
        assert!(matches!(error, ReloadError::Watch { .. }));
    }
}
