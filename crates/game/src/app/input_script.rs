use std::fs;
use std::path::{Path, PathBuf};

use engine::{InputCollector, InputFeed, Key};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub(crate) enum InputScriptError {
    #[error("failed to read input script {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parse input script: {message}")]
    Parse { message: String },
    #[error("parse input script at {path}: {message}")]
    ParseAt { path: String, message: String },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct InputScriptFile {
    segments: Vec<Segment>,
    #[serde(default)]
    quit: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
struct Segment {
    ticks: u64,
    #[serde(default)]
    keys: Vec<Key>,
}

/// Key timeline for headless runs. Each segment holds its keys for
/// `ticks` ticks; once the timeline ends every key is released and, if
/// `quit` is set, quit is requested.
#[derive(Debug, Clone)]
pub(crate) struct ScriptedInput {
    segments: Vec<Segment>,
    quit_at_end: bool,
    active_segment: Option<usize>,
}

impl ScriptedInput {
    pub(crate) fn load(path: &Path) -> Result<Self, InputScriptError> {
        let raw = fs::read_to_string(path).map_err(|source| InputScriptError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse_json(&raw)
    }

    pub(crate) fn parse_json(raw: &str) -> Result<Self, InputScriptError> {
        let mut deserializer = serde_json::Deserializer::from_str(raw);
        let file = match serde_path_to_error::deserialize::<_, InputScriptFile>(&mut deserializer)
        {
            Ok(file) => file,
            Err(error) => {
                let path = error.path().to_string();
                let message = error.into_inner().to_string();
                if path.is_empty() || path == "." {
                    return Err(InputScriptError::Parse { message });
                }
                return Err(InputScriptError::ParseAt { path, message });
            }
        };
        Ok(Self {
            segments: file.segments,
            quit_at_end: file.quit,
            active_segment: None,
        })
    }

    pub(crate) fn total_ticks(&self) -> u64 {
        self.segments
            .iter()
            .fold(0u64, |total, segment| total.saturating_add(segment.ticks))
    }

    fn segment_at(&self, tick: u64) -> Option<usize> {
        let mut end = 0u64;
        for (index, segment) in self.segments.iter().enumerate() {
            end = end.saturating_add(segment.ticks);
            if tick < end {
                return Some(index);
            }
        }
        None
    }
}

impl InputFeed for ScriptedInput {
    fn feed(&mut self, tick: u64, input: &mut InputCollector) {
        let segment = self.segment_at(tick);
        if segment == self.active_segment && tick > 0 {
            return;
        }
        self.active_segment = segment;

        input.release_all();
        match segment {
            Some(index) => {
                let keys = &self.segments[index].keys;
                debug!(tick, segment = index, keys = ?keys, "input_segment");
                for key in keys {
                    input.handle_key(*key, true);
                }
            }
            None => {
                debug!(tick, quit = self.quit_at_end, "input_script_finished");
                if self.quit_at_end {
                    input.mark_quit_requested();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn script(value: serde_json::Value) -> ScriptedInput {
        ScriptedInput::parse_json(&value.to_string()).expect("parse")
    }

    #[test]
    fn segments_hold_keys_for_their_tick_count() {
        let mut feed = script(json!({
            "segments": [
                { "ticks": 2, "keys": ["w", "ArrowRight"] },
                { "ticks": 1, "keys": [] },
                { "ticks": 1, "keys": ["S"] }
            ]
        }));
        let mut input = InputCollector::new();
        let mut frames = Vec::new();
        for tick in 0..5 {
            feed.feed(tick, &mut input);
            let snapshot = input.snapshot_for_tick();
            frames.push(snapshot.pressed_keys().collect::<Vec<_>>());
        }

        assert_eq!(feed.total_ticks(), 4);
        assert_eq!(frames[0], vec![Key::W, Key::Right]);
        assert_eq!(frames[1], vec![Key::W, Key::Right]);
        assert!(frames[2].is_empty());
        assert_eq!(frames[3], vec![Key::S]);
        assert!(frames[4].is_empty());
        assert!(!input.quit_requested());
    }

    #[test]
    fn quit_flag_requests_quit_after_last_segment() {
        let mut feed = script(json!({
            "segments": [{ "ticks": 1, "keys": ["D"] }],
            "quit": true
        }));
        let mut input = InputCollector::new();

        feed.feed(0, &mut input);
        assert!(!input.quit_requested());
        feed.feed(1, &mut input);
        assert!(input.quit_requested());
    }

    #[test]
    fn unknown_key_reports_path() {
        let error = ScriptedInput::parse_json(
            &json!({ "segments": [{ "ticks": 1, "keys": ["W", "F13"] }] }).to_string(),
        )
        .expect_err("unknown key");
        let text = error.to_string();
        assert!(text.contains("segments[0].keys[1]"), "{text}");
        assert!(text.contains("F13"), "{text}");
    }

    #[test]
    fn missing_segments_is_rejected() {
        let error = ScriptedInput::parse_json("{}").expect_err("missing segments");
        assert!(error.to_string().contains("segments"));
    }

    #[test]
    fn load_reports_missing_file() {
        let error = ScriptedInput::load(Path::new("/definitely/not/here.json"))
            .expect_err("missing file");
        assert!(matches!(error, InputScriptError::Read { .. }));
    }
}
