//! Per-session transcripts under `<KIN_HOME>/logs/session/`, one JSON file
//! per session, plus the `MessageObserver` that keeps the active session's
//! file current as the loop appends messages.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use kin_config::Paths;
use kin_core::{AgentStats, Message};
use kin_runtime::MessageObserver;
use serde::{Deserialize, Serialize};

/// One session's on-disk transcript: the messages in append order plus the
/// latest stats snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    /// The id the transcript file is named after.
    pub session_id: String,
    /// Messages in append order, re-notification duplicates removed.
    pub messages: Vec<Message>,
    /// Stats as of the last completed turn.
    pub stats: AgentStats,
    /// When this record was last written.
    pub updated_at: DateTime<Utc>,
}

/// Lists, loads, and names transcript files.
pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    /// Open (creating if needed) the session-log directory.
    pub fn new(paths: &Paths) -> Result<Self> {
        let dir = paths.session_logs_dir();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("creating {}", dir.display()))?;
        Ok(Self { dir })
    }

    fn path_for(&self, session_id: &str) -> PathBuf {
        self.dir.join(format!("{session_id}.json"))
    }

    /// Load the transcript for `session_id`.
    pub fn load(&self, session_id: &str) -> Result<SessionRecord> {
        let path = self.path_for(session_id);
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("no session {session_id} at {}", path.display()))?;
        serde_json::from_str(&content).with_context(|| format!("parsing {}", path.display()))
    }

    /// The most recently written transcript, if any sessions exist.
    pub fn most_recent(&self) -> Result<Option<SessionRecord>> {
        let mut newest: Option<(std::time::SystemTime, PathBuf)> = None;
        for entry in std::fs::read_dir(&self.dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().is_none_or(|e| e != "json") {
                continue;
            }
            let modified = entry.metadata()?.modified()?;
            if newest.as_ref().is_none_or(|(t, _)| modified > *t) {
                newest = Some((modified, path));
            }
        }
        let Some((_, path)) = newest else { return Ok(None) };
        let content = std::fs::read_to_string(&path)?;
        let record =
            serde_json::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;
        Ok(Some(record))
    }
}

/// Keeps one session's transcript file current. Appends are deduplicated
/// by message id: the loop re-notifies the whole history after a reload or
/// compaction (it is position-indexed, not delta-indexed), and a transcript
/// should record each message once.
pub struct TranscriptWriter {
    path: PathBuf,
    state: Mutex<WriterState>,
}

struct WriterState {
    record: SessionRecord,
    seen: HashSet<String>,
}

impl TranscriptWriter {
    /// Start (or re-open) the transcript for `session_id`.
    #[must_use]
    pub fn new(store: &SessionStore, session_id: &str) -> Self {
        Self {
            path: store.path_for(session_id),
            state: Mutex::new(WriterState {
                record: SessionRecord {
                    session_id: session_id.to_string(),
                    messages: Vec::new(),
                    stats: AgentStats::default(),
                    updated_at: Utc::now(),
                },
                seen: HashSet::new(),
            }),
        }
    }

    /// Record the loop's current stats alongside the messages.
    pub fn snapshot_stats(&self, stats: &AgentStats) {
        let mut state = self.state.lock().expect("transcript lock");
        state.record.stats = stats.clone();
        write_record(&self.path, &mut state.record);
    }
}

fn write_record(path: &Path, record: &mut SessionRecord) {
    record.updated_at = Utc::now();
    match serde_json::to_string_pretty(record) {
        Ok(text) => {
            if let Err(e) = std::fs::write(path, text) {
                tracing::warn!(path = %path.display(), error = %e, "failed to write session transcript");
            }
        }
        Err(e) => tracing::warn!(error = %e, "failed to serialize session transcript"),
    }
}

impl MessageObserver for TranscriptWriter {
    fn on_message(&self, msg: &Message) {
        let mut state = self.state.lock().expect("transcript lock");
        if !state.seen.insert(msg.id.clone()) {
            return;
        }
        state.record.messages.push(msg.clone());
        write_record(&self.path, &mut state.record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_in(dir: &Path) -> SessionStore {
        let paths = Paths::resolve(Some(dir.to_path_buf())).unwrap();
        SessionStore::new(&paths).unwrap()
    }

    #[test]
    fn transcript_round_trips_through_the_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        let writer = TranscriptWriter::new(&store, "abc");
        writer.on_message(&Message::system("sys"));
        writer.on_message(&Message::user("hi"));

        let record = store.load("abc").unwrap();
        assert_eq!(record.messages.len(), 2);
        assert_eq!(record.messages[1].content.as_deref(), Some("hi"));
    }

    #[test]
    fn renotified_messages_are_recorded_once() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        let writer = TranscriptWriter::new(&store, "abc");
        let msg = Message::user("hi");
        writer.on_message(&msg);
        writer.on_message(&msg);

        let record = store.load("abc").unwrap();
        assert_eq!(record.messages.len(), 1);
    }

    #[test]
    fn most_recent_picks_the_newest_transcript() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        TranscriptWriter::new(&store, "old").on_message(&Message::user("first"));
        std::thread::sleep(std::time::Duration::from_millis(20));
        TranscriptWriter::new(&store, "new").on_message(&Message::user("second"));

        let record = store.most_recent().unwrap().unwrap();
        assert_eq!(record.session_id, "new");
    }

    #[test]
    fn empty_store_has_no_most_recent() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        assert!(store.most_recent().unwrap().is_none());
    }
}
