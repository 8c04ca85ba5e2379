//! Persistence Collaborator
//!
//! Durability is not correctness: the arena hands finished matches and skill
//! updates to a recorder and carries on whatever it answers. Failures are
//! logged and dropped.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;
use std::thread::JoinHandle;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::game::outcome::MatchResult;
use crate::game::state::{AgentId, SharedSnapshot, Snapshot};
use crate::rating::ladder::SkillRecord;

/// Recorder errors.
#[derive(Debug, thiserror::Error)]
pub enum RecorderError {
    /// Underlying file failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Record could not be encoded.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Writer lock poisoned by a panicking writer.
    #[error("recorder lock poisoned")]
    Poisoned,

    /// The recorder was closed or its writer stopped.
    #[error("recorder closed")]
    Closed,
}

/// Sink for finished matches and rating changes.
pub trait MatchRecorder: Send + Sync {
    /// Store a finished match with its full snapshot history.
    fn record_match(&self, result: &MatchResult, history: &[SharedSnapshot]) -> Result<(), RecorderError>;

    /// Store an agent's new skill record.
    fn record_skill_update(&self, agent_id: AgentId, record: &SkillRecord) -> Result<(), RecorderError>;
}

/// Hand a match to `recorder`, logging instead of failing.
pub fn report_match(recorder: &dyn MatchRecorder, result: &MatchResult, history: &[SharedSnapshot]) {
    if let Err(e) = recorder.record_match(result, history) {
        warn!(match_id = %result.match_id, error = %e, "Failed to record match, continuing");
    }
}

/// Hand a skill update to `recorder`, logging instead of failing.
pub fn report_skill_update(recorder: &dyn MatchRecorder, agent_id: AgentId, record: &SkillRecord) {
    if let Err(e) = recorder.record_skill_update(agent_id, record) {
        warn!(agent = %agent_id, error = %e, "Failed to record skill update, continuing");
    }
}

// =============================================================================
// NULL RECORDER
// =============================================================================

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullRecorder;

impl MatchRecorder for NullRecorder {
    fn record_match(&self, _result: &MatchResult, _history: &[SharedSnapshot]) -> Result<(), RecorderError> {
        Ok(())
    }

    fn record_skill_update(&self, _agent_id: AgentId, _record: &SkillRecord) -> Result<(), RecorderError> {
        Ok(())
    }
}

// =============================================================================
// JSON LINES RECORDER
// =============================================================================

#[derive(Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum RecordLine<'a> {
    Match {
        recorded_at: DateTime<Utc>,
        result: &'a MatchResult,
        history: Vec<&'a Snapshot>,
    },
    SkillUpdate {
        recorded_at: DateTime<Utc>,
        agent_id: String,
        record: &'a SkillRecord,
    },
}

/// Appends one JSON object per line to a file.
///
/// Callers only encode the line; a dedicated writer thread owns the file, so
/// recording never blocks an async task or a lock holder on disk I/O.
pub struct JsonlRecorder {
    lines: Mutex<Option<mpsc::UnboundedSender<String>>>,
    writer: Mutex<Option<JoinHandle<()>>>,
}

impl JsonlRecorder {
    /// Open `path` for appending, creating it if needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, RecorderError> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let (tx, rx) = mpsc::unbounded_channel();
        let writer = std::thread::Builder::new()
            .name("jsonl-recorder".into())
            .spawn(move || write_lines(BufWriter::new(file), rx))?;
        Ok(Self {
            lines: Mutex::new(Some(tx)),
            writer: Mutex::new(Some(writer)),
        })
    }

    /// Stop accepting records and wait until every queued line is on disk.
    ///
    /// Blocks; from async code call it through `spawn_blocking`.
    pub fn close(&self) -> Result<(), RecorderError> {
        self.lines.lock().map_err(|_| RecorderError::Poisoned)?.take();
        let writer = self.writer.lock().map_err(|_| RecorderError::Poisoned)?.take();
        if let Some(writer) = writer {
            writer.join().map_err(|_| RecorderError::Closed)?;
        }
        Ok(())
    }

    fn send_line(&self, line: &RecordLine<'_>) -> Result<(), RecorderError> {
        let encoded = serde_json::to_string(line)?;
        let lines = self.lines.lock().map_err(|_| RecorderError::Poisoned)?;
        lines
            .as_ref()
            .ok_or(RecorderError::Closed)?
            .send(encoded)
            .map_err(|_| RecorderError::Closed)
    }
}

fn write_lines(mut writer: BufWriter<File>, mut lines: mpsc::UnboundedReceiver<String>) {
    while let Some(line) = lines.blocking_recv() {
        let written = writer
            .write_all(line.as_bytes())
            .and_then(|_| writer.write_all(b"\n"))
            .and_then(|_| writer.flush());
        if let Err(e) = written {
            warn!(error = %e, "Failed to write record line, continuing");
        }
    }
    debug!("Record writer stopped");
}

impl MatchRecorder for JsonlRecorder {
    fn record_match(&self, result: &MatchResult, history: &[SharedSnapshot]) -> Result<(), RecorderError> {
        self.send_line(&RecordLine::Match {
            recorded_at: Utc::now(),
            result,
            history: history.iter().map(|s| s.as_ref()).collect(),
        })
    }

    fn record_skill_update(&self, agent_id: AgentId, record: &SkillRecord) -> Result<(), RecorderError> {
        self.send_line(&RecordLine::SkillUpdate {
            recorded_at: Utc::now(),
            agent_id: agent_id.to_uuid_string(),
            record,
        })
    }
}

// =============================================================================
// IN-MEMORY RECORDER
// =============================================================================

/// Keeps results and skill updates in memory.
#[derive(Debug, Default)]
pub struct MemoryRecorder {
    matches: Mutex<Vec<MatchResult>>,
    skill_updates: Mutex<Vec<(AgentId, SkillRecord)>>,
}

impl MemoryRecorder {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Results recorded so far.
    pub fn matches(&self) -> Vec<MatchResult> {
        self.matches.lock().map(|m| m.clone()).unwrap_or_default()
    }

    /// Skill updates recorded so far.
    pub fn skill_updates(&self) -> Vec<(AgentId, SkillRecord)> {
        self.skill_updates.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl MatchRecorder for MemoryRecorder {
    fn record_match(&self, result: &MatchResult, _history: &[SharedSnapshot]) -> Result<(), RecorderError> {
        self.matches
            .lock()
            .map_err(|_| RecorderError::Poisoned)?
            .push(result.clone());
        Ok(())
    }

    fn record_skill_update(&self, agent_id: AgentId, record: &SkillRecord) -> Result<(), RecorderError> {
        self.skill_updates
            .lock()
            .map_err(|_| RecorderError::Poisoned)?
            .push((agent_id, record.clone()));
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::game::outcome::TerminationReason;
    use crate::game::state::MatchId;

    struct BrokenRecorder;

    impl MatchRecorder for BrokenRecorder {
        fn record_match(&self, _result: &MatchResult, _history: &[SharedSnapshot]) -> Result<(), RecorderError> {
            Err(std::io::Error::new(std::io::ErrorKind::Other, "disk gone").into())
        }

        fn record_skill_update(&self, _agent_id: AgentId, _record: &SkillRecord) -> Result<(), RecorderError> {
            Err(RecorderError::Poisoned)
        }
    }

    fn empty_result() -> MatchResult {
        MatchResult {
            match_id: MatchId::new([1; 16]),
            rng_seed: 1,
            participants: vec![],
            ticks_played: 3,
            termination: TerminationReason::AllDead,
            final_hash: [0; 32],
        }
    }

    #[test]
    fn test_report_swallows_failures() {
        // Must not panic or propagate
        report_match(&BrokenRecorder, &empty_result(), &[]);
        report_skill_update(&BrokenRecorder, AgentId::new([2; 16]), &SkillRecord::new(
            AgentId::new([2; 16]),
            crate::rating::Rating::new(1500.0, 0.0),
        ));
    }

    #[test]
    fn test_memory_recorder_keeps_results() {
        let recorder = MemoryRecorder::new();
        report_match(&recorder, &empty_result(), &[]);
        assert_eq!(recorder.matches().len(), 1);
        assert_eq!(recorder.matches()[0].ticks_played, 3);
    }

    #[test]
    fn test_jsonl_recorder_appends_lines() {
        let path = std::env::temp_dir().join(format!("snake-arena-{}.jsonl", uuid::Uuid::new_v4()));
        let recorder = JsonlRecorder::open(&path).unwrap();
        recorder.record_match(&empty_result(), &[]).unwrap();
        recorder
            .record_skill_update(
                AgentId::new([2; 16]),
                &SkillRecord::new(AgentId::new([2; 16]), crate::rating::Rating::new(25.0, 8.3)),
            )
            .unwrap();
        recorder.close().unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["kind"], "match");
        let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["kind"], "skill_update");
        assert!(matches!(recorder.record_match(&empty_result(), &[]), Err(RecorderError::Closed)));

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_jsonl_recorder_from_async_ladder() {
        use crate::rating::{Ladder, RatingModel};

        let path = std::env::temp_dir().join(format!("snake-arena-{}.jsonl", uuid::Uuid::new_v4()));
        let recorder = Arc::new(JsonlRecorder::open(&path).unwrap());
        let ladder = Ladder::with_recorder(RatingModel::default().build(), recorder.clone());
        for n in 1..=3u8 {
            ladder.register_entrant(AgentId::new([n; 16])).await.unwrap();
            ladder.promote(AgentId::new([n; 16]), usize::from(n)).await.unwrap();
        }

        let closing = recorder.clone();
        tokio::task::spawn_blocking(move || closing.close()).await.unwrap().unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 3);
        let _ = std::fs::remove_file(&path);
    }
}
