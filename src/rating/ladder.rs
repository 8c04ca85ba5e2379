//! Skill Ladder
//!
//! Owns every agent's skill record. Lock order is fixed:
//!
//! 1. `records` map (read for updates, write for replay/rollback)
//! 2. per-agent record mutexes, in ascending `AgentId` order
//! 3. `log`
//!
//! `claimed` reserves match ids. It is taken last and never held while
//! waiting on another lock.
//!
//! An update holds the map read lock for its whole duration, so replay and
//! rollback (which take the write lock) never interleave with one. Updates on
//! disjoint agents run in parallel.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use crate::arena::recorder::{MatchRecorder, NullRecorder, report_skill_update};
use crate::game::outcome::{MatchResult, Outcome, ParticipantResult};
use crate::game::state::{AgentId, MatchId};
use crate::rating::{Rating, RatingError, RatingSystem, SharedRatingSystem};

/// Where an agent stands on the ladder.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LadderStatus {
    /// Still in placement; not shown in the ranked view.
    Placing,
    /// Placed and ranked.
    Ranked,
}

/// Per-agent counters kept alongside the rating.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentStats {
    /// Matches won.
    pub wins: u32,
    /// Matches lost.
    pub losses: u32,
    /// Matches tied.
    pub ties: u32,
    /// Apples eaten across all rated matches.
    pub apples: u64,
    /// Rated matches played.
    pub games: u32,
}

impl AgentStats {
    fn record(&mut self, participant: &ParticipantResult) {
        match participant.outcome {
            Outcome::Won => self.wins += 1,
            Outcome::Lost => self.losses += 1,
            Outcome::Tied => self.ties += 1,
        }
        self.apples += u64::from(participant.score);
        self.games += 1;
    }
}

/// An agent's skill record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SkillRecord {
    /// Agent.
    pub agent_id: AgentId,
    /// Current rating.
    pub rating: Rating,
    /// Win/loss/tie counters.
    pub stats: AgentStats,
    /// Ladder status.
    pub status: LadderStatus,
    /// Rank assigned by placement, if placed.
    pub placed_rank: Option<usize>,
    /// Last match that changed this record.
    pub last_match: Option<MatchId>,
}

impl SkillRecord {
    /// Fresh record for an agent still in placement.
    pub fn new(agent_id: AgentId, rating: Rating) -> Self {
        Self {
            agent_id,
            rating,
            stats: AgentStats::default(),
            status: LadderStatus::Placing,
            placed_rank: None,
            last_match: None,
        }
    }

    fn apply(&mut self, rating: Rating, participant: &ParticipantResult, match_id: MatchId) {
        self.rating = rating;
        self.stats.record(participant);
        self.last_match = Some(match_id);
    }

    fn reset(&mut self, rating: Rating) {
        self.rating = rating;
        self.stats = AgentStats::default();
        self.last_match = None;
    }
}

/// One entry of the rating log.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RatedMatch {
    /// Match identity.
    pub match_id: MatchId,
    /// First participant (the side whose outcome drives the update).
    pub first: ParticipantResult,
    /// Second participant.
    pub second: ParticipantResult,
    /// When the update was applied.
    pub played_at: DateTime<Utc>,
}

impl RatedMatch {
    fn from_result(result: &MatchResult) -> Result<Self, RatingError> {
        let [first, second] = result.participants.as_slice() else {
            return Err(RatingError::ParticipantCount(result.participants.len()));
        };
        if first.agent_id == second.agent_id {
            return Err(RatingError::DuplicateAgent(first.agent_id));
        }
        Ok(Self {
            match_id: result.match_id,
            first: first.clone(),
            second: second.clone(),
            played_at: Utc::now(),
        })
    }
}

/// Apply one logged match to the two records it involves.
///
/// Shared by the live path and replay so both produce identical bits.
fn rate_records(system: &dyn RatingSystem, entry: &RatedMatch, first: &mut SkillRecord, second: &mut SkillRecord) {
    let (a, b) = system.rate_pair(first.rating, second.rating, entry.first.outcome);
    first.apply(a, &entry.first, entry.match_id);
    second.apply(b, &entry.second, entry.match_id);
}

/// The skill ladder.
pub struct Ladder {
    system: SharedRatingSystem,
    records: RwLock<BTreeMap<AgentId, Arc<Mutex<SkillRecord>>>>,
    claimed: Mutex<BTreeSet<MatchId>>,
    log: Mutex<Vec<RatedMatch>>,
    recorder: Arc<dyn MatchRecorder>,
}

impl Ladder {
    /// Empty ladder without persistence.
    pub fn new(system: SharedRatingSystem) -> Self {
        Self::with_recorder(system, Arc::new(NullRecorder))
    }

    /// Empty ladder reporting every skill change to `recorder`.
    pub fn with_recorder(system: SharedRatingSystem, recorder: Arc<dyn MatchRecorder>) -> Self {
        Self {
            system,
            records: RwLock::new(BTreeMap::new()),
            claimed: Mutex::new(BTreeSet::new()),
            log: Mutex::new(Vec::new()),
            recorder,
        }
    }

    /// Active rating model.
    pub fn system(&self) -> &dyn RatingSystem {
        self.system.as_ref()
    }

    /// Add an agent with the model's initial rating.
    pub async fn register(&self, agent_id: AgentId, status: LadderStatus) -> Result<SkillRecord, RatingError> {
        let mut records = self.records.write().await;
        if records.contains_key(&agent_id) {
            return Err(RatingError::DuplicateAgent(agent_id));
        }
        let mut record = SkillRecord::new(agent_id, self.system.initial_rating());
        record.status = status;
        records.insert(agent_id, Arc::new(Mutex::new(record.clone())));
        debug!(agent = %agent_id, ?status, "Agent registered");
        Ok(record)
    }

    /// Add an agent straight onto the ranked ladder.
    pub async fn register_ranked(&self, agent_id: AgentId) -> Result<SkillRecord, RatingError> {
        self.register(agent_id, LadderStatus::Ranked).await
    }

    /// Add an agent that still has to be placed.
    pub async fn register_entrant(&self, agent_id: AgentId) -> Result<SkillRecord, RatingError> {
        self.register(agent_id, LadderStatus::Placing).await
    }

    /// Mark a placed agent as ranked.
    pub async fn promote(&self, agent_id: AgentId, placed_rank: usize) -> Result<SkillRecord, RatingError> {
        let handle = self.handle(agent_id).await?;
        let mut record = handle.lock().await;
        record.status = LadderStatus::Ranked;
        record.placed_rank = Some(placed_rank);
        info!(
            agent = %agent_id,
            placed_rank,
            rating = %record.rating,
            "Agent promoted to ranked ladder"
        );
        let updated = record.clone();
        drop(record);
        report_skill_update(self.recorder.as_ref(), agent_id, &updated);
        Ok(updated)
    }

    /// Copy of one agent's record.
    pub async fn record(&self, agent_id: AgentId) -> Option<SkillRecord> {
        let handle = self.handle(agent_id).await.ok()?;
        let record = handle.lock().await;
        Some(record.clone())
    }

    /// Copies of every record, in agent id order.
    pub async fn records(&self) -> Vec<SkillRecord> {
        let records = self.records.read().await;
        let mut out = Vec::with_capacity(records.len());
        for handle in records.values() {
            out.push(handle.lock().await.clone());
        }
        out
    }

    /// Ranked agents, best first by conservative score, ties by id.
    pub async fn ranked_view(&self) -> Vec<SkillRecord> {
        let mut ranked: Vec<SkillRecord> = self
            .records()
            .await
            .into_iter()
            .filter(|r| r.status == LadderStatus::Ranked)
            .collect();
        ranked.sort_by(|a, b| self.compare(a, b));
        ranked
    }

    /// Ordering used by [`ranked_view`](Self::ranked_view).
    pub fn compare(&self, a: &SkillRecord, b: &SkillRecord) -> Ordering {
        let sa = self.system.conservative_score(&a.rating);
        let sb = self.system.conservative_score(&b.rating);
        sb.total_cmp(&sa).then_with(|| a.agent_id.cmp(&b.agent_id))
    }

    /// Rating log in application order.
    pub async fn history(&self) -> Vec<RatedMatch> {
        self.log.lock().await.clone()
    }

    /// Was this match already rated?
    pub async fn is_applied(&self, match_id: MatchId) -> bool {
        self.claimed.lock().await.contains(&match_id)
    }

    /// Rate a finished head-to-head match, at most once per match id.
    ///
    /// Returns the two updated records.
    pub async fn apply_result(&self, result: &MatchResult) -> Result<Vec<SkillRecord>, RatingError> {
        let entry = RatedMatch::from_result(result)?;

        if !self.claimed.lock().await.insert(entry.match_id) {
            return Err(RatingError::AlreadyApplied(entry.match_id));
        }

        let applied = self.apply_claimed(entry).await;
        if applied.is_err() {
            self.claimed.lock().await.remove(&result.match_id);
        }
        let updated = applied?;

        for record in &updated {
            info!(
                match_id = %result.match_id,
                agent = %record.agent_id,
                rating = %record.rating,
                score = self.system.conservative_score(&record.rating),
                "Rating updated"
            );
            report_skill_update(self.recorder.as_ref(), record.agent_id, record);
        }
        Ok(updated)
    }

    async fn apply_claimed(&self, entry: RatedMatch) -> Result<Vec<SkillRecord>, RatingError> {
        let records = self.records.read().await;
        let first = records
            .get(&entry.first.agent_id)
            .cloned()
            .ok_or(RatingError::UnknownAgent(entry.first.agent_id))?;
        let second = records
            .get(&entry.second.agent_id)
            .cloned()
            .ok_or(RatingError::UnknownAgent(entry.second.agent_id))?;

        // Ascending id order
        let (mut first, mut second) = if entry.first.agent_id < entry.second.agent_id {
            let f = first.lock().await;
            let s = second.lock().await;
            (f, s)
        } else {
            let s = second.lock().await;
            let f = first.lock().await;
            (f, s)
        };

        rate_records(self.system.as_ref(), &entry, &mut first, &mut second);
        let updated = vec![first.clone(), second.clone()];
        self.log.lock().await.push(entry);
        Ok(updated)
    }

    /// Reset every record and re-apply the whole log in order.
    pub async fn replay_from_reset(&self) -> Result<Vec<SkillRecord>, RatingError> {
        let records = self.records.write().await;
        let log = self.log.lock().await;
        let rebuilt = self.rebuild(&records, &log).await?;
        info!(matches = log.len(), agents = rebuilt.len(), "Ratings replayed from reset");
        Ok(rebuilt)
    }

    /// Undo one match: drop it from the log, reset everyone, replay the rest.
    ///
    /// Every agent is reset, not just the two involved, since the change
    /// propagates through everyone they played afterwards.
    pub async fn rollback(&self, match_id: MatchId) -> Result<RatedMatch, RatingError> {
        let records = self.records.write().await;
        let mut log = self.log.lock().await;
        let pos = log
            .iter()
            .position(|m| m.match_id == match_id)
            .ok_or(RatingError::UnknownMatch(match_id))?;
        let removed = log.remove(pos);
        self.claimed.lock().await.remove(&match_id);

        let rebuilt = self.rebuild(&records, &log).await?;
        info!(match_id = %match_id, remaining = log.len(), "Match rolled back");
        for record in &rebuilt {
            report_skill_update(self.recorder.as_ref(), record.agent_id, record);
        }
        Ok(removed)
    }

    async fn rebuild(
        &self,
        records: &BTreeMap<AgentId, Arc<Mutex<SkillRecord>>>,
        log: &[RatedMatch],
    ) -> Result<Vec<SkillRecord>, RatingError> {
        // Work on copies so a bad log leaves the live records untouched
        let mut scratch: BTreeMap<AgentId, SkillRecord> = BTreeMap::new();
        for (id, handle) in records {
            let mut record = handle.lock().await.clone();
            record.reset(self.system.initial_rating());
            scratch.insert(*id, record);
        }

        for entry in log {
            let mut first = scratch
                .remove(&entry.first.agent_id)
                .ok_or(RatingError::UnknownAgent(entry.first.agent_id))?;
            let Some(mut second) = scratch.remove(&entry.second.agent_id) else {
                return Err(RatingError::UnknownAgent(entry.second.agent_id));
            };
            rate_records(self.system.as_ref(), entry, &mut first, &mut second);
            scratch.insert(first.agent_id, first);
            scratch.insert(second.agent_id, second);
        }

        for (id, handle) in records {
            if let Some(record) = scratch.get(id) {
                *handle.lock().await = record.clone();
            }
        }
        Ok(scratch.into_values().collect())
    }

    async fn handle(&self, agent_id: AgentId) -> Result<Arc<Mutex<SkillRecord>>, RatingError> {
        self.records
            .read()
            .await
            .get(&agent_id)
            .cloned()
            .ok_or(RatingError::UnknownAgent(agent_id))
    }
}
