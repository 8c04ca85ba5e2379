//! Snake Arena
//!
//! Seeds a small ladder, plays a round-robin to spread the ratings, places a
//! new entrant and prints the standings.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use snake_arena::{
    VERSION,
    arena::{
        agent::{Agent, AgentHandle, CautiousAgent, RandomAgent},
        recorder::{JsonlRecorder, MatchRecorder, NullRecorder},
        run_match,
    },
    config::ArenaConfig,
    game::{AgentId, MatchId},
    placement::{ArenaHost, run_placement},
    proof::verify_transcript,
    rating::Ladder,
};

const LADDER_SIZE: u8 = 6;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("failed to set tracing subscriber")?;

    let config = ArenaConfig::from_env().context("invalid configuration")?;
    info!("Snake Arena v{}", VERSION);
    info!(
        "Board {}x{}, {} apples, {} ticks max, rating model {}",
        config.match_config.width,
        config.match_config.height,
        config.match_config.apple_target,
        config.match_config.max_ticks,
        config.rating.name()
    );

    let jsonl = match &config.record_path {
        Some(path) => match JsonlRecorder::open(path) {
            Ok(recorder) => Some(Arc::new(recorder)),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Cannot open record file, persistence disabled");
                None
            }
        },
        None => None,
    };
    let recorder: Arc<dyn MatchRecorder> = match &jsonl {
        Some(jsonl) => jsonl.clone(),
        None => Arc::new(NullRecorder),
    };

    // Cautious agents on the ladder, one random agent to place
    let mut agents: BTreeMap<AgentId, AgentHandle> = BTreeMap::new();
    for i in 0..LADDER_SIZE {
        let agent: AgentHandle = Arc::new(CautiousAgent::new(format!("cautious-{i}"), u64::from(i) + 1));
        agents.insert(AgentId::random(), agent);
    }
    let entrant = AgentId::random();
    agents.insert(entrant, Arc::new(RandomAgent::new("random-entrant", 99)));

    let ladder = Ladder::with_recorder(config.rating.build(), recorder.clone());
    let seeded: Vec<AgentId> = agents.keys().copied().filter(|id| *id != entrant).collect();
    for id in &seeded {
        ladder.register_ranked(*id).await?;
    }

    // Round-robin among the seeded agents
    let session_config = config.session_config();
    let mut verified = 0;
    for (i, a) in seeded.iter().enumerate() {
        for b in &seeded[i + 1..] {
            let roster = vec![(*a, agents[a].clone()), (*b, agents[b].clone())];
            let outcome = match run_match(MatchId::random(), session_config.clone(), roster, recorder.as_ref()).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!(error = %e, "Seeding match discarded");
                    continue;
                }
            };
            if let Some(transcript) = &outcome.transcript {
                if verify_transcript(transcript).valid {
                    verified += 1;
                } else {
                    warn!(match_id = %outcome.result.match_id, "Transcript failed verification");
                }
            }
            ladder.apply_result(&outcome.result).await?;
        }
    }
    info!("Seeding done, {} transcripts verified", verified);

    // Place the entrant
    let host = ArenaHost::new(session_config, agents.clone(), recorder.clone());
    let placement = run_placement(entrant, &ladder, &host, config.placement_attempts).await?;
    info!(
        "Entrant {} placed at rank {:?} after {} matches",
        entrant,
        placement.final_rank,
        placement.matches_played()
    );

    info!("=== Ladder ===");
    for (rank, record) in ladder.ranked_view().await.iter().enumerate() {
        let name = agents.get(&record.agent_id).map(|a| a.name()).unwrap_or("?");
        info!(
            "#{:<2} {:<16} {:>8.1}  W{} L{} T{}  apples {}",
            rank,
            name,
            ladder.system().display_score(&record.rating),
            record.stats.wins,
            record.stats.losses,
            record.stats.ties,
            record.stats.apples
        );
    }

    if let Some(jsonl) = jsonl {
        tokio::task::spawn_blocking(move || jsonl.close())
            .await
            .context("record writer panicked")?
            .context("failed to flush records")?;
    }

    Ok(())
}
