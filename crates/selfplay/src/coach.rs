//! The training loop: self-play, training, arena gating, promotion.

use crate::{
    arena::{Arena, ArenaReport},
    checkpoint::{CheckpointDir, CheckpointMeta},
    config::CoachConfig,
    episode::{play_one_game, GameRecord},
    model::{Model, TrainStats},
    replay::ReplayBuffer,
};
use alphazero_core::{Game, Result, ZeroError};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Aggregate of one iteration's self-play games.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SelfPlayStats {
    pub games: usize,
    pub examples: usize,
    pub plies: usize,
    pub first_player_wins: usize,
    pub second_player_wins: usize,
    pub draws: usize,
    pub truncated: usize,
}

impl SelfPlayStats {
    fn add<S>(&mut self, record: &GameRecord<S>) {
        self.games += 1;
        self.examples += record.examples.len();
        self.plies += record.plies;
        if record.truncated {
            self.truncated += 1;
        }
        if record.first_player_outcome > 0.5 {
            self.first_player_wins += 1;
        } else if record.first_player_outcome < -0.5 {
            self.second_player_wins += 1;
        } else {
            self.draws += 1;
        }
    }
}

/// Everything one iteration produced. The champion itself is never changed;
/// a promoted candidate is handed back by value.
pub struct IterationOutcome<M> {
    pub self_play: SelfPlayStats,
    pub train: TrainStats,
    pub report: ArenaReport,
    pub promoted: Option<M>,
}

/// Persistent record of a finished iteration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IterationSummary {
    /// 1-based iteration number.
    pub iteration: usize,

    /// Champion generation after this iteration.
    pub generation: usize,

    pub promoted: bool,
    pub self_play: SelfPlayStats,
    pub train: TrainStats,
    pub arena: ArenaReport,
    pub replay_size: usize,
}

/// Run one iteration against `champion`.
///
/// 1. Play `games_per_iteration` self-play games with the champion and
///    append their examples to `replay` in game order.
/// 2. Clone the champion and train the copy for `training_epochs` epochs of
///    `ceil(len / batch_size)` batches drawn with replacement.
/// 3. Pit the candidate against the champion in the arena.
/// 4. Return the candidate if it reached `win_threshold`.
///
/// `replay` only receives the new examples once every step has succeeded,
/// so a failed iteration can be retried without duplicating games.
pub fn run_iteration<G, M, R>(
    game: &G,
    champion: &M,
    replay: &mut ReplayBuffer<G::State>,
    config: &CoachConfig,
    rng: &mut R,
) -> Result<IterationOutcome<M>>
where
    G: Game,
    M: Model<G>,
    R: Rng,
{
    // Seeds are drawn in game order so parallel and sequential runs agree
    let seeds: Vec<u64> = (0..config.games_per_iteration).map(|_| rng.gen()).collect();
    let play = |seed: u64| {
        let mut game_rng = ChaCha8Rng::seed_from_u64(seed);
        play_one_game(game, champion, &config.self_play, &mut game_rng)
    };
    let records: Vec<GameRecord<G::State>> = if config.parallel {
        seeds.par_iter().map(|&seed| play(seed)).collect::<Result<_>>()?
    } else {
        seeds.iter().map(|&seed| play(seed)).collect::<Result<_>>()?
    };

    let mut staged = replay.clone();
    let mut self_play = SelfPlayStats::default();
    for record in records {
        self_play.add(&record);
        staged.extend(record.examples);
    }
    info!(
        games = self_play.games,
        examples = self_play.examples,
        first_player_wins = self_play.first_player_wins,
        second_player_wins = self_play.second_player_wins,
        draws = self_play.draws,
        replay_size = staged.len(),
        "self-play finished"
    );

    let mut candidate = champion.clone();
    let train = train_candidate::<G, _, _>(&mut candidate, &staged, config, rng)?;

    let arena = Arena::new(game, &candidate, champion, &config.arena);
    let report = arena.play_games(rng.gen())?;
    let accepted = report.should_promote(config.arena.win_threshold);
    info!(
        candidate_wins = report.candidate_wins,
        champion_wins = report.champion_wins,
        draws = report.draws,
        win_rate = report.win_rate().unwrap_or(0.0),
        threshold = config.arena.win_threshold,
        accepted,
        "arena finished"
    );

    *replay = staged;
    Ok(IterationOutcome {
        self_play,
        train,
        report,
        promoted: accepted.then_some(candidate),
    })
}

/// Train `candidate` on the replay buffer; returns the mean losses of the
/// final epoch.
fn train_candidate<G, M, R>(
    candidate: &mut M,
    replay: &ReplayBuffer<G::State>,
    config: &CoachConfig,
    rng: &mut R,
) -> Result<TrainStats>
where
    G: Game,
    M: Model<G>,
    R: Rng,
{
    if replay.is_empty() {
        return Err(ZeroError::EmptyReplayBuffer);
    }

    let batches = replay.batches_per_epoch(config.batch_size);
    let mut last = TrainStats::default();

    for epoch in 0..config.training_epochs {
        let mut policy_loss = 0.0;
        let mut value_loss = 0.0;
        let mut examples = 0;

        for _ in 0..batches {
            let batch = replay.sample(config.batch_size, rng)?;
            let stats = candidate.train(&batch)?;
            policy_loss += stats.policy_loss * stats.examples as f32;
            value_loss += stats.value_loss * stats.examples as f32;
            examples += stats.examples;
        }

        let n = examples.max(1) as f32;
        last = TrainStats {
            policy_loss: policy_loss / n,
            value_loss: value_loss / n,
            examples,
        };
        debug!(
            epoch,
            policy_loss = last.policy_loss,
            value_loss = last.value_loss,
            "training epoch finished"
        );
    }

    Ok(last)
}

/// Drives training iterations and owns everything that outlives one.
pub struct Coach<G: Game, M> {
    game: G,
    config: CoachConfig,
    champion: M,
    generation: usize,
    iteration: usize,
    replay: ReplayBuffer<G::State>,
    history: Vec<IterationSummary>,
}

impl<G, M> Coach<G, M>
where
    G: Game,
    G::State: Serialize + DeserializeOwned,
    M: Model<G>,
{
    /// Start a fresh run with `champion` as generation 0.
    pub fn new(game: G, champion: M, config: CoachConfig) -> Result<Self> {
        config.validate()?;
        let replay = ReplayBuffer::new(config.replay_buffer_capacity);
        Ok(Self {
            game,
            config,
            champion,
            generation: 0,
            iteration: 0,
            replay,
            history: Vec::new(),
        })
    }

    /// Continue from the checkpoint in `config.checkpoint_dir`.
    ///
    /// The run keeps the seed it was started with, whatever `config.seed`
    /// says. The replay buffer is re-windowed to the configured capacity.
    pub fn resume(game: G, mut config: CoachConfig) -> Result<Self> {
        config.validate()?;
        let dir = config
            .checkpoint_dir
            .clone()
            .map(CheckpointDir::new)
            .ok_or_else(|| ZeroError::InvalidConfig("resume needs checkpoint_dir".to_string()))?;
        dir.recover()?;
        if !dir.exists() {
            return Err(ZeroError::checkpoint(dir.root(), "no complete checkpoint found"));
        }

        let meta = dir.read_meta()?;
        if meta.seed != config.seed {
            warn!(
                saved = meta.seed,
                configured = config.seed,
                "keeping the checkpoint's seed"
            );
            config.seed = meta.seed;
        }
        let champion = M::load(&dir.champion_path())?;
        let saved: ReplayBuffer<G::State> = ReplayBuffer::load(&dir.replay_path())?;
        let mut replay = ReplayBuffer::new(config.replay_buffer_capacity);
        replay.extend(saved.iter().cloned());

        info!(
            iteration = meta.iteration,
            generation = meta.generation,
            replay_size = replay.len(),
            "resumed from checkpoint"
        );

        Ok(Self {
            game,
            config,
            champion,
            generation: meta.generation,
            iteration: meta.iteration,
            replay,
            history: meta.history,
        })
    }

    pub fn champion(&self) -> &M {
        &self.champion
    }

    /// Number of promotions so far.
    pub fn generation(&self) -> usize {
        self.generation
    }

    /// Iterations completed so far.
    pub fn iteration(&self) -> usize {
        self.iteration
    }

    pub fn replay(&self) -> &ReplayBuffer<G::State> {
        &self.replay
    }

    pub fn history(&self) -> &[IterationSummary] {
        &self.history
    }

    pub fn config(&self) -> &CoachConfig {
        &self.config
    }

    /// Run one iteration, apply its promotion decision and checkpoint.
    ///
    /// On error the champion and the iteration counter are left as they
    /// were, so the last checkpoint stays the one to resume from.
    pub fn run_iteration(&mut self) -> Result<IterationSummary> {
        let start = Instant::now();
        let mut rng = self.iteration_rng();
        let outcome = run_iteration(
            &self.game,
            &self.champion,
            &mut self.replay,
            &self.config,
            &mut rng,
        )?;

        let promoted = outcome.promoted.is_some();
        if let Some(candidate) = outcome.promoted {
            self.champion = candidate;
            self.generation += 1;
        }
        self.iteration += 1;

        let summary = IterationSummary {
            iteration: self.iteration,
            generation: self.generation,
            promoted,
            self_play: outcome.self_play,
            train: outcome.train,
            arena: outcome.report,
            replay_size: self.replay.len(),
        };
        self.history.push(summary.clone());

        info!(
            iteration = self.iteration,
            generation = self.generation,
            promoted,
            elapsed_secs = start.elapsed().as_secs_f64(),
            "iteration complete"
        );

        self.save_checkpoint()?;
        Ok(summary)
    }

    /// Run until `config.iterations` iterations have completed, counting
    /// those done before a resume.
    pub fn run(&mut self) -> Result<&[IterationSummary]> {
        while self.iteration < self.config.iterations {
            self.run_iteration()?;
        }
        Ok(&self.history)
    }

    /// Persist champion, replay buffer and metadata as one set if a
    /// directory is set.
    pub fn save_checkpoint(&self) -> Result<()> {
        let Some(root) = &self.config.checkpoint_dir else {
            return Ok(());
        };
        let dir = CheckpointDir::new(root);
        dir.create()?;
        dir.recover()?;
        self.champion.save(&dir.staged_champion_path())?;
        self.replay.save(&dir.staged_replay_path())?;
        dir.commit(&CheckpointMeta {
            iteration: self.iteration,
            generation: self.generation,
            seed: self.config.seed,
            history: self.history.clone(),
        })?;
        debug!(dir = %dir.root().display(), "checkpoint written");
        Ok(())
    }

    /// Each iteration gets its own ChaCha stream, so a resumed run makes the
    /// same random choices as an uninterrupted one.
    fn iteration_rng(&self) -> ChaCha8Rng {
        let mut rng = ChaCha8Rng::seed_from_u64(self.config.seed);
        rng.set_stream(self.iteration as u64);
        rng
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::ArenaConfig, config::SelfPlayConfig, example::TrainingExample, model::TabularModel,
    };
    use alphazero_mcts::{games::TicTacToe, games::TicTacToeState, Evaluation, Evaluator, MctsConfig};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn tiny_config() -> CoachConfig {
        CoachConfig {
            iterations: 2,
            games_per_iteration: 3,
            replay_buffer_capacity: 100,
            training_epochs: 1,
            batch_size: 8,
            self_play: SelfPlayConfig {
                mcts: MctsConfig::with_simulations(8),
                ..Default::default()
            },
            arena: ArenaConfig {
                games: 2,
                mcts: MctsConfig::for_evaluation(8),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_self_play_stats() {
        let mut stats = SelfPlayStats::default();
        let record: GameRecord<u8> = GameRecord {
            examples: Vec::new(),
            plies: 7,
            outcome: 1.0,
            first_player_outcome: 1.0,
            truncated: false,
        };
        stats.add(&record);
        stats.add(&GameRecord {
            first_player_outcome: 0.0,
            truncated: true,
            ..record.clone()
        });
        assert_eq!(stats.games, 2);
        assert_eq!(stats.plies, 14);
        assert_eq!(stats.first_player_wins, 1);
        assert_eq!(stats.draws, 1);
        assert_eq!(stats.truncated, 1);
    }

    #[test]
    fn test_run_iteration_leaves_champion_untouched() {
        let game = TicTacToe;
        let champion: TabularModel<TicTacToeState> = TabularModel::new(0.5);
        let config = tiny_config();
        let mut replay = ReplayBuffer::new(config.replay_buffer_capacity);
        let mut rng = ChaCha8Rng::seed_from_u64(11);

        let outcome = run_iteration(&game, &champion, &mut replay, &config, &mut rng).unwrap();

        assert!(champion.is_empty());
        assert_eq!(outcome.self_play.games, 3);
        assert_eq!(replay.len(), outcome.self_play.examples);
        assert_eq!(outcome.report.games(), 2);
        assert_eq!(
            outcome.promoted.is_some(),
            outcome.report.should_promote(config.arena.win_threshold)
        );
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let game = TicTacToe;
        let champion: TabularModel<TicTacToeState> = TabularModel::new(0.5);
        let run = |parallel: bool| {
            let config = CoachConfig {
                parallel,
                ..tiny_config()
            };
            let mut replay = ReplayBuffer::new(config.replay_buffer_capacity);
            let mut rng = ChaCha8Rng::seed_from_u64(3);
            let outcome = run_iteration(&game, &champion, &mut replay, &config, &mut rng).unwrap();
            let examples: Vec<_> = replay.iter().cloned().collect();
            (outcome.self_play, outcome.report, examples)
        };
        assert_eq!(run(false), run(true));
    }

    #[test]
    fn test_coach_counts_iterations() {
        let champion: TabularModel<TicTacToeState> = TabularModel::new(0.5);
        let mut coach = Coach::new(TicTacToe, champion, tiny_config()).unwrap();
        let history = coach.run().unwrap();

        assert_eq!(history.len(), 2);
        assert_eq!(history[1].iteration, 2);
        assert_eq!(coach.iteration(), 2);
        assert!(coach.generation() <= 2);
    }

    /// Tabular model whose optimizer fails a set number of times.
    #[derive(Clone)]
    struct FlakyModel {
        inner: TabularModel<TicTacToeState>,
        failures: Arc<AtomicUsize>,
    }

    impl Evaluator<TicTacToe> for FlakyModel {
        fn evaluate(&self, game: &TicTacToe, state: &TicTacToeState) -> Result<Evaluation> {
            self.inner.evaluate(game, state)
        }
    }

    impl Model<TicTacToe> for FlakyModel {
        fn train(&mut self, batch: &[&TrainingExample<TicTacToeState>]) -> Result<TrainStats> {
            if self
                .failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(ZeroError::Evaluator("optimizer diverged".to_string()));
            }
            Model::<TicTacToe>::train(&mut self.inner, batch)
        }

        fn save(&self, path: &std::path::Path) -> Result<()> {
            Model::<TicTacToe>::save(&self.inner, path)
        }

        fn load(path: &std::path::Path) -> Result<Self> {
            Ok(Self {
                inner: <TabularModel<TicTacToeState> as Model<TicTacToe>>::load(path)?,
                failures: Arc::new(AtomicUsize::new(0)),
            })
        }
    }

    #[test]
    fn test_failed_iteration_leaves_replay_untouched() {
        let champion = FlakyModel {
            inner: TabularModel::new(0.5),
            failures: Arc::new(AtomicUsize::new(1)),
        };
        let mut coach = Coach::new(TicTacToe, champion, tiny_config()).unwrap();

        assert!(coach.run_iteration().is_err());
        assert_eq!(coach.iteration(), 0);
        assert!(coach.replay().is_empty());

        let summary = coach.run_iteration().unwrap();
        assert_eq!(coach.iteration(), 1);
        assert_eq!(coach.replay().len(), summary.self_play.examples);

        // The retry matches a run that never failed
        let plain: TabularModel<TicTacToeState> = TabularModel::new(0.5);
        let mut clean = Coach::new(TicTacToe, plain, tiny_config()).unwrap();
        clean.run_iteration().unwrap();
        let retried: Vec<_> = coach.replay().iter().cloned().collect();
        let expected: Vec<_> = clean.replay().iter().cloned().collect();
        assert_eq!(retried, expected);
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = CoachConfig {
            games_per_iteration: 0,
            ..tiny_config()
        };
        let champion: TabularModel<TicTacToeState> = TabularModel::new(0.5);
        assert!(Coach::new(TicTacToe, champion, config).is_err());
    }
}
