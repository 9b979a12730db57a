//! AlphaZero training and evaluation tool.
//!
//! Trains a tabular tic-tac-toe model through self-play and arena gating,
//! and evaluates saved models against a random-rollout MCTS baseline.

use alphazero_mcts::{
    games::{TicTacToe, TicTacToeState},
    MctsConfig, RolloutEvaluator,
};
use alphazero_selfplay::{Arena, ArenaConfig, Coach, CoachConfig, Model, TabularModel};
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;

/// AlphaZero self-play training tool.
#[derive(Parser)]
#[command(name = "alphazero")]
#[command(about = "Train and evaluate AlphaZero models by self-play")]
struct Cli {
    /// Log level used when RUST_LOG is not set.
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the self-play / train / arena loop.
    Train {
        /// JSON configuration file. Missing keys take defaults.
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Total number of iterations.
        #[arg(short, long)]
        iterations: Option<usize>,

        /// Self-play games per iteration.
        #[arg(short, long)]
        games: Option<usize>,

        /// MCTS simulations per move, for self-play and arena.
        #[arg(short, long)]
        simulations: Option<usize>,

        /// Random seed for reproducibility.
        #[arg(long)]
        seed: Option<u64>,

        /// Directory for the champion, replay buffer and metadata.
        #[arg(long)]
        checkpoint_dir: Option<PathBuf>,

        /// Continue from the checkpoint in the checkpoint directory.
        #[arg(long)]
        resume: bool,

        /// Play self-play games in parallel.
        #[arg(long)]
        parallel: bool,
    },

    /// Evaluate a saved model against a random-rollout MCTS baseline.
    Evaluate {
        /// Model checkpoint (MessagePack).
        #[arg(short, long)]
        model: PathBuf,

        /// Number of games to play.
        #[arg(short, long, default_value = "20")]
        games: usize,

        /// Number of MCTS simulations per move.
        #[arg(short, long, default_value = "100")]
        simulations: usize,

        /// Maximum depth of the baseline's random playouts.
        #[arg(long, default_value = "20")]
        rollout_depth: usize,

        /// Random seed for reproducibility.
        #[arg(long, default_value = "42")]
        seed: u64,
    },

    /// Print the default configuration as JSON.
    Config,
}

fn init_tracing(level: &str) -> Result<()> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn cmd_train(
    config_path: Option<PathBuf>,
    iterations: Option<usize>,
    games: Option<usize>,
    simulations: Option<usize>,
    seed: Option<u64>,
    checkpoint_dir: Option<PathBuf>,
    resume: bool,
    parallel: bool,
) -> Result<()> {
    let mut config = match &config_path {
        Some(path) => CoachConfig::from_json_file(path)
            .with_context(|| format!("Failed to load config from {:?}", path))?,
        None => CoachConfig::default(),
    };

    if let Some(iterations) = iterations {
        config.iterations = iterations;
    }
    if let Some(games) = games {
        config.games_per_iteration = games;
    }
    if let Some(simulations) = simulations {
        config.self_play.mcts.num_simulations = simulations;
        config.arena.mcts.num_simulations = simulations;
    }
    if let Some(seed) = seed {
        config.seed = seed;
    }
    if checkpoint_dir.is_some() {
        config.checkpoint_dir = checkpoint_dir;
    }
    config.parallel |= parallel;
    config.validate().context("Invalid configuration")?;

    if resume && config.checkpoint_dir.is_none() {
        bail!("--resume needs --checkpoint-dir or checkpoint_dir in the config");
    }

    let game = TicTacToe;
    let mut coach: Coach<TicTacToe, TabularModel<TicTacToeState>> = if resume {
        Coach::resume(game, config.clone()).context("Failed to resume from checkpoint")?
    } else {
        Coach::new(game, TabularModel::new(config.learning_rate), config.clone())?
    };

    info!(
        iterations = config.iterations,
        games_per_iteration = config.games_per_iteration,
        simulations = config.self_play.mcts.num_simulations,
        seed = coach.config().seed,
        "starting training"
    );

    let start = Instant::now();
    let history = coach.run().context("Training iteration failed")?;

    println!("\n================================================");
    println!("TRAINING SUMMARY");
    println!("================================================");
    for summary in history {
        let rate = summary
            .arena
            .win_rate()
            .map_or_else(|| "n/a".to_string(), |r| format!("{:.1}%", r * 100.0));
        println!(
            "Iteration {:>3}: gen {:>2} | self-play {}-{}-{} | arena {}-{}-{} ({}){}",
            summary.iteration,
            summary.generation,
            summary.self_play.first_player_wins,
            summary.self_play.second_player_wins,
            summary.self_play.draws,
            summary.arena.candidate_wins,
            summary.arena.champion_wins,
            summary.arena.draws,
            rate,
            if summary.promoted { " promoted" } else { "" }
        );
    }
    println!("------------------------------------------------");
    println!("Champion generation: {}", coach.generation());
    println!("Replay buffer size:  {}", coach.replay().len());
    println!("Table entries:       {}", coach.champion().len());
    println!("Completed in {:.2}s", start.elapsed().as_secs_f64());
    if let Some(dir) = &config.checkpoint_dir {
        println!("Checkpoint saved to: {:?}", dir);
    }

    Ok(())
}

fn cmd_evaluate(
    model_path: PathBuf,
    games: usize,
    simulations: usize,
    rollout_depth: usize,
    seed: u64,
) -> Result<()> {
    println!("Loading model from {:?}", model_path);
    let model = <TabularModel<TicTacToeState> as Model<TicTacToe>>::load(&model_path)
        .with_context(|| format!("Failed to load model from {:?}", model_path))?;

    let game = TicTacToe;
    let baseline = RolloutEvaluator::new(ChaCha8Rng::seed_from_u64(seed), rollout_depth);
    let config = ArenaConfig {
        games,
        mcts: MctsConfig::for_evaluation(simulations),
        ..Default::default()
    };

    println!(
        "\nPlaying {} games: model (MCTS {} sims) vs rollout MCTS (depth {})",
        games, simulations, rollout_depth
    );
    let report = Arena::new(&game, &model, baseline, &config)
        .play_games(seed)
        .context("Arena failed")?;

    let pct = |n: usize| n as f32 / games.max(1) as f32 * 100.0;
    println!("\n================================================");
    println!("FINAL RESULTS");
    println!("================================================");
    println!("Model wins:    {} ({:.1}%)", report.candidate_wins, pct(report.candidate_wins));
    println!("Baseline wins: {} ({:.1}%)", report.champion_wins, pct(report.champion_wins));
    println!("Draws:         {} ({:.1}%)", report.draws, pct(report.draws));
    println!("------------------------------------------------");
    match report.win_rate() {
        Some(rate) => println!("Win rate (decisive games): {:.1}%", rate * 100.0),
        None => println!("Win rate (decisive games): n/a, every game was drawn"),
    }

    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level)?;

    match cli.command {
        Commands::Train {
            config,
            iterations,
            games,
            simulations,
            seed,
            checkpoint_dir,
            resume,
            parallel,
        } => cmd_train(
            config,
            iterations,
            games,
            simulations,
            seed,
            checkpoint_dir,
            resume,
            parallel,
        ),

        Commands::Evaluate {
            model,
            games,
            simulations,
            rollout_depth,
            seed,
        } => cmd_evaluate(model, games, simulations, rollout_depth, seed),

        Commands::Config => {
            println!("{}", CoachConfig::default().to_json_pretty()?);
            Ok(())
        }
    }
}
