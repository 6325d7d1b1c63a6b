//! CLI for smartcab.
//!
//! `train` drives a fresh Q-learning agent through the trials of a scripted
//! environment and records one outcome per trial; `report` analyzes the
//! recorded outcomes. Learned values live only for the duration of `train`.

mod script;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use script::Script;
use serde::Serialize;
use smartcab_core::{Agent, Environment, StepRecord};
use smartcab_feedback::{timestamp_now, TrialAnalyzer, TrialEnd, TrialLog, TrialOutcome};
use smartcab_learner::{DecaySchedule, LearnerConfig, QLearningAgent};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::ops::Range;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train a fresh agent on a scripted environment
    Train {
        /// JSONL script, one timestep per line
        #[arg(long)]
        script: PathBuf,

        /// JSON learner configuration; flags below override it
        #[arg(long)]
        config: Option<PathBuf>,

        #[command(flatten)]
        overrides: Overrides,

        /// How often to replay the script's trials
        #[arg(long = "trials", default_value = "1")]
        replays: u32,

        /// Write one JSON step record per decision step
        #[arg(long)]
        trace_file: Option<PathBuf>,

        /// Path to the stats file
        #[arg(long, default_value = "data/smartcab.stats.json")]
        stats_file: PathBuf,

        /// Print the learned values after training
        #[arg(long)]
        dump_q: bool,
    },
    /// Analyze the trial outcomes of a training run
    Report {
        /// Path to the stats file
        #[arg(long, default_value = "data/smartcab.stats.json")]
        stats_file: PathBuf,

        /// Trials per learning-curve window
        #[arg(long, default_value = "10")]
        window: usize,

        /// Minimum number of trials before patterns are reported
        #[arg(long, default_value = "10")]
        min_trials: usize,
    },
}

#[derive(clap::Args, Debug, Default)]
struct Overrides {
    /// Learning rate in (0, 1]
    #[arg(long)]
    alpha: Option<f64>,

    /// Discount factor in [0, 1]
    #[arg(long)]
    gamma: Option<f64>,

    /// Initial exploration probability in [0, 1]
    #[arg(long)]
    epsilon: Option<f64>,

    /// Epsilon decay: compounding or baseline
    #[arg(long)]
    decay: Option<DecaySchedule>,

    /// RNG seed for reproducible runs
    #[arg(long)]
    seed: Option<u64>,
}

impl Overrides {
    fn apply(&self, mut config: LearnerConfig) -> LearnerConfig {
        if let Some(alpha) = self.alpha {
            config.alpha = alpha;
        }
        if let Some(gamma) = self.gamma {
            config.gamma = gamma;
        }
        if let Some(epsilon) = self.epsilon {
            config.epsilon = epsilon;
        }
        if let Some(decay) = self.decay {
            config.decay = decay;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        config
    }
}

#[derive(Serialize)]
struct TraceLine<'a> {
    ts: String,
    #[serde(flatten)]
    record: &'a StepRecord,
}

fn load_config(path: Option<&Path>, overrides: &Overrides) -> Result<LearnerConfig> {
    let base: LearnerConfig = match path {
        Some(p) => {
            let f = File::open(p)
                .with_context(|| format!("Failed to open config {}", p.display()))?;
            serde_json::from_reader(f)
                .with_context(|| format!("Failed to parse config {}", p.display()))?
        }
        None => LearnerConfig::default(),
    };
    Ok(overrides.apply(base))
}

fn create_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    File::create(path).with_context(|| format!("Failed to create {}", path.display()))
}

fn save_log(path: &Path, log: &TrialLog) -> Result<()> {
    let file = create_file(path)?;
    log.to_writer(BufWriter::new(file))
        .context("Failed to write stats")?;
    Ok(())
}

fn load_log(path: &Path) -> Result<TrialLog> {
    let file =
        File::open(path).with_context(|| format!("Failed to open stats {}", path.display()))?;
    TrialLog::from_reader(file).with_context(|| format!("Failed to read stats {}", path.display()))
}

/// Runs one trial of the script to its end and summarizes it.
fn run_trial<W: Write>(
    agent: &mut QLearningAgent,
    script: &Script,
    range: Range<usize>,
    trace: &mut Option<W>,
) -> Result<TrialOutcome> {
    let destination = script.destination(&range);
    let (mut env, mut planner) = script.world(range);

    agent.reset(&mut planner, destination);
    let epsilon = agent.epsilon();

    let mut steps = 0u32;
    let mut net_reward = 0.0;
    let mut penalties = 0u32;
    let mut last_deadline = env.deadline();

    while !env.is_finished() {
        let record = agent.update(&mut env, &planner).with_context(|| {
            format!(
                "Decision step {} of trial {} failed",
                steps + 1,
                agent.trial_count()
            )
        })?;
        steps += 1;
        net_reward += record.reward;
        if record.is_penalty() {
            penalties += 1;
        }
        last_deadline = record.deadline;

        if let Some(w) = trace.as_mut() {
            serde_json::to_writer(
                &mut *w,
                &TraceLine {
                    ts: timestamp_now(),
                    record: &record,
                },
            )?;
            writeln!(w)?;
        }
    }

    // every step consumes one unit of the deadline it was taken under
    let deadline_remaining = if steps == 0 {
        last_deadline
    } else {
        last_deadline - 1
    };
    let end = if env.reached() {
        TrialEnd::Reached
    } else if deadline_remaining <= 0 {
        TrialEnd::Expired
    } else {
        TrialEnd::Aborted
    };

    Ok(TrialOutcome {
        trial: agent.trial_count(),
        ts: timestamp_now(),
        end,
        steps,
        net_reward,
        penalties,
        deadline_remaining,
        epsilon,
    })
}

fn train(
    script_path: &Path,
    config: &LearnerConfig,
    replays: u32,
    trace_file: Option<&Path>,
    stats_file: &Path,
    dump_q: bool,
) -> Result<()> {
    let script = Script::load(script_path)?;
    let mut agent = QLearningAgent::new(config).context("Invalid learner configuration")?;
    let mut trace = trace_file
        .map(|p| create_file(p).map(BufWriter::new))
        .transpose()?;

    let trials = script.trials();
    println!(
        "Loaded {} steps in {} trials from {}",
        script.len(),
        trials.len(),
        script_path.display()
    );

    let mut outcomes = Vec::new();
    for _ in 0..replays {
        for range in &trials {
            let outcome = run_trial(&mut agent, &script, range.clone(), &mut trace)?;
            println!(
                "Trial {}: {:?} after {} steps (net reward {:.2}, penalties {}, epsilon {:.4})",
                outcome.trial,
                outcome.end,
                outcome.steps,
                outcome.net_reward,
                outcome.penalties,
                outcome.epsilon
            );
            outcomes.push(outcome);
        }
    }

    if let Some(w) = trace.as_mut() {
        w.flush().context("Failed to flush trace file")?;
    }

    let log = TrialLog::new(outcomes);
    save_log(stats_file, &log)?;

    let stats = TrialAnalyzer::default().summarize(&log.outcomes);
    println!(
        "Trained {} trials: success {:.1}%, avg reward {:.2}, penalties/step {:.3}",
        stats.total,
        stats.success_rate() * 100.0,
        stats.average_reward(),
        stats.penalty_rate()
    );
    println!("Stats written to {}", stats_file.display());

    if dump_q {
        println!("{}", serde_json::to_string_pretty(&agent.snapshot())?);
    }

    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Train {
            script,
            config,
            overrides,
            replays,
            trace_file,
            stats_file,
            dump_q,
        } => {
            let config = load_config(config.as_deref(), &overrides)?;
            train(
                &script,
                &config,
                replays,
                trace_file.as_deref(),
                &stats_file,
                dump_q,
            )?;
        }
        Commands::Report {
            stats_file,
            window,
            min_trials,
        } => {
            let log = load_log(&stats_file)?;
            let report = TrialAnalyzer::new(min_trials, window).report(&log.outcomes);
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}
