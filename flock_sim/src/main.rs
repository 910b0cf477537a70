//! Flock Simulator CLI
//!
//! Runs flocking scenarios under the invariant oracle, or drives a live
//! flock against the wall clock.

use clap::Parser;
use flock_core::{FlockStats, ModelKind, StepOptions};
use flock_env::{FlockContext, StepRate, TokioContext};
use flock_sim::scenarios::ScenarioId;
use flock_sim::{join_driver, Driver, ScenarioResult, ScenarioRunner, SimConfig, SimError, SimExport, Simulation};
use tracing::{debug, error, info, Level};
use tracing_subscriber::FmtSubscriber;

/// Flock Simulator CLI
#[derive(Parser, Debug)]
#[command(name = "flock-sim")]
#[command(about = "Run deterministic flocking simulations", long_about = None)]
struct Args {
    /// Master seed for determinism (0 = random from time)
    #[arg(short, long, default_value = "42")]
    seed: u64,

    /// Number of bots for the random scenarios
    #[arg(short, long, default_value = "30")]
    bots: usize,

    /// Scenario to run (lone_bot, close_pair, wall_bounce, open_flock, crowded_corner, margin_turn, all)
    #[arg(short = 'S', long, default_value = "all")]
    scenario: String,

    /// Steps per scenario (or step budget in live mode, 0 = unlimited)
    #[arg(short = 'n', long, default_value = "500")]
    steps: u64,

    /// Model variant (boid, identity, decomposed)
    #[arg(short, long, default_value = "boid")]
    model: String,

    /// Fan each step out over the rayon pool
    #[arg(long)]
    parallel: bool,

    /// Use the uniform grid for neighbor lookup
    #[arg(long)]
    spatial_grid: bool,

    /// Drive a random flock against the wall clock instead of running scenarios
    #[arg(long)]
    live: bool,

    /// Steps per second in live mode
    #[arg(short, long, default_value = "50")]
    rate: f64,

    /// Export frames to a JSON file for an external renderer
    #[arg(long)]
    export: Option<String>,

    /// Steps between exported frames
    #[arg(long, default_value = "10")]
    export_interval: u64,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// JSON output for CI parsing
    #[arg(long)]
    json: bool,
}

fn main() {
    let args = Args::parse();

    // Initialize logging
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }

    if !args.json {
        info!("Flock Simulator v{}", env!("CARGO_PKG_VERSION"));
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    }

    let model: ModelKind = args.model.parse().unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        eprintln!("Available models: boid, identity, decomposed");
        std::process::exit(1);
    });
    let options = StepOptions::default()
        .parallel(args.parallel)
        .spatial_grid(args.spatial_grid);

    // Determine base seed
    let seed = if args.seed == 0 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(42)
    } else {
        args.seed
    };

    if args.live {
        let config = SimConfig {
            seed,
            num_bots: args.bots,
            steps_per_second: args.rate,
            max_steps: args.steps,
            model,
            options,
        };
        if let Err(e) = run_live(&config) {
            error!("Live run failed: {}", e);
            std::process::exit(1);
        }
        return;
    }

    // Parse scenarios
    let scenarios: Vec<ScenarioId> = if args.scenario == "all" {
        ScenarioId::all()
    } else {
        vec![args.scenario.parse().unwrap_or_else(|e| {
            eprintln!("Error: {}", e);
            eprintln!("Available scenarios: lone_bot, close_pair, wall_bounce, open_flock, crowded_corner, margin_turn, all");
            std::process::exit(1);
        })]
    };

    let runner = ScenarioRunner::new(seed, args.bots)
        .with_steps(args.steps)
        .with_model(model)
        .with_options(options);

    // Handle --export mode for visualization
    if let Some(export_path) = &args.export {
        if scenarios.len() > 1 {
            eprintln!("Error: --export only supports a single scenario, not 'all'");
            std::process::exit(1);
        }

        info!("Running with export to: {}", export_path);
        match run_with_export(&runner, scenarios[0], seed, model, export_path, args.export_interval) {
            Ok(result) if result.passed => {
                info!("✓ {} (seed={}) PASSED - exported to {}", result.scenario, seed, export_path);
            }
            Ok(result) => {
                error!(
                    "✗ {} FAILED: {}",
                    result.scenario,
                    result.failure_reason.as_deref().unwrap_or("unknown")
                );
                std::process::exit(1);
            }
            Err(e) => {
                error!("✗ {} aborted: {}", scenarios[0], e);
                std::process::exit(1);
            }
        }
        return;
    }

    // Track results
    let mut all_results: Vec<ScenarioResult> = Vec::new();
    let mut failed_count = 0;

    for scenario in &scenarios {
        let result = match runner.run(*scenario) {
            Ok(result) => result,
            Err(e) => {
                error!("✗ {} aborted: {}", scenario, e);
                failed_count += 1;
                continue;
            }
        };

        if !args.json {
            if result.passed {
                info!(
                    "✓ {} (seed={}) PASSED | {}",
                    scenario,
                    seed,
                    describe(&result.final_stats)
                );
            } else {
                error!(
                    "✗ {} (seed={}) FAILED: {}",
                    scenario,
                    seed,
                    result.failure_reason.as_deref().unwrap_or("unknown")
                );
            }
        }

        if !result.passed {
            failed_count += 1;
        }

        all_results.push(result);
    }

    // Summary
    let total = scenarios.len();
    let passed = total - failed_count;

    if args.json {
        // JSON output for CI parsing
        let summary = serde_json::json!({
            "total": total,
            "passed": passed,
            "failed": failed_count,
            "results": all_results.iter().map(|r| {
                serde_json::json!({
                    "scenario": r.scenario.name(),
                    "seed": r.seed,
                    "model": r.model.name(),
                    "passed": r.passed,
                    "steps": r.total_steps,
                    "violations": r.violations,
                    "failure_reason": r.failure_reason,
                    "final_stats": r.final_stats,
                })
            }).collect::<Vec<_>>(),
        });
        match serde_json::to_string_pretty(&summary) {
            Ok(json) => println!("{}", json),
            Err(e) => error!("Failed to serialize summary: {}", e),
        }
    } else {
        info!("");
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

        if failed_count == 0 {
            info!("✅ All {} scenario runs passed!", total);
        } else {
            error!("❌ {}/{} scenario runs failed!", failed_count, total);
        }
    }

    // Exit with proper code for CI
    if failed_count > 0 {
        std::process::exit(1);
    }
}

/// Runs one scenario and writes its frames to `export_path`.
fn run_with_export(
    runner: &ScenarioRunner,
    scenario: ScenarioId,
    seed: u64,
    model: ModelKind,
    export_path: &str,
    interval: u64,
) -> Result<ScenarioResult, SimError> {
    let (config, _) = scenario.setup(seed, 1)?;
    let mut export = SimExport::new(scenario.name(), seed, model.name(), config.bounds);

    let result = runner.run_with_export(scenario, &mut export, interval)?;
    export.write_to_file(export_path)?;
    info!("Exported {} frames to {}", export.frames.len(), export_path);

    Ok(result)
}

/// Drives a random flock at `config.steps_per_second` until the step
/// budget is spent.
fn run_live(config: &SimConfig) -> Result<(), SimError> {
    let rate = StepRate::per_second(config.steps_per_second)?;
    let simulation = Simulation::new(config)?;
    let runtime = tokio::runtime::Runtime::new()?;

    runtime.block_on(async {
        let ctx = std::sync::Arc::new(TokioContext::seeded(config.seed));
        let (driver, mut handle) = Driver::new(ctx.clone(), simulation, rate);
        let driver = driver.with_max_steps(config.max_steps);
        let task = tokio::spawn(driver.run());

        // Log flock statistics roughly once per second
        let mut progress = handle.clone();
        let report_every = (rate.steps_per_second().round() as u64).max(1);
        ctx.spawn("progress", async move {
            let mut next_report = report_every;
            loop {
                let threshold = next_report;
                let snapshot = match progress
                    .wait_for(move |s| s.step_count >= threshold || s.state.is_terminal())
                    .await
                {
                    Ok(snapshot) => snapshot,
                    Err(_) => break,
                };
                if snapshot.state.is_terminal() {
                    break;
                }
                info!(
                    "step={} gen={} | {}",
                    snapshot.step_count,
                    snapshot.generation,
                    describe(&FlockStats::measure(&snapshot.population))
                );
                next_report = snapshot.step_count + report_every;
            }
        });

        info!("Driving {} bots at {} (max_steps={})", config.num_bots, rate, config.max_steps);
        handle.start()?;
        let waited = handle.wait_for(|s| s.state.is_terminal()).await;

        // The task's own outcome wins over a closed snapshot channel
        let simulation = join_driver(task).await?;
        let last = waited?;
        debug!(state = ?last.state, "driver reached terminal state");

        info!(
            "✓ finished after {} steps | {}",
            simulation.counter(),
            describe(&FlockStats::measure(simulation.population()))
        );
        Ok::<(), SimError>(())
    })
}

fn describe(stats: &FlockStats) -> String {
    format!(
        "centroid=({:.1}, {:.1}) speed={:.2} [{:.2}, {:.2}] polarization={:.2} spacing={}",
        stats.centroid.x,
        stats.centroid.y,
        stats.mean_speed,
        stats.min_speed,
        stats.max_speed,
        stats.polarization,
        stats
            .mean_nearest_distance
            .map(|d| format!("{:.2}", d))
            .unwrap_or_else(|| "-".to_string())
    )
}
