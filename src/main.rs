//! Attunement CLI
//!
//! Usage:
//!   attunement --simulate 50                 # Run a local session for 50 readings
//!   attunement --interactive                 # Enter = reading, 'stop' = summary
//!   attunement --serve                       # HTTP API server
//!   attunement --simulate 20 --json          # JSON output

use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::thread::sleep;
use std::time::Duration;

use clap::Parser;
use colored::Colorize;

use attunement::core::{run_server, EngineConfig, SessionRegistry};
use attunement::types::{NeedleState, Reading, SessionSummary};
use attunement::{ANALYSIS_WINDOW, DEFAULT_BASELINE_TONE_ARM, DEFAULT_SENSITIVITY, HISTORY_CAPACITY, VERSION};

#[derive(Parser, Debug)]
#[command(
    name = "attunement",
    version = VERSION,
    about = "Attunement signal engine - entropy-driven meter readings and needle states",
    long_about = "Attunement blends several entropy sources into meter readings,\n\
                  tracks a rolling window per session and classifies the needle.\n\n\
                  Modes:\n  \
                  --simulate N   Take N readings from a local session\n  \
                  --interactive  Enter takes a reading, 'stop' ends the session\n  \
                  --serve        HTTP/WebSocket API server\n\n\
                  Needle states:\n  \
                  STUCK      - No meaningful motion\n  \
                  RISING     - Needle climbing\n  \
                  FALLING    - Needle dropping\n  \
                  FLOATING   - Flat and coherent (target)\n  \
                  ROCKSLAM   - Heavy erratic swings\n  \
                  THETA_BOP  - Rhythmic oscillation"
)]
struct Args {
    /// Take this many readings from a local session
    #[arg(long)]
    simulate: Option<usize>,

    /// Interactive mode - read commands from stdin
    #[arg(short, long)]
    interactive: bool,

    /// Run as HTTP API server
    #[arg(short, long)]
    serve: bool,

    /// Server address
    #[arg(long, default_value = "127.0.0.1:3000")]
    addr: String,

    /// Baseline tone arm for local sessions
    #[arg(long, default_value_t = DEFAULT_BASELINE_TONE_ARM)]
    baseline: f64,

    /// Needle sensitivity for local sessions (> 0)
    #[arg(long, default_value_t = DEFAULT_SENSITIVITY)]
    sensitivity: f64,

    /// Analysis window (readings)
    #[arg(long, default_value_t = ANALYSIS_WINDOW)]
    window: usize,

    /// Readings retained per session
    #[arg(long, default_value_t = HISTORY_CAPACITY)]
    history_capacity: usize,

    /// Pause between simulated readings (milliseconds)
    #[arg(long, default_value_t = 0)]
    interval_ms: u64,

    /// Output as JSON
    #[arg(long)]
    json: bool,

    /// Disable colors in output
    #[arg(long)]
    no_color: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let default_filter = if args.serve { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

    if args.no_color {
        colored::control::set_override(false);
    }

    let config = EngineConfig::default()
        .with_window(args.window)
        .with_history_capacity(args.history_capacity);
    let registry = match SessionRegistry::with_config(config) {
        Ok(registry) => Arc::new(registry),
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            std::process::exit(2);
        }
    };

    if args.serve {
        run_serve(&args, registry).await;
    } else if args.interactive {
        run_interactive(&args, &registry);
    } else {
        run_simulate(&args, &registry, args.simulate.unwrap_or(30));
    }
}

/// Create the local session or exit
fn open_session(args: &Args, registry: &SessionRegistry) -> String {
    match registry.create_session(args.baseline, args.sensitivity) {
        Ok(id) => id,
        Err(e) => {
            eprintln!("Cannot create session: {} ({})", e, e.code());
            std::process::exit(2);
        }
    }
}

/// Run a fixed number of readings, then print the summary
fn run_simulate(args: &Args, registry: &SessionRegistry, count: usize) {
    let id = open_session(args, registry);

    if !args.json {
        print_header("Simulation");
    }

    for _ in 0..count {
        match registry.get_reading(&id) {
            Ok(reading) => print_reading(&reading, args),
            Err(e) => {
                eprintln!("Reading failed: {}", e);
                break;
            }
        }
        if args.interval_ms > 0 {
            sleep(Duration::from_millis(args.interval_ms));
        }
    }

    match registry.stop_session(&id) {
        Ok(summary) => print_summary(&summary, args),
        Err(e) => eprintln!("Stop failed: {}", e),
    }
}

/// Run interactive mode
fn run_interactive(args: &Args, registry: &SessionRegistry) {
    let id = open_session(args, registry);

    print_header("Interactive");
    println!("Enter = take reading | 'summary' | 'stop' | 'quit'");
    println!("Goal: reach FLOATING (flat trend, coherence > 0.75)");
    println!();

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("[{}] > ", short_id(&id));
        if stdout.flush().is_err() {
            break;
        }

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {}
            Err(_) => break,
        }

        match line.trim().to_ascii_lowercase().as_str() {
            "" => match registry.get_reading(&id) {
                Ok(reading) => {
                    print_reading(&reading, args);
                    if reading.needle_state == NeedleState::Floating && !args.json {
                        println!("{}", "  ✓ FLOATING NEEDLE".green().bold());
                    }
                }
                Err(e) => println!("{}", format!("  ⚠ {} ({})", e, e.code()).yellow()),
            },
            "summary" => match registry.get_session_summary(&id) {
                Ok(summary) => print_summary(&summary, args),
                Err(e) => println!("  ⚠ {}", e),
            },
            "stop" => match registry.stop_session(&id) {
                Ok(summary) => print_summary(&summary, args),
                Err(e) => println!("{}", format!("  ⚠ {} ({})", e, e.code()).yellow()),
            },
            "quit" | "exit" => break,
            other => println!("  unknown command: {}", other),
        }
    }

    if let Ok(summary) = registry.get_session_summary(&id) {
        println!("\nSession ended. Readings: {}", summary.total_readings);
    }
}

/// Run HTTP API server
async fn run_serve(args: &Args, registry: Arc<SessionRegistry>) {
    println!();
    println!("{}", format!("Attunement API Server v{}", VERSION).bold());
    println!();

    if let Err(e) = run_server(&args.addr, registry).await {
        eprintln!("Server error: {}", e);
        std::process::exit(1);
    }
}

fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

/// Print header
fn print_header(mode: &str) {
    println!("{}", "========================================".bold());
    println!("{}", format!("  Attunement v{} - {}", VERSION, mode).bold());
    println!("{}", "========================================".bold());
    println!();
}

fn print_reading(reading: &Reading, args: &Args) {
    if args.json {
        match serde_json::to_string(reading) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Serialization failed: {}", e),
        }
    } else if args.no_color {
        println!("{}", reading.to_parseable_string());
    } else {
        println!("{}", reading.to_terminal_string());
    }
}

fn print_summary(summary: &SessionSummary, args: &Args) {
    if args.json {
        match serde_json::to_string_pretty(summary) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Serialization failed: {}", e),
        }
        return;
    }

    let fmt_opt = |v: Option<f64>| v.map_or_else(|| "-".to_string(), |v| format!("{:.3}", v));

    println!();
    println!("{}", "┌─────────────────────────────────────┐".bold());
    println!("│ Session {}", summary.session_id);
    println!("│ Active: {} | Readings: {} (retained {})",
        summary.active, summary.total_readings, summary.history_len);
    println!("│ Duration: {:.1}s", summary.duration_secs);
    println!("├─────────────────────────────────────┤");
    for state in NeedleState::ALL {
        let line = format!("│   {:<10} {}", state.to_string(), summary.state_counts.get(state));
        println!("{}", line.color(state.color()));
    }
    println!("├─────────────────────────────────────┤");
    println!("│ Tone arm: mean {} | peak {}", fmt_opt(summary.mean_tone_arm), fmt_opt(summary.peak_tone_arm));
    println!("│ Coherence: mean {}", fmt_opt(summary.mean_coherence));
    println!("│ Floating: {} | score mean {} | peak {}",
        summary.floating_count, fmt_opt(summary.mean_floating_score), fmt_opt(summary.peak_floating_score));
    println!("{}", "└─────────────────────────────────────┘".bold());
}
