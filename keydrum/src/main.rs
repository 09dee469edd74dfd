// keydrum command-line front end.
//
// Reads a score file, compiles it, and prints the timeline. The pipeline:
// read bytes → parse (lenient, dropped lines logged) → compile → print
// and/or write MIDI. Keystroke playback and interactive score selection
// live outside this tool; `--format keys` prints the `<ms> <key>` lines a
// player consumes.
//
// Usage:
//   keydrum compile <SCORE> [--seed N] [--format table|json|keys] [--midi OUT] [--kit KIT]
//   keydrum info <SCORE>
//
// Logging goes to stderr. Set RUST_LOG (e.g. RUST_LOG=keydrum=debug) or
// pass -v to see dropped lines and skipped sections.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use keydrum::compiler::{Compiler, section_spans};
use keydrum::kit::KitConfig;
use keydrum::midi::write_midi;
use keydrum::parser::{ParseReport, parse_score_with_report};
use keydrum::score::{Score, TimedEvent};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Compile drum notation into timed note events
#[derive(Parser)]
#[command(name = "keydrum")]
#[command(version)]
struct Cli {
    /// Log debug detail (dropped lines, skipped sections)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a score and print its events
    Compile {
        /// Score file
        score: PathBuf,

        /// Override the score's SEED
        #[arg(long)]
        seed: Option<i64>,

        /// Output format
        #[arg(long, default_value = "table")]
        format: OutputFormat,

        /// Also write a Standard MIDI File
        #[arg(long)]
        midi: Option<PathBuf>,

        /// Kit mapping (JSON); defaults to the built-in kit
        #[arg(long)]
        kit: Option<PathBuf>,
    },

    /// Show header, sections, order, and dropped lines
    Info {
        /// Score file
        score: PathBuf,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
    Table,
    Json,
    Keys,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Compile {
            score,
            seed,
            format,
            midi,
            kit,
        } => cmd_compile(&score, seed, format, midi.as_deref(), kit.as_deref()),
        Commands::Info { score } => cmd_info(&score),
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_score(path: &Path) -> Result<(Score, ParseReport)> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let text = std::str::from_utf8(&bytes)
        .map_err(keydrum::ScoreError::from)
        .with_context(|| format!("decoding {}", path.display()))?;
    let parsed = parse_score_with_report(text).with_context(|| format!("parsing {}", path.display()))?;
    if !parsed.1.dropped.is_empty() {
        tracing::info!(count = parsed.1.dropped.len(), "ignored unrecognized lines");
    }
    Ok(parsed)
}

fn cmd_compile(
    path: &Path,
    seed: Option<i64>,
    format: OutputFormat,
    midi: Option<&Path>,
    kit: Option<&Path>,
) -> Result<()> {
    let (score, _) = load_score(path)?;
    let kit = match kit {
        Some(kit_path) => {
            KitConfig::load(kit_path).with_context(|| format!("loading kit {}", kit_path.display()))?
        }
        None => KitConfig::default(),
    };

    let events = match seed.or(score.header.seed) {
        Some(seed) => Compiler::with_seed(seed).compile(&score),
        None => Compiler::for_header(&score.header).compile(&score),
    };

    match format {
        OutputFormat::Table => print_table(&events, &kit),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&events)?),
        OutputFormat::Keys => {
            for event in &events {
                println!("{} {}", event.rounded_ms(), kit.entry(event.instrument).key);
            }
        }
    }

    if let Some(out) = midi {
        write_midi(&events, score.header.tempo_bpm, &kit, out)
            .with_context(|| format!("writing {}", out.display()))?;
        eprintln!("Wrote {} events to {}", events.len(), out.display());
    }

    Ok(())
}

fn print_table(events: &[TimedEvent], kit: &KitConfig) {
    println!("{:>10}  {:<4} {:<16} {:<4} {:>3}", "time_ms", "inst", "name", "key", "vel");
    for event in events {
        let entry = kit.entry(event.instrument);
        println!(
            "{:>10.2}  {:<4} {:<16} {:<4} {:>3}",
            event.time_ms, event.instrument, entry.name, entry.key, event.velocity
        );
    }
    println!("{} events", events.len());
}

fn cmd_info(path: &Path) -> Result<()> {
    let (score, report) = load_score(path)?;
    let h = &score.header;

    println!("=== {} ===", path.display());
    println!("Tempo: {} BPM", h.tempo_bpm);
    println!("Bars per section: {}", h.bars);
    println!("Grid: {}", h.grid);
    println!("Swing: {}", h.swing);
    match h.seed {
        Some(seed) => println!("Seed: {seed}"),
        None => println!("Seed: (random)"),
    }
    if let Some(ms) = h.humanize_ms {
        println!("Humanize: ±{ms}ms");
    }
    println!("Section length: {:.1}ms", score.section_ms());
    println!();

    println!("Sections:");
    for section in &score.sections {
        println!("  [{}] {} track(s)", section.name, section.tracks.len());
    }
    if let Some(order) = &score.order {
        println!("Order: {}", order.join(", "));
    }
    println!();

    println!("Timeline:");
    let spans = section_spans(&score);
    for span in &spans {
        println!("  {:>10.1}ms  {}", span.start_ms, span.name);
    }
    let total: f64 = spans.iter().map(|s| s.length_ms).sum();
    println!("  Total: {total:.1}ms");

    if !report.dropped.is_empty() {
        println!();
        println!("Ignored lines:");
        for dropped in &report.dropped {
            println!("  {:>4}: {}", dropped.line, dropped.text);
        }
    }

    Ok(())
}
