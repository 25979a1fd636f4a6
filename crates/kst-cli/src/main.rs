use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use kst_core::document::Graph;
use kst_core::downset::KnowledgeStructure;
use kst_core::{analytics, path as path_synth, relation, validator, CheckMessage};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "kst")]
#[command(about = "Knowledge Space Theory engine: validate, closure, enumerate, paths, analytics, cycles, stats")]
#[command(version)]
struct Cli {
    /// Raise the tracing filter to debug (ignored if RUST_LOG is set).
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Tracing output format.
    #[arg(long, global = true, value_enum, default_value = "pretty")]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, ValueEnum)]
enum LogFormat {
    Pretty,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Print grouped fail/warn/pass checks and a summary line.
    Validate { path: PathBuf },
    /// List missing transitive edges; with --apply, append and save them.
    Closure {
        path: PathBuf,
        #[arg(long)]
        apply: bool,
    },
    /// Enumerate the knowledge structure; with --save, attach it to the document.
    Enumerate {
        path: PathBuf,
        #[arg(long)]
        max: Option<usize>,
        #[arg(long)]
        save: bool,
    },
    /// Synthesize one learning path per scoring strategy.
    Paths { path: PathBuf },
    /// Print top target items ranked by score/mastery/fringe count.
    Analytics { path: PathBuf },
    /// Print directed cycles, or report that none exist.
    Cycles { path: PathBuf },
    /// Print counts of items/relations/states/paths/students/competences.
    Stats { path: PathBuf },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli);

    let result = match &cli.command {
        Commands::Validate { path } => cmd_validate(path),
        Commands::Closure { path, apply } => cmd_closure(path, *apply),
        Commands::Enumerate { path, max, save } => cmd_enumerate(path, *max, *save),
        Commands::Paths { path } => cmd_paths(path),
        Commands::Analytics { path } => cmd_analytics(path),
        Commands::Cycles { path } => cmd_cycles(path),
        Commands::Stats { path } => cmd_stats(path),
    };

    match result {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{} {err:#}", "error:".red().bold());
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(cli: &Cli) {
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let builder = fmt().with_env_filter(filter);
    match cli.log_format {
        LogFormat::Json => {
            builder.json().init();
        }
        LogFormat::Pretty => {
            builder.init();
        }
    }
}

fn load(path: &Path) -> Result<Graph> {
    Graph::load(path).with_context(|| format!("loading document at {}", path.display()))
}

fn print_bucket(label: &str, messages: &[CheckMessage]) {
    for msg in messages {
        let head = format!("[{label}] {}", msg.name);
        let head = match label {
            "FAIL" => head.red().bold(),
            "WARN" => head.yellow(),
            _ => head.green(),
        };
        println!("{head}: {}", msg.detail);
        for example in &msg.examples {
            println!("    - {example}");
        }
    }
}

fn cmd_validate(path: &Path) -> Result<ExitCode> {
    let graph = load(path)?;
    let report = validator::validate(&graph);
    print_bucket("FAIL", &report.fail);
    print_bucket("WARN", &report.warn);
    print_bucket("PASS", &report.pass);
    println!("{} fail, {} warn, {} pass", report.fail.len(), report.warn.len(), report.pass.len());
    Ok(if report.is_success() { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

fn cmd_closure(path: &Path, apply: bool) -> Result<ExitCode> {
    let mut graph = load(path)?;
    let missing = relation::transitive_closure(&graph);
    if missing.is_empty() {
        println!("transitive closure is already complete");
    } else {
        println!("{} missing transitive edge(s):", missing.len());
        for edge in &missing {
            println!("  {} -> {}", edge.prerequisite, edge.target);
        }
        if apply {
            let appended = graph.append_edges(missing);
            graph.save(path).with_context(|| format!("saving {}", path.display()))?;
            println!("appended {appended} edge(s) and saved {}", path.display());
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_enumerate(path: &Path, max: Option<usize>, save: bool) -> Result<ExitCode> {
    let mut graph = load(path)?;
    let max_states = max.unwrap_or(kst_core::DEFAULT_MAX_STATES);
    let ks = KnowledgeStructure::build_with_ceiling(&graph, max_states);
    let domain_size = graph.items().len();
    let density = ks.len() as f64 / 2f64.powi(domain_size as i32);
    println!("{} knowledge state(s) over {domain_size} item(s), density {density:.6}", ks.len());
    if ks.truncated() {
        println!("{}", "warning: enumeration truncated at the max_states ceiling".yellow());
    }
    if save {
        graph.attach_knowledge_states(ks.to_records());
        graph.save(path).with_context(|| format!("saving {}", path.display()))?;
        println!("attached {} state(s) and saved {}", ks.len(), path.display());
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_paths(path: &Path) -> Result<ExitCode> {
    let graph = load(path)?;
    let ks = KnowledgeStructure::build(&graph);
    for synthesized in path_synth::synthesize_all(&graph, &ks, 5) {
        let shortfall = if synthesized.full { "" } else { " (partial)" };
        println!(
            "{:<14} len={}{shortfall}: {}",
            synthesized.strategy,
            synthesized.items.len(),
            synthesized.items.join(" -> ")
        );
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_analytics(path: &Path) -> Result<ExitCode> {
    let graph = load(path)?;
    match analytics::aggregate(&graph) {
        analytics::AnalyticsResult::NoData => {
            println!("{}", "no student snapshots attached to this document".yellow());
            Ok(ExitCode::FAILURE)
        }
        analytics::AnalyticsResult::Data(report) => {
            println!("{} student(s), {} cluster(s)", report.student_count, report.clusters.len());
            println!("top target items:");
            for (id, score) in report.top_targets(10) {
                let mastery = report.mastery_rates.get(&id).copied().unwrap_or_default();
                let fringe = report.outer_fringe_freq.get(&id).copied().unwrap_or_default();
                println!("  {id:<12} score={score:.4} mastery={mastery:.2} fringe_count={fringe}");
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn cmd_cycles(path: &Path) -> Result<ExitCode> {
    let graph = load(path)?;
    let cycles = relation::detect_cycles(&graph);
    if cycles.is_empty() {
        println!("no cycles");
        Ok(ExitCode::SUCCESS)
    } else {
        for cycle in &cycles {
            println!("{}", cycle.join(" -> "));
        }
        Ok(ExitCode::FAILURE)
    }
}

fn cmd_stats(path: &Path) -> Result<ExitCode> {
    let graph = load(path)?;
    let ks = KnowledgeStructure::build(&graph);
    let paths = path_synth::synthesize_all(&graph, &ks, 5);
    println!("items:       {}", graph.items().len());
    println!("relations:   {}", graph.edges().len());
    println!("states:      {}", ks.len());
    println!("paths:       {}", paths.len());
    println!("students:    {}", graph.student_states().len());
    println!("competences: {}", graph.competences().len());
    Ok(ExitCode::SUCCESS)
}
