//! Research binary entry point.
//!
//! This binary fetches papers for a research question, ranks them by relevance
//! and reports the consensus of the literature. It supports both single-question
//! and interactive REPL modes, with flexible output formatting (table or JSON).
//!
//! # Examples
//!
//! Single question against the Semantic Scholar API:
//! ```bash
//! research --question "Does caffeine improve endurance performance?"
//! ```
//!
//! Offline run over a JSON file of papers:
//! ```bash
//! research --input papers.json --question "sleep and memory" --format json
//! ```
//!
//! Interactive mode:
//! ```bash
//! research --interactive
//! ```

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::{Parser, ValueEnum};
use comfy_table::{presets::UTF8_FULL, Attribute, Cell, Color, ContentArrangement, Table};
use indicatif::{ProgressBar, ProgressStyle};
use paper_consensus::{
    config::AnalysisConfig,
    models::{ConsensusVerdict, PaperRecord, RelevanceLevel},
    pipeline::{AnalysisReport, AnalyzedPaper, ProgressEvent, ProgressListener, ResearchSession, SearchOutcome},
    provider::{JsonFileProvider, PaperProvider, ProviderResult, SemanticScholarProvider},
};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Wrapper enum for paper providers to allow choosing one at runtime
enum DynamicProvider {
    SemanticScholar(SemanticScholarProvider),
    JsonFile(JsonFileProvider),
}

#[async_trait]
impl PaperProvider for DynamicProvider {
    async fn search(&self, query: &str, limit: usize) -> ProviderResult<Vec<PaperRecord>> {
        match self {
            DynamicProvider::SemanticScholar(p) => p.search(query, limit).await,
            DynamicProvider::JsonFile(p) => p.search(query, limit).await,
        }
    }

    fn name(&self) -> &str {
        match self {
            DynamicProvider::SemanticScholar(p) => p.name(),
            DynamicProvider::JsonFile(p) => p.name(),
        }
    }
}

/// Output format for reports
#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    /// Human-friendly table with colored relevance levels
    Table,
    /// Machine-readable JSON format
    Json,
}

/// Research CLI for scoring papers against a question
#[derive(Parser, Debug)]
#[command(
    name = "research",
    version,
    about = "Rank papers for a research question and estimate the consensus",
    long_about = "Fetch papers for a research question, rank them by TF-IDF relevance, \
                  group them into themes and estimate whether the literature supports the question.

EXAMPLES:
  Single question:
    research --question \"Does caffeine improve endurance performance?\"

  Offline, JSON output:
    research --input papers.json --question \"sleep and memory\" --format json

  Interactive mode:
    research --interactive

  Custom thresholds:
    research --config analysis.toml --question \"intermittent fasting weight loss\""
)]
struct Args {
    /// Research question (required for single-question mode)
    #[arg(long, value_name = "TEXT", conflicts_with = "interactive")]
    question: Option<String>,

    /// Number of papers to fetch (defaults to the configured value)
    #[arg(long, value_name = "N")]
    papers: Option<usize>,

    /// Read papers from a JSON file instead of the Semantic Scholar API
    #[arg(long, value_name = "PATH")]
    input: Option<PathBuf>,

    /// TOML configuration file
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value = "table")]
    format: OutputFormat,

    /// Enable interactive REPL mode
    #[arg(long, short = 'i')]
    interactive: bool,

    /// Logging verbosity level
    #[arg(long, default_value = "warn", value_name = "LEVEL")]
    log_level: String,
}

/// Setup logging with the specified level
fn setup_logging(log_level: &str) {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(log_level)),
        )
        .init();
}

/// Progress bar driven by pipeline events
struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    fn new() -> Result<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
                .with_context(|| "Invalid progress bar template")?
                .progress_chars("##-"),
        );
        Ok(Self { bar })
    }
}

impl ProgressListener for BarProgress {
    fn on_event(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::Fetching { query } => {
                self.bar.set_message(format!("fetching papers for '{}'", query));
            }
            ProgressEvent::Fetched { count } => {
                self.bar.set_length(*count as u64);
                self.bar.set_message(format!("fetched {} papers", count));
            }
            ProgressEvent::Scored { papers } => {
                self.bar.set_length(*papers as u64);
                self.bar.set_message("summarizing");
            }
            ProgressEvent::Summarized { done, .. } => {
                self.bar.set_position(*done as u64);
            }
            ProgressEvent::Finished => {
                self.bar.finish_and_clear();
            }
        }
    }
}

/// Build the provider: the JSON file when given, the API otherwise
fn create_provider(config: &AnalysisConfig, input: Option<PathBuf>) -> Result<DynamicProvider> {
    match input {
        Some(path) => {
            if !path.exists() {
                anyhow::bail!("Input file not found: {}", path.display());
            }
            info!("Reading papers from: {}", path.display());
            Ok(DynamicProvider::JsonFile(JsonFileProvider::new(path)))
        }
        None => {
            info!("Using Semantic Scholar API at {}", config.search.base_url);
            let provider = SemanticScholarProvider::new(config.search.clone())
                .with_context(|| "Failed to create Semantic Scholar client")?;
            Ok(DynamicProvider::SemanticScholar(provider))
        }
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        let head: String = text.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}

fn verdict_color(verdict: ConsensusVerdict) -> Color {
    match verdict {
        ConsensusVerdict::StrongPositive | ConsensusVerdict::ModeratePositive => Color::Green,
        ConsensusVerdict::Mixed => Color::Yellow,
        ConsensusVerdict::ModerateNegative | ConsensusVerdict::StrongNegative => Color::Red,
        ConsensusVerdict::InsufficientData | ConsensusVerdict::Error => Color::White,
    }
}

/// Format the ranked papers as a pretty table
fn format_papers_table(papers: &[AnalyzedPaper]) -> String {
    if papers.is_empty() {
        return "No papers found.".to_string();
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("Rank").add_attribute(Attribute::Bold),
        Cell::new("Title").add_attribute(Attribute::Bold),
        Cell::new("Authors").add_attribute(Attribute::Bold),
        Cell::new("Year").add_attribute(Attribute::Bold),
        Cell::new("Relevance").add_attribute(Attribute::Bold),
        Cell::new("Score").add_attribute(Attribute::Bold),
        Cell::new("Confidence").add_attribute(Attribute::Bold),
        Cell::new("Cluster").add_attribute(Attribute::Bold),
    ]);

    for (idx, analyzed) in papers.iter().enumerate() {
        let scored = &analyzed.scored;
        let color = match scored.relevance {
            RelevanceLevel::High => Color::Green,
            RelevanceLevel::Medium => Color::Yellow,
            RelevanceLevel::Low => Color::White,
        };

        table.add_row(vec![
            Cell::new(idx + 1),
            Cell::new(truncate(&scored.paper.title, 60)),
            Cell::new(truncate(&scored.paper.authors.join(", "), 40)),
            Cell::new(scored.paper.year),
            Cell::new(scored.relevance.as_str()).fg(color),
            Cell::new(format!("{:.4}", scored.scores.relevance)),
            Cell::new(format!("{:.2}", scored.scores.confidence)),
            Cell::new(scored.scores.cluster),
        ]);
    }

    table.to_string()
}

/// Format the consensus block shown under the table
fn format_consensus(report: &AnalysisReport) -> String {
    let consensus = &report.consensus;
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("Consensus").add_attribute(Attribute::Bold),
        Cell::new(consensus.verdict.as_str())
            .fg(verdict_color(consensus.verdict))
            .add_attribute(Attribute::Bold),
    ]);
    table.add_row(vec![
        Cell::new("Positive evidence"),
        Cell::new(format!("{:.1}%", consensus.percentage)),
    ]);
    table.add_row(vec![
        Cell::new("Confidence"),
        Cell::new(format!("{:.2}", consensus.confidence)),
    ]);
    table.add_row(vec![
        Cell::new("Clusters"),
        Cell::new(report.insights.cluster_count),
    ]);
    table.add_row(vec![
        Cell::new("Recent papers"),
        Cell::new(format!("{:.0}%", report.insights.recent_papers_ratio * 100.0)),
    ]);

    let mut out = table.to_string();
    out.push('\n');
    out.push_str(&consensus.explanation);
    if report.stats.is_degraded() {
        out.push_str("\n(some scores fell back to defaults; run with --log-level warn for details)");
    }
    out
}

/// Format the full report as JSON
fn format_report_json(report: &AnalysisReport) -> Result<String> {
    serde_json::to_string_pretty(report)
        .with_context(|| "Failed to serialize report to JSON")
}

/// Display detailed view of a single paper
fn display_paper_detail(analyzed: &AnalyzedPaper, rank: usize) {
    let paper = &analyzed.scored.paper;
    let summary = &analyzed.summary;

    println!("\n{}", "═".repeat(80));
    println!("Rank: {}", rank);
    println!("Title: {}", paper.title);
    println!("Authors: {}", paper.authors.join(", "));
    println!("Year: {}", paper.year);
    if let Some(venue) = &paper.venue {
        println!("Venue: {}", venue);
    }
    println!("Citations: {}", paper.citation_count);
    println!("Relevance: {}", summary.relevance.as_str());
    println!("Scores: {}", summary.scores);
    println!("Evidence: {}", summary.evidence_strength.as_str());
    if let Some(url) = paper.url.as_ref().or(paper.pdf_url.as_ref()) {
        println!("URL: {}", url);
    }
    println!("\nKey finding:\n{}", summary.key_finding);
    println!("\nImplications:\n{}", summary.implications);
    println!("\nAbstract:\n{}", paper.abstract_text);
    println!("{}", "═".repeat(80));
}

fn print_report(report: &AnalysisReport, format: &OutputFormat, elapsed_secs: f64) -> Result<()> {
    match format {
        OutputFormat::Table => {
            println!("{}", format_papers_table(&report.papers));
            println!("{}", format_consensus(report));
            println!(
                "\nAnalyzed {} papers in {:.2}s",
                report.papers.len(),
                elapsed_secs
            );
        }
        OutputFormat::Json => {
            println!("{}", format_report_json(report)?);
        }
    }
    Ok(())
}

/// Run one search through the session and print the outcome
async fn run_search(
    session: &mut ResearchSession,
    provider: &DynamicProvider,
    question: &str,
    papers: usize,
    format: &OutputFormat,
) -> Result<()> {
    let progress = BarProgress::new()?;
    let start = Instant::now();

    let outcome = session
        .search(question, papers, provider, &progress)
        .await
        .with_context(|| format!("Failed to analyze question: '{}'", question))?;
    progress.bar.finish_and_clear();

    match outcome {
        SearchOutcome::Completed(report) => {
            print_report(&report, format, start.elapsed().as_secs_f64())?;
        }
        SearchOutcome::NoResults => match format {
            OutputFormat::Table => println!("No papers found for '{}'.", question),
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&SearchOutcome::NoResults)?),
        },
        SearchOutcome::FetchFailed(reason) => {
            eprintln!("Search failed: {}", reason);
        }
    }

    Ok(())
}

fn print_help() {
    println!("Commands:");
    println!("  <text>           - Ask a follow-up question about the last search");
    println!("  /search QUESTION - Search for papers and analyze them");
    println!("  /papers N        - Set number of papers to fetch");
    println!("  /similar N       - Show papers similar to rank N");
    println!("  /detail N        - Show full details for rank N");
    println!("  /history         - Show search history");
    println!("  /help            - Show this help");
    println!("  Ctrl+D or Ctrl+C - Exit");
}

fn print_history(session: &ResearchSession) {
    let stats = session.history().stats();
    if stats.total_searches == 0 {
        println!("No searches yet.");
        return;
    }

    println!(
        "{} searches, {:.1} papers per search on average",
        stats.total_searches, stats.avg_papers_per_search
    );
    for (verdict, count) in &stats.verdict_distribution {
        println!("  {}: {}", verdict, count);
    }
    println!("Recent:");
    for entry in &stats.recent {
        println!(
            "  [{}] {} ({} papers, {}, confidence {:.2})",
            entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
            entry.question,
            entry.paper_count,
            entry.verdict,
            entry.confidence
        );
    }
}

/// Run interactive REPL mode
async fn run_interactive(
    mut session: ResearchSession,
    provider: DynamicProvider,
    mut papers: usize,
    format: OutputFormat,
) -> Result<()> {
    println!("Interactive Research Assistant");
    print_help();
    println!();

    let mut rl = DefaultEditor::new()
        .with_context(|| "Failed to create readline editor")?;

    loop {
        let readline = rl.readline("Research> ");
        match readline {
            Ok(line) => {
                let line = line.trim();

                if line.is_empty() {
                    continue;
                }

                rl.add_history_entry(line)
                    .ok(); // Ignore errors from adding to history

                if let Some(command) = line.strip_prefix('/') {
                    let (name, rest) = command
                        .split_once(char::is_whitespace)
                        .map(|(name, rest)| (name, rest.trim()))
                        .unwrap_or((command, ""));

                    match name {
                        "help" => print_help(),
                        "search" => {
                            if rest.is_empty() {
                                eprintln!("Usage: /search QUESTION");
                                continue;
                            }
                            if let Err(e) = run_search(&mut session, &provider, rest, papers, &format).await {
                                eprintln!("{:#}", e);
                            }
                        }
                        "papers" => match rest.parse::<usize>() {
                            Ok(n) if n > 0 => {
                                papers = n.min(session.config().search.max_papers);
                                println!("Set paper count to {}", papers);
                            }
                            _ => eprintln!("Invalid number: must be a positive integer"),
                        },
                        "similar" => match rest.parse::<usize>() {
                            Ok(rank) if rank > 0 => {
                                let similar = session.similar_papers(rank, 5);
                                if similar.is_empty() {
                                    eprintln!("No similar papers for rank {}", rank);
                                }
                                for s in similar {
                                    println!(
                                        "  #{} {} (similarity {:.3})",
                                        s.rank, s.paper.scored.paper.title, s.similarity
                                    );
                                }
                            }
                            _ => eprintln!("Usage: /similar N"),
                        },
                        "detail" => {
                            let count = session.last_report().map(|r| r.papers.len()).unwrap_or(0);
                            match rest.parse::<usize>() {
                                Ok(rank) if rank > 0 && rank <= count => {
                                    if let Some(report) = session.last_report() {
                                        display_paper_detail(&report.papers[rank - 1], rank);
                                    }
                                }
                                Ok(rank) if rank > count => {
                                    eprintln!("Rank {} out of range (last search had {} papers)",
                                        rank, count);
                                }
                                _ => eprintln!("Invalid rank: must be a positive integer"),
                            }
                        }
                        "history" => print_history(&session),
                        _ => eprintln!("Unknown command: /{}. Type /help for available commands.", name),
                    }
                } else {
                    println!("{}", session.ask(line));
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                println!("Goodbye!");
                break;
            }
            Err(err) => {
                error!("Error reading input: {}", err);
                break;
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    setup_logging(&args.log_level);

    let question = match (&args.question, args.interactive) {
        (Some(q), _) => Some(q.clone()),
        (None, true) => None,
        (None, false) => anyhow::bail!(
            "Either --question or --interactive must be specified.\n\
             Use --help for usage information."
        ),
    };

    let config = AnalysisConfig::load(args.config.as_deref())
        .with_context(|| "Failed to load configuration")?;

    let papers = args.papers.unwrap_or(config.search.default_papers);
    if papers == 0 {
        anyhow::bail!("--papers must be a positive integer");
    }

    let provider = create_provider(&config, args.input)?;
    info!("Using provider: {}", provider.name());

    let mut session = ResearchSession::new(config);

    match question {
        Some(question) => {
            run_search(&mut session, &provider, &question, papers, &args.format).await?;
        }
        None => {
            run_interactive(session, provider, papers, args.format).await?;
        }
    }

    Ok(())
}
