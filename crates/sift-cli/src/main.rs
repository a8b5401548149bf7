use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;
use sift_core::provider::{list_available_models, provider_info, ModelSource};
use sift_core::{Config, Message, ResearchGraph, ResearchProgress, ResearchState, RunOptions};
use tokio::sync::mpsc;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sift")]
#[command(about = "Iterative web research with cited answers", long_about = None)]
struct Cli {
    /// Config file to use instead of the default search path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print machine-readable JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Research a question and print a cited answer
    Ask {
        /// The question to research
        #[arg(required = true)]
        question: Vec<String>,

        /// Maximum reflection loops
        #[arg(long)]
        max_loops: Option<usize>,

        /// Number of search queries in the first wave
        #[arg(long)]
        initial_queries: Option<usize>,

        /// Model for reflection and the final answer
        #[arg(long)]
        reasoning_model: Option<String>,
    },
    /// Show the active provider
    Provider,
    /// List models offered by the active provider
    Models,
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::load()?,
    };
    debug!(provider = %config.active_provider, "Configuration loaded");

    match cli.command {
        Commands::Ask {
            question,
            max_loops,
            initial_queries,
            reasoning_model,
        } => {
            let options = RunOptions {
                initial_search_query_count: initial_queries,
                max_research_loops: max_loops,
                reasoning_model,
            };
            let state = ask(&config, question.join(" "), options, cli.json).await?;
            print_answer(&state, cli.json)?;
        }
        Commands::Provider => {
            let info = provider_info(&config.resolve()?);
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&info)?);
            } else {
                println!("Active provider: {}", info.active_provider);
                println!(
                    "Credentials:     {}",
                    if info.has_credentials { "configured" } else { "missing" }
                );
            }
        }
        Commands::Models => {
            let listing = list_available_models(&config.resolve()?).await;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&listing)?);
            } else {
                for model in &listing.models {
                    println!("{:<45} {}", model.id, model.display_name);
                }
                if listing.source == ModelSource::Fallback {
                    eprintln!(
                        "\n(fallback list: {})",
                        listing.error.as_deref().unwrap_or("live listing unavailable")
                    );
                }
            }
        }
    }

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn ask(
    config: &Config,
    question: String,
    options: RunOptions,
    quiet: bool,
) -> color_eyre::Result<ResearchState> {
    let provider = config.resolve()?;
    let (tx, rx) = mpsc::unbounded_channel();
    let graph = ResearchGraph::from_configuration(&provider, config.research.clone())?
        .with_progress(tx);

    let spinner = if quiet { None } else { Some(spinner()?) };
    let reporter = tokio::spawn(report_progress(rx, spinner));

    let state = graph.run(vec![Message::user(question)], options).await;
    // Closes the progress channel so the reporter can finish.
    drop(graph);
    reporter.await?;

    Ok(state?)
}

fn spinner() -> color_eyre::Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::with_template("{spinner:.cyan} {msg}")?);
    pb.enable_steady_tick(Duration::from_millis(100));
    Ok(pb)
}

async fn report_progress(
    mut rx: mpsc::UnboundedReceiver<ResearchProgress>,
    spinner: Option<ProgressBar>,
) {
    while let Some(event) = rx.recv().await {
        if let Some(pb) = &spinner {
            pb.set_message(describe(&event));
        }
    }
    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }
}

fn describe(event: &ResearchProgress) -> String {
    match event {
        ResearchProgress::GeneratingQueries => "Generating search queries...".to_string(),
        ResearchProgress::QueriesGenerated(queries) => {
            format!("Searching {} queries...", queries.len())
        }
        ResearchProgress::Searching { query, .. } => format!("Searching: {query}"),
        ResearchProgress::SearchCompleted { task_id, sources } => {
            format!("Search {task_id} found {sources} sources")
        }
        ResearchProgress::Reflecting { loop_count } => {
            format!("Reflecting on research (loop {loop_count})...")
        }
        ResearchProgress::Reflected {
            is_sufficient: true,
            ..
        } => "Research is sufficient".to_string(),
        ResearchProgress::Reflected {
            follow_up_queries, ..
        } => format!("Following up with {} queries...", follow_up_queries.len()),
        ResearchProgress::Finalizing => "Writing answer...".to_string(),
        ResearchProgress::Completed => "Done".to_string(),
    }
}

fn print_answer(state: &ResearchState, as_json: bool) -> color_eyre::Result<()> {
    let answer = state.final_answer().unwrap_or_default();
    let sources: Vec<_> = state.sources_gathered.values().collect();

    if as_json {
        let output = json!({
            "answer": answer,
            "sources": sources,
            "queries": state.search_queries,
            "research_loops": state.research_loop_count,
            "errors": state.errors,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("{answer}");
    if !sources.is_empty() {
        println!("\nSources:");
        for source in sources {
            println!("  - {}: {}", source.label, source.canonical_url);
        }
    }
    for error in &state.errors {
        eprintln!("warning: {error}");
    }
    Ok(())
}
