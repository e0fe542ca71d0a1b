//! goalrun CLI - run an autonomous agent against a goal from the terminal.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use goalrun_agent::{ChannelSink, Run, StopReason};
use goalrun_llm::{LanguageBackend, OpenAiBackend, ScriptedBackend};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::StreamExt;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

mod config;
mod control;
mod render;

use config::RunArgs;
use render::Format;

/// Reply used by the offline backend for every request.
const OFFLINE_REPLY: &str = "Done.";

/// goalrun - autonomous goal runner
#[derive(Parser)]
#[command(name = "goalrun")]
#[command(about = "Plan a goal into tasks and execute them with a language model", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a run and follow it until it stops
    Run(RunArgs),
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout carries only run events.
    let default_filter = match cli.verbose {
        0 => "goalrun=info",
        1 => "goalrun=debug",
        _ => "goalrun=trace",
    };
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Run(args) => run(args).await?,
    }

    Ok(())
}

async fn run(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let backend: Arc<dyn LanguageBackend> = if args.offline {
        info!("Using offline backend");
        Arc::new(ScriptedBackend::new().with_default_reply(OFFLINE_REPLY))
    } else {
        let config = args
            .openai_config()
            .ok_or("no API key: set OPENAI_API_KEY, pass --api-key, or use --offline")?;
        info!(base_url = %config.base_url, model = %config.default_model, "Using OpenAI-compatible backend");
        Arc::new(OpenAiBackend::new(config)?)
    };

    let format = if args.json { Format::Json } else { Format::Text };

    let run = Run::new(args.name.clone(), args.goal.clone())?
        .with_language(args.language_name())
        .with_settings(args.model_settings())
        .with_config(args.agent_config())
        .with_mode(args.initial_mode());

    let (sink, events) = ChannelSink::new();
    let handle = run.start(backend, Arc::new(sink));
    info!(run_id = %handle.id(), name = %handle.name(), "Run started");

    let printer = tokio::spawn(async move {
        let mut events = UnboundedReceiverStream::new(events);
        while let Some(event) = events.next().await {
            render::print(&event, format);
        }
    });

    let commands = tokio::spawn(control::read_commands(handle.control()));

    let interrupt = handle.control();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("> interrupted, stopping");
            interrupt.stop();
        }
    });

    let report = handle.join().await?;
    commands.abort();
    ctrl_c.abort();
    // The channel closes once the run loop drops its sink.
    if let Err(e) = printer.await {
        warn!(error = %e, "Event printer failed");
    }

    if format == Format::Json {
        println!("{}", render::report_json(&report));
    } else {
        eprintln!(
            "Run \"{}\" stopped ({}) after {} task(s), {} left pending.",
            report.name,
            report.reason,
            report.loops,
            report.pending.len()
        );
    }

    if let Some(path) = &args.save {
        match report.snapshot() {
            Some(snapshot) => {
                std::fs::write(path, serde_json::to_string_pretty(&snapshot)?)?;
                eprintln!("Saved run to {}", path.display());
            }
            None => eprintln!(
                "Not saving: the run ended with {} before completing its goal.",
                report.reason
            ),
        }
    }

    if report.reason == StopReason::BackendFailure {
        return Err("run aborted after a backend failure".into());
    }
    Ok(())
}
