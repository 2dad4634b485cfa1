//! CLI entrypoint for foreman
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use foreman_application::CoordinatorService;
use foreman_application::ports::event_publisher::EventPublisher;
use foreman_application::ports::instance_store::{CollaborationStore, InstanceStore};
use foreman_domain::SessionRepository;
use foreman_infrastructure::{
    BroadcastEventPublisher, ConfigLoader, FileConfig, HttpInferenceGateway, JsonlStateStore,
    TokenOverlapMemoryStore,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "foreman", version, about = "Coordinator for planning sessions and agent teams")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Explicit config file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Ignore all config files and use built-in defaults
    #[arg(long, global = true)]
    no_config: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Submit one user turn to a session and print the decision
    SubmitTurn {
        /// Session identifier
        session: String,
        /// The user's message
        text: String,
        /// Print the raw JSON view instead of a summary
        #[arg(long)]
        json: bool,
    },
    /// Show a session's phase, slots, and pending decision
    Session {
        session: String,
        #[arg(long)]
        json: bool,
    },
    /// Create agents for the given roles in a session
    CreateAgents {
        session: String,
        /// Role names from the catalog
        #[arg(required = true)]
        roles: Vec<String>,
    },
    /// Run a moderated collaboration toward a goal
    Collaborate {
        session: String,
        goal: String,
        #[arg(long)]
        json: bool,
    },
    /// Close a session and retire its agents
    Close {
        session: String,
    },
    /// Show which config files are in effect
    ConfigSources,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity level
    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"), // -vvv or more
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    if let Command::ConfigSources = cli.command {
        ConfigLoader::print_config_sources();
        return Ok(());
    }

    let config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_ref()).map_err(|e| anyhow::anyhow!(e))?
    };

    let coordinator = build_coordinator(&config)?;

    match cli.command {
        Command::SubmitTurn { session, text, json } => {
            info!(session = %session, "submitting turn");
            let view = coordinator.submit_turn(&session, &text).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&view)?);
            } else {
                println!("[{} / {}] {}", view.phase, view.tier, view.message);
            }
        }
        Command::Session { session, json } => {
            let view = coordinator.get_session(&session).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&view)?);
            } else {
                println!("session {} ({} turns), phase {}", view.id, view.turns, view.phase);
                for (name, value) in &view.slots {
                    let marker = if view.assumed_slots.contains(name) {
                        " (assumed)"
                    } else {
                        ""
                    };
                    println!("  {name}: {value}{marker}");
                }
                if let Some(pending) = &view.pending_decision {
                    println!("  awaiting confirmation: {pending}");
                }
            }
        }
        Command::Close { session } => {
            let retired = coordinator.close_session(&session).await?;
            println!("closed {session}, retired {retired} agents");
        }
        Command::CreateAgents { session, roles } => {
            let outcome = coordinator.create_agents(&session, &roles).await;
            println!("{}", outcome.describe());
            for agent in &outcome.created {
                println!("  {} ({})", agent.id, agent.role);
            }
        }
        Command::Collaborate { session, goal, json } => {
            let collab = coordinator.run_collaboration(&session, &goal).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&collab)?);
            } else {
                println!("collaboration {}: {}", collab.id, collab.describe());
                for entry in &collab.transcript {
                    if entry.skipped {
                        println!("  [round {}] {} skipped: {}", entry.round, entry.agent_id, entry.content);
                    } else {
                        println!("  [round {}] {}:\n{}", entry.round, entry.agent_id, indent(&entry.content));
                    }
                }
            }
        }
        Command::ConfigSources => {}
    }

    Ok(())
}

/// Wire the coordination core from configuration.
fn build_coordinator(config: &FileConfig) -> Result<CoordinatorService> {
    let store = Arc::new(
        JsonlStateStore::open(&config.storage.state_dir)
            .context("opening state store")?,
    );
    let memory = match &config.storage.memory_journal {
        Some(path) => Arc::new(TokenOverlapMemoryStore::with_journal(path)),
        None => Arc::new(TokenOverlapMemoryStore::new()),
    };
    let publisher: Arc<dyn EventPublisher> =
        Arc::new(BroadcastEventPublisher::new(config.events.channel_capacity));

    Ok(CoordinatorService::new(
        Arc::new(HttpInferenceGateway::new(config.endpoints())),
        memory,
        Arc::clone(&store) as Arc<dyn SessionRepository>,
        Arc::clone(&store) as Arc<dyn InstanceStore>,
        store as Arc<dyn CollaborationStore>,
        publisher,
        Arc::new(config.catalog()),
        config.engine.clone(),
    ))
}

fn indent(text: &str) -> String {
    text.lines()
        .map(|l| format!("    {l}"))
        .collect::<Vec<_>>()
        .join("\n")
}
