use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cortex_relay::config::{Config, PlannerConfig};
use cortex_relay::llm::{create_client, LlmClient};
use cortex_relay::planning::{GoalPlanner, OraclePlanner};
use cortex_relay::server;

#[derive(Parser)]
#[command(name = "cortex-relay")]
#[command(about = "Relay that turns browsing goals into commands for a browser extension", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the relay server
    Serve {
        /// Address to bind (default: from config)
        #[arg(long)]
        host: Option<String>,
        /// Port to listen on (default: from config)
        #[arg(short, long)]
        port: Option<u16>,
        /// Consult the LLM planner for ambiguous goals
        #[arg(long)]
        llm: bool,
    },
    /// Plan a goal without executing it and print the commands as JSON
    Plan {
        /// The goal, e.g. "go to google.com and search for cats"
        goal: String,
        /// Consult the LLM planner for ambiguous goals
        #[arg(long)]
        llm: bool,
    },
    /// Configure cortex-relay
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,
        /// Set the LLM model
        #[arg(long)]
        model: Option<String>,
        /// Enable or disable the LLM planner
        #[arg(long)]
        llm_enabled: Option<bool>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cortex_relay=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { host, port, llm } => {
            let mut config = Config::load()?;
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            config.planner.llm_enabled |= llm;

            let planner = build_planner(&config.planner).await;
            server::start_server(config, planner).await?;
        }
        Commands::Plan { goal, llm } => {
            let mut config = Config::load()?;
            config.planner.llm_enabled |= llm;

            let planner = build_planner(&config.planner).await;
            let plan = planner.plan(&goal, None).await;
            if plan.is_empty() {
                anyhow::bail!("Could not understand the goal: {}", goal);
            }
            println!("{}", serde_json::to_string_pretty(&plan)?);
        }
        Commands::Config {
            show,
            model,
            llm_enabled,
        } => {
            handle_config(show, model, llm_enabled)?;
        }
    }

    Ok(())
}

/// Rule-based planning, plus the LLM oracle when enabled and reachable
async fn build_planner(config: &PlannerConfig) -> GoalPlanner {
    if !config.llm_enabled {
        return GoalPlanner::rules_only();
    }

    let client: Arc<dyn LlmClient> = Arc::from(create_client(config));
    match client.test_connection().await {
        Ok(()) => {
            tracing::info!("🤖 LLM planner enabled with model {}", config.model);
            GoalPlanner::with_oracle(Arc::new(OraclePlanner::new(client)))
        }
        Err(e) => {
            tracing::warn!(
                "⚠️  LLM planner unavailable ({}), using rule-based planning only",
                e
            );
            GoalPlanner::rules_only()
        }
    }
}

fn handle_config(show: bool, model: Option<String>, llm_enabled: Option<bool>) -> Result<()> {
    if show {
        println!("Current configuration:");
        println!("{}", toml::to_string_pretty(&Config::load()?)?);
        return Ok(());
    }

    // Environment overrides must not leak into the saved file
    let mut config = Config::load_file()?;

    let mut changed = false;

    if let Some(m) = model {
        config.planner.model = m;
        changed = true;
        println!("Model updated");
    }

    if let Some(enabled) = llm_enabled {
        config.planner.llm_enabled = enabled;
        changed = true;
        println!("LLM planner {}", if enabled { "enabled" } else { "disabled" });
    }

    if changed {
        config.save()?;
        println!("Configuration saved to: {:?}", Config::config_path()?);
    } else {
        println!("No changes made. Use --show to view current configuration.");
    }

    Ok(())
}
