use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use parley_core::{ClientConfig, DeliveryMode};
use parley_infrastructure::ConfigService;

mod commands;
mod logging;
mod repl;
mod terminal;

#[derive(Parser)]
#[command(name = "parley")]
#[command(about = "Parley - talk to your agents from the terminal", long_about = None)]
struct Cli {
    /// Agent service base URL (overrides config and PARLEY_BASE_URL)
    #[arg(long, global = true)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive conversation
    Chat(ChatArgs),
    /// List the agents available in a project
    Agents {
        #[arg(long)]
        project: Option<String>,
    },
    /// Show an agent's memory blocks
    Memory {
        agent: String,
        #[arg(long)]
        project: Option<String>,
    },
    /// Check that the agent service is reachable
    Health,
}

#[derive(Args)]
pub struct ChatArgs {
    /// Agent to talk to (defaults to the service's configured agent)
    #[arg(long)]
    pub agent: Option<String>,
    #[arg(long)]
    pub project: Option<String>,
    /// Stream replies as they are produced
    #[arg(long)]
    pub progressive: bool,
    /// Show reasoning and tool traffic (remembered for later sessions)
    #[arg(long)]
    pub verbose: bool,
    /// Use the built-in echo agent instead of the service
    #[arg(long)]
    pub offline: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = ConfigService::new()?.load()?;
    apply_flags(&mut config, &cli);

    let offline = matches!(&cli.command, Commands::Chat(args) if args.offline);
    let mut diagnostics = logging::init(&config, offline)?;

    let outcome = match cli.command {
        Commands::Chat(args) => {
            let label = diagnostics.as_mut().and_then(|d| d.session_label.take());
            commands::chat::run(config, args, label).await
        }
        Commands::Agents { project } => commands::agents::run(&config, project.as_deref()).await,
        Commands::Memory { agent, project } => {
            commands::memory::run(&config, &agent, project.as_deref()).await
        }
        Commands::Health => commands::health::run(&config).await,
    };

    if let Some(diagnostics) = diagnostics {
        diagnostics.finish().await;
    }
    outcome
}

fn apply_flags(config: &mut ClientConfig, cli: &Cli) {
    if let Some(base_url) = &cli.base_url {
        config.base_url = base_url.clone();
    }
    if let Commands::Chat(args) = &cli.command
        && args.progressive
    {
        config.delivery_mode = DeliveryMode::Progressive;
    }
}
