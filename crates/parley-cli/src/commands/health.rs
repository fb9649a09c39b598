use anyhow::{Result, bail};
use colored::Colorize;
use parley_core::ClientConfig;
use parley_core::ports::AgentService;
use parley_interaction::HttpAgentService;

pub async fn run(config: &ClientConfig) -> Result<()> {
    let service = HttpAgentService::new(config)?;
    match service.health().await {
        Ok(()) => {
            println!("{} {}", "ok".green().bold(), config.normalized_base_url());
            Ok(())
        }
        Err(e) => {
            println!("{} {}", "unreachable".red().bold(), config.normalized_base_url());
            bail!(e.user_message())
        }
    }
}
