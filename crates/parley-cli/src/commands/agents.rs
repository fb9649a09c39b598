use anyhow::Result;
use colored::Colorize;
use parley_core::ClientConfig;
use parley_core::ports::AgentService;
use parley_interaction::HttpAgentService;

pub async fn run(config: &ClientConfig, project: Option<&str>) -> Result<()> {
    let service = HttpAgentService::new(config)?;
    let agents = service.list_agents(project).await?;

    if agents.is_empty() {
        println!("{}", "No agents found.".bright_black());
        return Ok(());
    }
    for agent in &agents {
        if agent.label() == agent.id {
            println!("{}", agent.id.bright_cyan());
        } else {
            println!("{}  {}", agent.id.bright_cyan(), agent.label());
        }
    }
    Ok(())
}
