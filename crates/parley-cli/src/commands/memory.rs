use anyhow::Result;
use colored::Colorize;
use parley_core::ClientConfig;
use parley_core::ports::AgentService;
use parley_core::session::MemoryBlock;
use parley_interaction::HttpAgentService;

const PREVIEW_CHARS: usize = 200;

pub async fn run(config: &ClientConfig, agent_id: &str, project: Option<&str>) -> Result<()> {
    let service = HttpAgentService::new(config)?;
    let blocks = service.memory(agent_id, project).await?;

    if blocks.is_empty() {
        println!("{}", format!("Agent {agent_id} has no memory blocks.").bright_black());
        return Ok(());
    }
    println!("{}", format!("Memory blocks for agent {agent_id}:").green());
    for block in &blocks {
        println!("  {}", format_block(block));
    }
    Ok(())
}

fn format_block(block: &MemoryBlock) -> String {
    let preview = block.preview(PREVIEW_CHARS);
    let ellipsis = if preview.len() < block.value.len() { "…" } else { "" };
    format!("{} {preview}{ellipsis}", format!("{}:", block.label).cyan())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_block_truncates_long_values() {
        colored::control::set_override(false);
        assert_eq!(format_block(&MemoryBlock::new("persona", "terse")), "persona: terse");

        let long = MemoryBlock::new("human", "x".repeat(250));
        let line = format_block(&long);
        assert!(line.ends_with('…'));
        assert_eq!(line.chars().filter(|c| *c == 'x').count(), PREVIEW_CHARS);
    }
}
