//! Line editor loop for `parley chat`.

use std::borrow::Cow::{self, Borrowed, Owned};

use colored::Colorize;
use parley_application::{ControllerEvent, RuntimeHandle};
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{Context, Editor, Helper};

const COMMANDS: [&str; 5] = ["/agent", "/verbose", "/older", "/help", "/quit"];

/// One parsed line of input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplInput {
    Message(String),
    Agent(String),
    Verbose,
    Older,
    Help,
    Quit,
    Unknown(String),
    Empty,
}

impl ReplInput {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Self::Empty;
        }
        let Some(command) = line.strip_prefix('/') else {
            return Self::Message(line.to_string());
        };

        let (name, rest) = command.split_once(char::is_whitespace).unwrap_or((command, ""));
        match name {
            "agent" if !rest.trim().is_empty() => Self::Agent(rest.trim().to_string()),
            "verbose" => Self::Verbose,
            "older" => Self::Older,
            "help" => Self::Help,
            "quit" | "exit" => Self::Quit,
            _ => Self::Unknown(line.to_string()),
        }
    }
}

#[derive(Clone)]
struct ReplHelper;

impl Helper for ReplHelper {}

impl Completer for ReplHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let line = &line[..pos];
        if !line.starts_with('/') {
            return Ok((0, vec![]));
        }
        let candidates = COMMANDS
            .iter()
            .filter(|cmd| cmd.starts_with(line))
            .map(|cmd| Pair {
                display: cmd.to_string(),
                replacement: cmd.to_string(),
            })
            .collect();
        Ok((0, candidates))
    }
}

impl Highlighter for ReplHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if line.starts_with('/') {
            Owned(line.bright_cyan().to_string())
        } else {
            Borrowed(line)
        }
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

impl Hinter for ReplHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        let line = &line[..pos];
        if !line.starts_with('/') || line.contains(' ') {
            return None;
        }
        COMMANDS
            .iter()
            .find(|cmd| cmd.starts_with(line) && cmd.len() > line.len())
            .map(|cmd| cmd[line.len()..].to_string())
    }
}

impl Validator for ReplHelper {}

fn print_help() {
    println!("{}", "Type a message and press Enter to send it.".bright_black());
    println!("{}", "  /agent <id>  switch to another agent".bright_black());
    println!("{}", "  /verbose     toggle reasoning and tool output".bright_black());
    println!("{}", "  /older       load earlier messages".bright_black());
    println!("{}", "  /quit        leave".bright_black());
}

/// Reads lines until `/quit` or end of input, forwarding each to the
/// controller. Blocks the calling thread.
pub fn run(handle: RuntimeHandle, project: Option<String>) -> anyhow::Result<()> {
    let mut editor = Editor::new()?;
    editor.set_helper(Some(ReplHelper));

    println!("{}", "=== Parley ===".bright_magenta().bold());
    print_help();
    println!();

    loop {
        let line = match editor.readline("» ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => {
                println!("{}", "CTRL-C detected. Type /quit to exit.".yellow());
                continue;
            }
            Err(ReadlineError::Eof) => break,
            Err(e) => {
                tracing::error!("[Runtime] Line editor failed: {}", e);
                break;
            }
        };

        let input = ReplInput::parse(&line);
        if !matches!(input, ReplInput::Empty) {
            let _ = editor.add_history_entry(line.as_str());
        }

        let delivered = match input {
            ReplInput::Empty => true,
            ReplInput::Quit => break,
            ReplInput::Help => {
                print_help();
                true
            }
            ReplInput::Unknown(command) => {
                println!("{}", format!("Unknown command: {command}").bright_black());
                true
            }
            ReplInput::Message(text) => {
                handle.dispatch(ControllerEvent::CompositionEdited(text))
                    && handle.dispatch(ControllerEvent::Submit)
            }
            ReplInput::Agent(agent_id) => handle.dispatch(ControllerEvent::SelectAgent {
                agent_id,
                project_id: project.clone(),
            }),
            ReplInput::Verbose => handle.dispatch(ControllerEvent::ToggleVerbose),
            ReplInput::Older => handle.dispatch(ControllerEvent::LoadOlder),
        };
        if !delivered {
            break;
        }
    }

    println!("{}", "Goodbye!".bright_green());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_input() {
        assert_eq!(ReplInput::parse("  hello there "), ReplInput::Message("hello there".to_string()));
        assert_eq!(ReplInput::parse("/agent  echo "), ReplInput::Agent("echo".to_string()));
        assert_eq!(ReplInput::parse("/agent"), ReplInput::Unknown("/agent".to_string()));
        assert_eq!(ReplInput::parse("/verbose"), ReplInput::Verbose);
        assert_eq!(ReplInput::parse("/exit"), ReplInput::Quit);
        assert_eq!(ReplInput::parse("   "), ReplInput::Empty);
        assert_eq!(ReplInput::parse("/nope x"), ReplInput::Unknown("/nope x".to_string()));
    }
}
