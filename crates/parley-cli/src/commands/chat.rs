use std::sync::Arc;

use anyhow::{Context, Result};
use parley_application::{ControllerEvent, ControllerRuntime, ConversationController, Platform};
use parley_core::ClientConfig;
use parley_core::ports::{AgentService, PreferenceRepository, VERBOSE_MODE_KEY};
use parley_infrastructure::TomlPreferenceStore;
use parley_interaction::{HttpAgentService, LoopbackAgentService};
use tokio::sync::watch;

use crate::ChatArgs;
use crate::repl;
use crate::terminal::{TerminalBell, TerminalView, UnsupportedRecognizer};

pub async fn run(
    config: ClientConfig,
    args: ChatArgs,
    session_label: Option<watch::Sender<Option<String>>>,
) -> Result<()> {
    let service: Arc<dyn AgentService> = if args.offline {
        Arc::new(LoopbackAgentService::new())
    } else {
        Arc::new(HttpAgentService::new(&config)?)
    };
    let preferences: Arc<dyn PreferenceRepository> = Arc::new(TomlPreferenceStore::new()?);
    if args.verbose {
        preferences.set_bool(VERBOSE_MODE_KEY, true).await?;
    }

    let platform = Platform {
        view: Box::new(TerminalView::new()),
        recognizer: Box::new(UnsupportedRecognizer),
        cue: Box::new(TerminalBell),
    };
    let controller = ConversationController::new(&config, false);
    let mut runtime = ControllerRuntime::new(controller, service, preferences, platform);
    if let Some(label) = session_label {
        runtime = runtime.with_session_label(label);
    }

    let handle = runtime.handle();
    let runtime_task = tokio::spawn(runtime.run());

    handle.dispatch(ControllerEvent::Boot);
    if let Some(agent_id) = args.agent {
        handle.dispatch(ControllerEvent::SelectAgent {
            agent_id,
            project_id: args.project.clone(),
        });
    }

    let repl_handle = handle.clone();
    let project = args.project;
    let repl_result = tokio::task::spawn_blocking(move || repl::run(repl_handle, project))
        .await
        .context("line editor thread panicked")?;

    handle.dispatch(ControllerEvent::Shutdown);
    runtime_task.await.context("controller task panicked")?;
    repl_result
}
