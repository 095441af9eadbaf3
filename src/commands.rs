use anyhow::{Context, Result};
use console::style;
use futures::future::join_all;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::Config;
use crate::gateway::{Backend, LogosClient, SearchKind};
use crate::session::{FileTokenStore, SessionManager, TokenStore};
use crate::workspace::{
    AnalysisType, ChatMessage, InputField, MessageStatus, PageState, Role, Workspace,
};

/// Characters of passage text shown per result
const PREVIEW_CHARS: usize = 150;

/// Everything a command needs, wired from the saved configuration
struct Client {
    backend: Arc<LogosClient>,
    session: Arc<SessionManager>,
    workspace: Arc<Workspace>,
    store: Arc<FileTokenStore>,
}

impl Client {
    fn open() -> Result<Self> {
        let config = Config::load_default().context("Failed to load configuration")?;
        let backend = Arc::new(LogosClient::new(&config)?);
        info!("Using backend {}", backend.base_url());

        let store = Arc::new(FileTokenStore::from_config(&config));
        let slot: Arc<dyn TokenStore> = Arc::<FileTokenStore>::clone(&store);
        let session = Arc::new(SessionManager::new(slot));
        let shared: Arc<dyn Backend> = Arc::<LogosClient>::clone(&backend);
        let workspace = Arc::new(Workspace::new(shared, Arc::clone(&session)));

        Ok(Self {
            backend,
            session,
            workspace,
            store,
        })
    }

    async fn ensure_session(&self) {
        self.session.ensure_session(self.backend.as_ref()).await;
    }

    async fn search(&self, query: &str, kind: SearchKind) -> PageState {
        self.workspace.set_search_query(query);
        self.workspace.set_search_kind(kind);

        let bar = spinner(format!("Searching for \"{}\"", query));
        self.workspace.run_search().await;
        bar.finish_and_clear();

        self.workspace.snapshot()
    }
}

/// Establish the session and report what it holds
#[inline]
pub async fn show_session() -> Result<()> {
    let client = Client::open()?;
    client.ensure_session().await;
    let context = client.session.current();

    println!("{}", style("🔑 Session").bold().cyan());
    if context.is_authenticated() {
        println!("  Status: {}", style("authenticated").green());
    } else {
        println!("  Status: {}", style("anonymous").yellow());
        println!("  Chat requests will be rejected until a session can be created.");
    }
    println!(
        "  User ID: {}",
        context.user_id.as_deref().unwrap_or("(none)")
    );
    println!(
        "  Token file: {}",
        style(client.store.path().display()).dim()
    );

    Ok(())
}

/// Search and print the passages and suggested questions
#[inline]
pub async fn run_search(query: &str, kind: SearchKind) -> Result<()> {
    let client = Client::open()?;
    let state = client.search(query, kind).await;

    print_results(&state);
    print_suggestions(&state);

    Ok(())
}

/// Search, then run the given analyses side by side
#[inline]
pub async fn run_analyses(query: &str, kind: SearchKind, types: &[AnalysisType]) -> Result<()> {
    let client = Client::open()?;
    let state = client.search(query, kind).await;
    print_results(&state);

    if state.results.is_empty() {
        return Ok(());
    }

    let types = if types.is_empty() {
        AnalysisType::CARDS.as_slice()
    } else {
        types
    };

    let bar = spinner(format!("Running {} analyses", types.len()));
    let handles: Vec<_> = types
        .iter()
        .filter_map(|analysis_type| client.workspace.spawn_analysis(*analysis_type))
        .collect();
    for result in join_all(handles).await {
        if let Err(e) = result {
            warn!("Analysis task did not finish: {}", e);
        }
    }
    bar.finish_and_clear();

    print_messages(&client.workspace.snapshot().messages);

    Ok(())
}

/// Search for context, then ask the assistant one question about it
#[inline]
pub async fn run_chat(query: &str, message: &str, kind: SearchKind) -> Result<()> {
    let client = Client::open()?;
    client.ensure_session().await;

    let state = client.search(query, kind).await;
    print_results(&state);

    client.workspace.set_chat_input(message);
    let bar = spinner("Waiting for a reply".to_string());
    let sent = client.workspace.send_chat_message().await;
    bar.finish_and_clear();

    if sent.is_none() {
        println!("{}", style("Nothing to send.").yellow());
        return Ok(());
    }

    print_messages(&client.workspace.snapshot().messages);

    Ok(())
}

/// Print the service's spelling suggestion for `text`
#[inline]
pub async fn run_correct(text: &str) -> Result<()> {
    let client = Client::open()?;

    match suggest_correction(&client.workspace, text).await {
        Some(corrected) => {
            println!("{} {}", style("Suggested:").bold().green(), corrected);
        }
        None => println!("{}", style("No correction suggested.").dim()),
    }

    Ok(())
}

/// Autocorrect `text` in the search field; `None` when it comes back unchanged
async fn suggest_correction(workspace: &Workspace, text: &str) -> Option<String> {
    workspace.set_search_query(text);
    workspace.autocorrect(InputField::Search).await;

    let corrected = workspace.snapshot().search_query;
    (corrected != text).then_some(corrected)
}

fn spinner(message: String) -> ProgressBar {
    if !console::user_attended_stderr() {
        return ProgressBar::hidden();
    }

    let style = ProgressStyle::with_template("{spinner} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    let bar = ProgressBar::new_spinner().with_style(style).with_message(message);
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}

fn print_results(state: &PageState) {
    if state.results.is_empty() {
        println!("{}", style("No passages found.").yellow());
        return;
    }

    println!(
        "{}",
        style(format!("📖 Passages ({})", state.results.len()))
            .bold()
            .cyan()
    );
    for result in &state.results {
        println!(
            "  {} {}",
            style(&result.id).bold(),
            style(format!("(distance {:.3})", result.distance)).dim()
        );
        println!("    {}", preview(&result.text));
    }
    println!();
}

fn print_suggestions(state: &PageState) {
    if state.suggested_questions.is_empty() {
        return;
    }

    println!("{}", style("❓ Suggested Questions").bold().cyan());
    for (index, question) in state.suggested_questions.iter().enumerate() {
        println!("  {}. {}", index + 1, question);
    }
    println!();
}

fn print_messages(messages: &[ChatMessage]) {
    for message in messages {
        match (message.role, message.analysis_type) {
            (Role::System, Some(analysis_type)) => {
                println!(
                    "{}",
                    style(format!("{} {}", analysis_type.icon(), analysis_type.title()))
                        .bold()
                        .yellow()
                );
                println!("{}", message.content);
            }
            (Role::System, None) => {
                println!("{}", style("LogosAI:").bold().green());
                println!("{}", message.content);
            }
            (Role::User, _) => {
                let marker = match message.status {
                    MessageStatus::Failed => style(" (failed to send)").red().to_string(),
                    MessageStatus::Pending => style(" (pending)").dim().to_string(),
                    MessageStatus::Delivered => String::new(),
                };
                println!("{}{}", style("You:").bold().cyan(), marker);
                println!("{}", message.content);
            }
        }
        println!();
    }
}

fn preview(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}
