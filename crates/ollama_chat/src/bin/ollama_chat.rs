//! ollama-chat: terminal chat with a local Ollama model.
//! Reads config, then either answers one question given on the command line
//! or runs an interactive loop over stdin, streaming replies to stdout.

use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use ollama_chat::config::{self, Config, RenderMode};
use ollama_chat::{ChatSession, ChatView, Renderer, Role};

#[derive(Parser, Debug)]
#[command(name = "ollama-chat", version, about = "Chat with a local Ollama model")]
struct Cli {
    /// Config file (default: ~/.ollama-chat/config.yaml)
    #[arg(long, env = "OLLAMA_CHAT_CONFIG")]
    config: Option<PathBuf>,

    /// Model name, as listed by `ollama list`
    #[arg(long)]
    model: Option<String>,

    /// Host running Ollama and the search proxy
    #[arg(long)]
    host: Option<String>,

    /// Never query the search proxy
    #[arg(long)]
    no_search: bool,

    /// Request the whole reply at once instead of streaming
    #[arg(long)]
    no_stream: bool,

    /// Render replies as markdown
    #[arg(long)]
    markdown: bool,

    /// Ask a single question and exit
    question: Vec<String>,
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut cfg = match &cli.config {
        Some(path) => config::load(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        // A missing default file just means built-in defaults.
        None => match config::default_config_path() {
            Some(path) if path.exists() => config::load(&path)
                .with_context(|| format!("failed to load config from {}", path.display()))?,
            _ => Config::default(),
        },
    };

    if let Some(model) = &cli.model {
        cfg.chat.model = model.clone();
    }
    if let Some(host) = &cli.host {
        cfg.chat.host = host.clone();
    }
    if cli.no_search {
        cfg.search.enabled = false;
    }
    if cli.no_stream {
        cfg.chat.stream = false;
    }
    if cli.markdown {
        cfg.ui.render = RenderMode::Markdown;
    }
    Ok(cfg)
}

/// Prints the conversation to stdout; status and errors go to stderr.
struct TerminalView {
    renderer: Renderer,
    echo_user: bool,
    thinking: bool,
    printed: usize,
}

impl TerminalView {
    fn new(renderer: Renderer, echo_user: bool) -> Self {
        Self {
            renderer,
            echo_user,
            thinking: false,
            printed: 0,
        }
    }
}

impl ChatView for TerminalView {
    fn add_message(&mut self, role: Role, content: &str) {
        match role {
            Role::User if !self.echo_user => {}
            Role::User => println!("> {}", content),
            Role::Assistant => println!("{}", content),
        }
    }

    fn set_thinking(&mut self, thinking: bool) {
        if thinking && !self.thinking {
            eprintln!("AI is thinking...");
        }
        self.thinking = thinking;
    }

    fn begin_assistant(&mut self) {
        self.printed = 0;
    }

    fn update_assistant(&mut self, text: &str) {
        if !self.renderer.is_incremental() {
            return;
        }
        let mut out = io::stdout().lock();
        let _ = write!(out, "{}", &text[self.printed..]);
        let _ = out.flush();
        self.printed = text.len();
    }

    fn finish_assistant(&mut self, text: &str) {
        if self.renderer.is_incremental() {
            println!();
        } else {
            println!("{}", self.renderer.render(text));
        }
        self.printed = 0;
    }

    fn abort_assistant(&mut self) {
        if self.printed > 0 {
            println!();
        }
        self.printed = 0;
    }

    fn show_error(&mut self, message: &str) {
        eprintln!("{}", message);
    }
}

async fn run(cli: Cli, cfg: Config) -> anyhow::Result<ExitCode> {
    let mut session = ChatSession::from_config(&cfg);
    let interactive = cli.question.is_empty();
    let echo_user = !interactive || !io::stdin().is_terminal();
    let mut view = TerminalView::new(Renderer::from(cfg.ui.render), echo_user);

    if !interactive {
        let question = cli.question.join(" ");
        return match session.send(&question, &mut view).await {
            Ok(Some(_)) => Ok(ExitCode::SUCCESS),
            Ok(None) => {
                eprintln!("Error: no question provided");
                Ok(ExitCode::FAILURE)
            }
            // Already reported by the view.
            Err(_) => Ok(ExitCode::FAILURE),
        };
    }

    view.add_message(Role::Assistant, &format!("Ready... Model: {}", session.model()));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            "/quit" | "/exit" => break,
            "/clear" => {
                session.clear_history();
                println!("History cleared.");
            }
            "/models" => match session.list_models().await {
                Ok(models) => models.iter().for_each(|m| println!("{}", m)),
                Err(e) => view.show_error(&format!("ERROR: {}. Check connection.", e)),
            },
            cmd if cmd.starts_with("/model ") => {
                session.set_model(cmd["/model ".len()..].trim());
                println!("Model: {}", session.model());
            }
            "/model" => eprintln!("Usage: /model <name>"),
            cmd if cmd.starts_with('/') => {
                eprintln!("Unknown command: {} (try /clear, /models, /model <name>, /quit)", cmd)
            }
            text => {
                if let Err(e) = session.send(text, &mut view).await {
                    tracing::debug!(error = %e, "exchange failed, waiting for next input");
                }
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let cfg = match load_config(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: failed to create runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match rt.block_on(run(cli, cfg)) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
