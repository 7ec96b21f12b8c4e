//! sage - agentic RAG chatbot CLI

mod commands;
mod config;
mod knowledge;
mod surface;
mod tools;
mod ui;
mod utils;

use clap::Parser;
use sage_agent::{AgentEvent, Controller, ControllerConfig, ProviderReasoner, ToolRegistry};
use sage_ai::{Embedder, HashEmbedder, HuggingFaceEmbedder, OpenAiCompatProvider, WhisperTranscriber};
use std::sync::Arc;
use std::time::Duration;

use crate::commands::{CommandResult, execute_command};
use crate::config::{Config, EmbeddingBackend, Overrides, Settings, key_service};
use crate::knowledge::{KnowledgeBase, TextSplitter};
use crate::surface::{ChatSurface, TurnReport};

/// sage - chat with a document, Wikipedia, arXiv and the web
#[derive(Parser, Debug)]
#[command(name = "sage")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Model to use (default: openai/gpt-oss-120b)
    #[arg(short, long)]
    model: Option<String>,

    /// Provider (groq, openai, openrouter, ollama)
    #[arg(short, long)]
    provider: Option<String>,

    /// Reasoning steps allowed per turn
    #[arg(long)]
    max_steps: Option<u32>,

    /// Document to index for the retriever tool
    #[arg(long)]
    document_url: Option<String>,

    /// Ask a single question and exit
    #[arg(short = 'c', long)]
    command: Option<String>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Disable TUI mode (use simple stdin/stdout)
    #[arg(long)]
    no_tui: bool,

    /// Initialize config file
    #[arg(long)]
    init_config: bool,
}

const LOG_FILTER: &str = "sage=debug,sage_agent=debug,sage_ai=debug";

fn init_tracing(to_file: bool) -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(LOG_FILTER));

    if !to_file {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
        return Ok(());
    }

    // The TUI owns the screen, so logs go to a file
    let dir = dirs::data_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join("sage");
    std::fs::create_dir_all(&dir)?;
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join("sage.log"))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(std::sync::Mutex::new(file))
        .init();
    Ok(())
}

fn build_embedder(settings: &Settings, config: &Config) -> Arc<dyn Embedder> {
    if settings.embeddings == EmbeddingBackend::Local {
        return Arc::new(HashEmbedder::default());
    }
    match (config.get_api_key("huggingface"), &settings.embedding_url) {
        (Some(token), None) => Arc::new(HuggingFaceEmbedder::new(&settings.embedding_model, Some(token))),
        // A self-hosted endpoint may not need a token
        (token, Some(url)) => {
            Arc::new(HuggingFaceEmbedder::new(&settings.embedding_model, token).with_url(url.clone()))
        }
        (None, None) => {
            tracing::warn!("HF_TOKEN is not set, using local hashing embeddings");
            Arc::new(HashEmbedder::default())
        }
    }
}

/// Whisper client for `/voice`, or `None` when its provider has no key
fn build_transcriber(settings: &Settings, config: &Config) -> Option<WhisperTranscriber> {
    let provider = settings.transcription_provider;
    let api_key = match key_service(provider) {
        Some(service) => match config.get_api_key(service) {
            Some(key) => Some(key),
            None => {
                tracing::warn!(
                    provider = provider.name(),
                    "no API key for transcription, voice input disabled"
                );
                return None;
            }
        },
        None => None,
    };
    Some(WhisperTranscriber::new(
        settings.transcription_url.clone(),
        api_key,
        settings.transcription_model.clone(),
    ))
}

/// Index the configured document. The error text is kept for the retriever.
async fn load_knowledge(
    settings: &Settings,
    client: &reqwest::Client,
    embedder: Arc<dyn Embedder>,
) -> Result<Arc<KnowledgeBase>, String> {
    let splitter = TextSplitter::new(settings.chunk_size, settings.chunk_overlap)
        .map_err(|e| format!("{:#}", e))?;
    match KnowledgeBase::ingest(client, &settings.document_url, &splitter, embedder).await {
        Ok(kb) => Ok(Arc::new(kb)),
        Err(e) => {
            tracing::error!(url = %settings.document_url, error = %format!("{:#}", e), "document ingestion failed");
            Err(format!("the document {} could not be indexed: {:#}", settings.document_url, e))
        }
    }
}

fn build_system_prompt(tools: &ToolRegistry) -> String {
    let mut prompt = String::from(
        "You are a helpful research assistant. Answer the user's question, \
         calling tools whenever they can ground your answer.\n\nTools:\n",
    );
    for tool in tools.iter() {
        prompt.push_str(&format!("- {}: {}\n", tool.name(), tool.description()));
    }
    prompt.push_str(
        "\nPrefer document_retriever for questions about AI agents, wikipedia for \
         general knowledge, arxiv for research papers and web_search for recent events. \
         Keep answers concise and say so when the tools found nothing useful.",
    );
    prompt
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    dotenvy::dotenv().ok();

    // Initialize config and exit
    if args.init_config {
        match Config::init() {
            Ok(path) => {
                println!("Config file created at: {}", path.display());
                println!("\nExample config:\n{}", config::example_config());
            }
            Err(e) => {
                eprintln!("Error creating config: {}", e);
                std::process::exit(1);
            }
        }
        return Ok(());
    }

    let config = Config::load();
    let settings = config.resolve(&Overrides {
        model: args.model.clone(),
        provider: args.provider.clone(),
        max_steps: args.max_steps,
        document_url: args.document_url.clone(),
        no_tui: args.no_tui,
    });
    let use_tui = settings.use_tui && args.command.is_none();

    if args.verbose {
        init_tracing(use_tui)?;
    }

    let provider = settings.model.provider;
    let api_key = key_service(provider).and_then(|service| config.get_api_key(service));
    if api_key.is_none() {
        if let Some(var) = provider.api_key_env_var() {
            eprintln!("Error: No API key found for {}", provider.name());
            eprintln!();
            eprintln!("Set your API key with: export {}=your-key", var);
            eprintln!("Or add it to config file: sage --init-config");
            std::process::exit(1);
        }
    }

    let client = reqwest::Client::builder()
        .user_agent(concat!("sage/", env!("CARGO_PKG_VERSION")))
        .timeout(Duration::from_secs(30))
        .build()?;

    if std::io::IsTerminal::is_terminal(&std::io::stderr()) {
        eprintln!("Indexing {} ...", settings.document_url);
    }
    let embedder = build_embedder(&settings, &config);
    let knowledge = load_knowledge(&settings, &client, embedder).await;
    match &knowledge {
        Ok(kb) if std::io::IsTerminal::is_terminal(&std::io::stderr()) => {
            eprintln!("Indexed {} chunks from {}", kb.len(), kb.source());
        }
        Ok(_) => {}
        Err(reason) => eprintln!("Warning: {}", reason),
    }

    let registry = tools::build_registry(&settings, &client, knowledge, config.get_api_key("tavily"))?;
    let system_prompt = settings
        .system_prompt
        .clone()
        .unwrap_or_else(|| build_system_prompt(&registry));

    let reasoner = ProviderReasoner::new(
        Arc::new(OpenAiCompatProvider::new(api_key)),
        settings.model.clone(),
    );
    let controller = Controller::new(
        ControllerConfig {
            system_prompt: Some(system_prompt),
            max_steps: settings.max_steps,
        },
        Arc::new(reasoner),
        Arc::new(registry),
    );

    let mut surface = ChatSurface::new(Arc::new(controller));
    if let Some(transcriber) = build_transcriber(&settings, &config) {
        surface = surface.with_transcriber(Arc::new(transcriber));
    }

    // Non-interactive mode
    if let Some(command) = args.command {
        return run_command(&mut surface, &command).await;
    }

    if use_tui {
        let theme = sage_tui::Theme::by_name(&settings.theme);
        return ui::run_tui(&mut surface, theme, &settings.model.id).await;
    }

    run_interactive(&mut surface, &settings).await
}

async fn run_command(surface: &mut ChatSurface, command: &str) -> anyhow::Result<()> {
    let printer = spawn_status_printer(surface);
    let report = surface.submit_text(command).await;
    finish_status_printer(printer).await;

    match report {
        TurnReport::Answered(answer) => {
            println!("{}", answer);
            Ok(())
        }
        TurnReport::Failed(reason) => {
            eprintln!("{}{}", sage_agent::session::ERROR_PREFIX, reason);
            std::process::exit(1);
        }
        TurnReport::Skipped => Ok(()),
    }
}

/// Echo live status to stderr until the turn ends
fn spawn_status_printer(surface: &ChatSurface) -> tokio::task::JoinHandle<()> {
    let mut receiver = surface.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = receiver.recv().await {
            match &event {
                AgentEvent::ToolExecutionStart { tool_name, arguments, .. } => {
                    let query = arguments
                        .get("query")
                        .and_then(|q| q.as_str())
                        .unwrap_or_default();
                    eprintln!("[{}: {}]", tool_name, utils::truncate_chars(query, 60));
                }
                AgentEvent::ToolExecutionEnd { tool_name, result, is_error: true, .. } => {
                    eprintln!("[{} failed: {}]", tool_name, utils::truncate_chars(result, 80));
                }
                AgentEvent::TurnEnd { steps, usage } => {
                    tracing::debug!(steps, input = usage.input, output = usage.output, "turn usage");
                }
                _ => {}
            }
            if event.is_terminal() {
                break;
            }
        }
    })
}

async fn finish_status_printer(handle: tokio::task::JoinHandle<()>) {
    // Skipped turns emit nothing, so don't wait for a terminal event forever
    let abort = handle.abort_handle();
    if tokio::time::timeout(Duration::from_millis(200), handle).await.is_err() {
        abort.abort();
    }
}

async fn run_interactive(surface: &mut ChatSurface, settings: &Settings) -> anyhow::Result<()> {
    use std::io::{self, Write};

    // Show minimal startup info (only if TTY)
    if io::IsTerminal::is_terminal(&io::stderr()) {
        eprintln!("sage ({}) - type /help for commands", settings.model.id);
        eprintln!();
    }

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            // EOF
            break;
        }

        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        let report = match execute_command(input, surface) {
            None => {
                let printer = spawn_status_printer(surface);
                let report = surface.submit_text(input).await;
                finish_status_printer(printer).await;
                report
            }
            Some(CommandResult::Message(msg)) => {
                println!("{}\n", msg);
                continue;
            }
            Some(CommandResult::Clear) => {
                surface.clear();
                println!("Conversation cleared.\n");
                continue;
            }
            Some(CommandResult::Exit) => break,
            Some(CommandResult::Unknown(cmd)) => {
                println!("Unknown command: /{}", cmd);
                println!("Type /help for available commands.\n");
                continue;
            }
            Some(CommandResult::Voice(path)) => {
                let printer = spawn_status_printer(surface);
                let result = surface.submit_voice_file(&path).await;
                finish_status_printer(printer).await;
                match result {
                    Ok(report) => {
                        // The transcript is the user entry just before the answer
                        let heard = surface
                            .entries()
                            .iter()
                            .rev()
                            .nth(1)
                            .filter(|_| report != TurnReport::Skipped);
                        if let Some(entry) = heard {
                            println!("(heard) {}", entry.text);
                        }
                        report
                    }
                    Err(e) => {
                        eprintln!("Error: {:#}\n", e);
                        continue;
                    }
                }
            }
        };

        match report {
            TurnReport::Answered(answer) => println!("\n{}\n", answer),
            TurnReport::Failed(reason) => {
                println!("\n{}{}\n", sage_agent::session::ERROR_PREFIX, reason)
            }
            TurnReport::Skipped => println!("Nothing was heard in that recording.\n"),
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sage_agent::{Tool, ToolResult, query_schema};

    struct Named(&'static str);

    #[async_trait::async_trait]
    impl Tool for Named {
        fn name(&self) -> &str {
            self.0
        }
        fn description(&self) -> &str {
            "does things"
        }
        fn parameters_schema(&self) -> serde_json::Value {
            query_schema("Search query")
        }
        async fn execute(&self, _arguments: serde_json::Value) -> ToolResult {
            ToolResult::text("")
        }
    }

    #[test]
    fn test_system_prompt_lists_tools() {
        let registry = ToolRegistry::from_tools([
            Arc::new(Named("wikipedia")) as sage_agent::BoxedTool,
            Arc::new(Named("arxiv")),
        ])
        .unwrap();
        let prompt = build_system_prompt(&registry);
        assert!(prompt.contains("- wikipedia: does things"));
        assert!(prompt.contains("- arxiv: does things"));
    }

    #[test]
    fn test_openrouter_voice_goes_to_groq_with_groq_key() {
        let mut config = Config::default();
        config.provider = Some("openrouter".into());
        config.api_keys.groq = Some("gsk-test".into());
        let settings = config.resolve(&Overrides::default());

        let transcriber = build_transcriber(&settings, &config).unwrap();
        assert_eq!(transcriber.base_url(), "https://api.groq.com/openai/v1");
        assert_eq!(transcriber.model(), "whisper-large-v3-turbo");
    }

    #[test]
    fn test_keyless_custom_endpoint_keeps_voice() {
        let mut config = Config::default();
        config.provider = Some("custom".into());
        config.base_url = Some("http://localhost:8000/v1".into());
        let settings = config.resolve(&Overrides::default());

        let transcriber = build_transcriber(&settings, &config).unwrap();
        assert_eq!(transcriber.base_url(), "http://localhost:8000/v1");
    }

    #[test]
    fn test_self_hosted_embeddings_need_no_token() {
        let mut config = Config::default();
        config.knowledge.embedding_url = Some("http://localhost:8080/embed".into());
        let settings = config.resolve(&Overrides::default());
        let embedder = build_embedder(&settings, &config);
        assert_eq!(embedder.dimensions(), sage_ai::embeddings::MINILM_DIMENSIONS);
    }

    #[test]
    fn test_local_backend_skips_network_embedder() {
        let mut config = Config::default();
        config.knowledge.embeddings = Some("local".into());
        let settings = config.resolve(&Overrides::default());
        let embedder = build_embedder(&settings, &config);
        assert_eq!(embedder.dimensions(), HashEmbedder::default().dimensions());
    }
}
