use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use folio_assistant::embeddings::{EmbeddingModel, GeminiEmbedder};
use folio_assistant::llm::{PromptComposer, RequestDefaults};
use folio_assistant::{
    build_provider, AssistantConfig, AssistantReply, ChatEngine, EndpointResolver, EnvironmentSnapshot,
    IntentRouter, KnowledgeStore, PortfolioProfile, Retriever, RetryPolicy,
};

#[derive(Parser, Debug)]
#[command(name = "folio-chat", about = "Portfolio assistant in the terminal")]
struct Cli {
    /// Config file (JSON). Defaults to the user config dir when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Interactive chat session
    Chat {
        /// Send unmatched questions to the LLM providers
        #[arg(long)]
        ai: bool,
    },
    /// Chunk and embed a profile into a knowledge artifact
    BuildIndex { profile: PathBuf, out: PathBuf },
    /// Print the physical endpoint for a logical function name
    Resolve { name: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Chat { ai } => run_chat(&config, ai || config.chat.ai_mode).await,
        Command::BuildIndex { profile, out } => build_index(&config, &profile, &out).await,
        Command::Resolve { name } => {
            println!("{}", resolver(&config).resolve_url(&name));
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<AssistantConfig> {
    let default_path = AssistantConfig::default_path();
    let path = path.or_else(|| default_path.exists().then_some(default_path.as_path()));

    match path {
        Some(path) => {
            tracing::info!(path = %path.display(), "Loading config");
            AssistantConfig::from_file(path).map_err(anyhow::Error::msg)
        }
        None => {
            let mut config = AssistantConfig::default();
            config.apply_env_overrides();
            config.validate().map_err(anyhow::Error::msg)?;
            Ok(config)
        }
    }
}

fn resolver(config: &AssistantConfig) -> EndpointResolver {
    let base_url = config.platform.base_url.clone();
    match config.platform.force {
        Some(platform) => EndpointResolver::new(platform, base_url),
        None => {
            let env = EnvironmentSnapshot::from_process(base_url.as_deref());
            EndpointResolver::detect(&env, base_url)
        }
    }
}

fn embedder(config: &AssistantConfig) -> Option<Arc<dyn EmbeddingModel>> {
    config.embedding.api_key.as_ref()?;
    match GeminiEmbedder::new(&config.embedding, config.knowledge.dimension) {
        Ok(embedder) => Some(Arc::new(embedder)),
        Err(e) => {
            tracing::warn!(error = %e, "Embedding client unavailable, retrieval will use the query index only");
            None
        }
    }
}

fn load_profile(config: &AssistantConfig) -> Result<PortfolioProfile> {
    match &config.knowledge.profile_path {
        Some(path) => PortfolioProfile::from_file(path),
        None => Ok(PortfolioProfile::sample()),
    }
}

async fn load_store(
    config: &AssistantConfig,
    profile: &Arc<PortfolioProfile>,
    embedder: Option<&Arc<dyn EmbeddingModel>>,
) -> Result<KnowledgeStore> {
    let path = &config.knowledge.store_path;
    if path.exists() {
        return KnowledgeStore::load(path);
    }

    match embedder {
        Some(embedder) => {
            tracing::info!(path = %path.display(), "No knowledge artifact found, embedding profile now");
            let router = IntentRouter::new(profile.clone());
            let queries = router.retrieval_queries(&config.knowledge.indexed_queries);
            KnowledgeStore::build(profile, embedder.as_ref(), &queries).await
        }
        None => {
            tracing::warn!(
                path = %path.display(),
                "No knowledge artifact and no embedding key; AI answers will have no profile context"
            );
            KnowledgeStore::new("none", config.knowledge.dimension, Vec::new())
        }
    }
}

async fn build_index(config: &AssistantConfig, profile_path: &Path, out: &Path) -> Result<()> {
    let profile = Arc::new(PortfolioProfile::from_file(profile_path)?);
    let embedder = embedder(config).context("build-index needs GEMINI_API_KEY for the embedding model")?;

    let router = IntentRouter::new(profile.clone());
    let queries = router.retrieval_queries(&config.knowledge.indexed_queries);

    let store = KnowledgeStore::build(&profile, embedder.as_ref(), &queries).await?;
    store.save(out)?;
    println!("Wrote {} chunks ({} dims) to {}", store.len(), store.dimension(), out.display());
    Ok(())
}

async fn run_chat(config: &AssistantConfig, ai_mode: bool) -> Result<()> {
    let profile = Arc::new(load_profile(config)?);
    let embedder = embedder(config);
    let store = Arc::new(load_store(config, &profile, embedder.as_ref()).await?);
    let retriever = Arc::new(Retriever::with_options(
        store,
        embedder,
        config.knowledge.query_cache_size,
        config.retrieval.min_score,
    ));

    let resolver = resolver(config);
    tracing::info!(platform = %resolver.platform(), "Endpoint resolver ready");

    let primary = build_provider(config.providers.primary, config, &resolver)?;
    let composer = PromptComposer::for_profile(&profile, config.chat.history_turns);
    let mut engine = ChatEngine::new(IntentRouter::new(profile.clone()), retriever, primary, composer)
        .with_defaults(RequestDefaults::from(&config.providers))
        .with_retry_policy(RetryPolicy::from(&config.retry))
        .with_top_k(config.retrieval.default_k)
        .with_ai_mode(ai_mode);

    if let Some(kind) = config.providers.fallback {
        match build_provider(kind, config, &resolver) {
            Ok(fallback) => engine = engine.with_fallback(fallback),
            Err(e) => tracing::warn!(provider = %kind, error = %e, "Fallback provider disabled"),
        }
    }

    println!("Chatting with {}'s portfolio assistant. Commands: /ai on|off, /reset, /quit", profile.name);
    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        match line.trim() {
            "" => continue,
            "/quit" | "/exit" => break,
            "/reset" => {
                engine.reset();
                println!("(new conversation)");
            }
            "/ai on" => engine.set_ai_mode(true),
            "/ai off" => engine.set_ai_mode(false),
            query => {
                let reply = engine.handle_message(query).await;
                print_reply(&reply)?;
            }
        }
    }

    Ok(())
}

fn print_reply(reply: &AssistantReply) -> Result<()> {
    println!("{}", reply.message.content);
    if let Some(component) = &reply.message.component {
        println!("{}", serde_json::to_string_pretty(component)?);
    }
    if !reply.message.suggestions.is_empty() {
        println!("Try: {}", reply.message.suggestions.join(" | "));
    }
    tracing::debug!(route = ?reply.route, "Turn complete");
    Ok(())
}
