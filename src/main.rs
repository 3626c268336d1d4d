//! Service entry point

use anyhow::Context;
use rbi_chatbot::api::{build_router, AppState};
use rbi_chatbot::config::Config;
use rbi_chatbot::conversation::{ConversationStore, FollowupResolver};
use rbi_chatbot::corpus::CorpusStore;
use rbi_chatbot::embedding::HttpEmbedder;
use rbi_chatbot::graph::{CypherGraphClient, GraphExpander};
use rbi_chatbot::intent::TopicResolver;
use rbi_chatbot::llm::ChatCompletionsClient;
use rbi_chatbot::pipeline::{PipelineOptions, QueryPipeline};
use rbi_chatbot::prompt::PromptAssembler;
use rbi_chatbot::retrieval::{HybridRetriever, VectorSearcher};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::load().context("loading configuration")?;
    info!("Starting rbi-chatbot with model {}", config.llm.model);

    // Collaborator clients
    let chat = Arc::new(
        ChatCompletionsClient::new(config.llm.clone()).context("building LLM client")?,
    );
    let embedder =
        Arc::new(HttpEmbedder::new(config.embedding.clone()).context("building embedding client")?);
    let graph = Arc::new(
        CypherGraphClient::new(config.graph.clone()).context("building graph client")?,
    );

    // Corpus and vector index, built once for the process lifetime
    let corpus = Arc::new(CorpusStore::load(&config.corpus.chunk_dir)?);
    let searcher = Arc::new(
        VectorSearcher::build(&corpus, embedder.clone(), config.embedding.batch_size)
            .await
            .context("building vector index")?,
    );

    let pipeline = QueryPipeline::new(
        TopicResolver::new(config.topics.clone(), chat.clone()),
        FollowupResolver::new(config.followup.clone(), embedder, chat.clone()),
        HybridRetriever::new(
            GraphExpander::new(graph),
            searcher,
            corpus,
            config.retrieval.top_k,
        ),
        PromptAssembler::new(config.retrieval.fragment_char_budget),
        ConversationStore::new(&config.conversation),
        chat.clone(),
        PipelineOptions {
            answer_max_tokens: config.llm.answer_max_tokens,
            chitchat_temperature: config.llm.chitchat_temperature,
            preview_chars: config.retrieval.preview_chars,
        },
    );

    let state = AppState {
        pipeline: Arc::new(pipeline),
        model: chat.model().to_string(),
    };

    let router = build_router(state, config.server.max_body_bytes);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    info!("Listening on {}", addr);

    axum::serve(listener, router).await.context("serving")?;

    Ok(())
}
