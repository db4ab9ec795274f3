//! ragserve binary: wires the pipeline to its backends and serves HTTP.

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use ragserve::ollama::{DEFAULT_BASE_URL, OllamaEmbedder, OllamaGenerator};
use ragserve::{InMemoryVectorIndex, RagConfig, RagPipeline, VectorIndex, server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = RagConfig::from_env().context("invalid configuration")?;

    // One HTTP client, shared by every outbound backend so the timeout
    // policy applies uniformly.
    let http = reqwest::Client::builder()
        .timeout(config.request_timeout)
        .build()
        .context("failed to build HTTP client")?;

    let ollama_url =
        std::env::var("RAGSERVE_OLLAMA_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
    let embedder = Arc::new(OllamaEmbedder::from_client(
        http.clone(),
        &ollama_url,
        &config.embed_model,
        config.dimension,
    ));
    let generator =
        Arc::new(OllamaGenerator::from_client(http.clone(), &ollama_url, &config.generation_model));

    let backend =
        std::env::var("RAGSERVE_INDEX_BACKEND").unwrap_or_else(|_| "memory".to_string());
    let index: Arc<dyn VectorIndex> = match backend.as_str() {
        "memory" => Arc::new(InMemoryVectorIndex::new()),
        #[cfg(feature = "pinecone")]
        "pinecone" => {
            let api_key = std::env::var("RAGSERVE_PINECONE_API_KEY")
                .context("RAGSERVE_PINECONE_API_KEY is required for the pinecone backend")?;
            let cloud =
                std::env::var("RAGSERVE_PINECONE_CLOUD").unwrap_or_else(|_| "aws".to_string());
            let region = std::env::var("RAGSERVE_PINECONE_REGION")
                .unwrap_or_else(|_| "us-east-1".to_string());
            Arc::new(ragserve::pinecone::PineconeVectorIndex::from_client(
                http, api_key, cloud, region,
            ))
        }
        other => anyhow::bail!("unknown index backend '{other}'"),
    };

    let pipeline = Arc::new(
        RagPipeline::builder()
            .config(config)
            .embedder(embedder)
            .index(index)
            .generator(generator)
            .build()
            .context("failed to build pipeline")?,
    );
    pipeline.ensure_index().await.context("failed to provision vector index")?;

    let addr = std::env::var("RAGSERVE_ADDR").unwrap_or_else(|_| "0.0.0.0:8000".to_string());
    let listener =
        tokio::net::TcpListener::bind(&addr).await.with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, backend = %backend, "ragserve listening");

    axum::serve(listener, server::router(pipeline))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
