//! local-rag - Main CLI Entry Point

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use std::sync::Arc;

use local_rag::cli::{Args, Commands, IndexArgs};
use local_rag::corpus::Corpus;
use local_rag::embedding::{CandleEmbedder, Embedder};
use local_rag::generation::{GenerationParams, OllamaGenerator};
use local_rag::preprocessing::{IndexJob, IndexOutcome, Indexer, PageSelection, TokenChunker};
use local_rag::prompt::PromptTemplate;
use local_rag::rag::{
    ContextConfig, ContextSource, RagPipeline, RetrievalResult, Retriever, RetrieverOptions,
};
use local_rag::server::{self, AppState};
use local_rag::{logging, Config};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    config.validate()?;

    let level = logging::level_for(args.verbose, args.quiet, &config.logging.level);
    logging::init(&level, config.logging.log_dir.as_deref());

    match args.command {
        Commands::Index(index_args) => run_index(&config, index_args, args.quiet),
        Commands::Search { query, k, json } => run_search(&config, &query, k, json),
        Commands::Ask { query, k, show_prompt } => run_ask(&config, &query, k, show_prompt).await,
        Commands::Serve { host, port } => run_serve(&config, host, port).await,
        Commands::Config => {
            let rendered = toml::to_string_pretty(&config).context("Failed to render config")?;
            println!("{}", rendered);
            Ok(())
        }
    }
}

fn run_index(config: &Config, args: IndexArgs, quiet: bool) -> Result<()> {
    let job = IndexJob {
        pages_input: args.pages.unwrap_or_else(|| config.corpus.pages_text_path.clone()),
        pages_output: args
            .pages_output
            .unwrap_or_else(|| config.corpus.pages_text_path.clone()),
        embeddings_output: args.output.unwrap_or_else(|| config.corpus.embeddings_path.clone()),
        selection: PageSelection {
            page_offset: args.page_offset,
            first_page: args.first_page,
            last_page: args.last_page,
            clean: args.clean,
        },
        force: args.force,
    };
    let tokens_per_chunk = args.tokens_per_chunk.unwrap_or(config.chunking.tokens_per_chunk);
    let overlap = args.overlap.unwrap_or(config.chunking.chunk_overlap);

    let embedder = Arc::new(CandleEmbedder::load(&config.embedding)?);
    let chunker = TokenChunker::new(embedder.tokenizer(), tokens_per_chunk, overlap)?;
    let indexer = Indexer::new(embedder, chunker)
        .with_batch_size(config.embedding.batch_size)
        .with_progress(!quiet);

    match indexer.run(&job)? {
        IndexOutcome::Written {
            pages,
            chunks,
            pages_exported,
        } => {
            println!(
                "{} {} chunk embeddings from {} pages -> {}",
                "Indexed".green().bold(),
                chunks,
                pages,
                job.embeddings_output.display()
            );
            if pages_exported {
                println!(
                    "{} selected pages -> {}",
                    "Exported".green().bold(),
                    job.pages_output.display()
                );
            }
        }
        IndexOutcome::Skipped { existing } => println!(
            "{} {} already exists; pass --force to overwrite",
            "Skipped:".yellow().bold(),
            existing.display()
        ),
    }

    Ok(())
}

fn build_retriever(config: &Config) -> Result<Retriever> {
    let corpus = Corpus::load(&config.corpus.pages_text_path, &config.corpus.embeddings_path)?;
    let embedder: Arc<dyn Embedder> = Arc::new(CandleEmbedder::load(&config.embedding)?);
    let options = RetrieverOptions {
        normalize_query: config.embedding.normalize_query,
        batch_size: config.embedding.batch_size,
    };
    Ok(Retriever::with_options(corpus, embedder, options)?)
}

fn build_pipeline(config: &Config) -> Result<RagPipeline> {
    let retriever = Arc::new(build_retriever(config)?);
    let generator = Arc::new(OllamaGenerator::from_config(&config.generation)?);
    let template = PromptTemplate::load_or_default(config.prompt.template_path.as_deref())?;

    Ok(RagPipeline::new(retriever, generator, template)
        .with_context_config(ContextConfig {
            source: config.retrieval.context_source,
            max_context_tokens: config.retrieval.max_context_tokens,
            ..Default::default()
        })
        .with_params(GenerationParams::from(&config.generation))
        .with_top_k(config.retrieval.top_k))
}

fn run_search(config: &Config, query: &str, k: Option<usize>, json: bool) -> Result<()> {
    let retriever = build_retriever(config)?;
    let result = retriever.retrieve(query, k.unwrap_or(config.retrieval.top_k))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_sources(&result, config.retrieval.context_source);
    }
    Ok(())
}

async fn run_ask(config: &Config, query: &str, k: Option<usize>, show_prompt: bool) -> Result<()> {
    let pipeline = build_pipeline(config)?;
    let answer = pipeline
        .answer_with_k(query, k.unwrap_or(config.retrieval.top_k))
        .await?;

    if show_prompt {
        println!("{}\n{}\n", "Prompt:".cyan().bold(), answer.prompt);
        print_sources(
            &RetrievalResult {
                query: answer.query.clone(),
                outputs: answer.sources.clone(),
            },
            config.retrieval.context_source,
        );
    }
    println!("{}\n{}", "Model output:".green().bold(), answer.response);
    Ok(())
}

async fn run_serve(config: &Config, host: Option<String>, port: Option<u16>) -> Result<()> {
    let host = host.unwrap_or_else(|| config.server.host.clone());
    let port = port.unwrap_or(config.server.port);

    let pipeline = build_pipeline(config)?;
    let state = Arc::new(AppState { pipeline });

    println!("{} http://{}:{}/api/query", "Serving".green().bold(), host, port);
    server::serve(state, &host, port).await?;
    Ok(())
}

fn print_sources(result: &RetrievalResult, source_text: ContextSource) {
    let label = match source_text {
        ContextSource::Page => "page text",
        ContextSource::Chunk => "matched chunk",
    };
    println!("{} {}", "Query:".bold(), result.query);
    for (rank, source) in result.outputs.iter().enumerate() {
        println!(
            "{} page {} (score {})",
            format!("#{}", rank + 1).cyan().bold(),
            source.id,
            format!("{:.4}", source.score).yellow()
        );
        println!("  {} {}", format!("{}:", label).dimmed(), source.text(source_text));
    }
}
