use gemsearch::catalog::CatalogStore;
use gemsearch::cli::{Cli, Commands, ConfigAction};
use gemsearch::config::Config;
use gemsearch::embedding::{ApiEmbeddingProvider, EmbeddingProvider, VectorIndex};
use gemsearch::error::{GemsearchError, Result, StartupError};
use gemsearch::retrieval::{ChatReranker, HybridRanker, SearchResult};
use std::path::PathBuf;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Search {
            query,
            top_k,
            rerank,
            json,
        } => cmd_search(cli.config, &query, top_k, rerank, json).await,
        Commands::BuildIndex => cmd_build_index(cli.config).await,
        Commands::Status => cmd_status(cli.config),
        Commands::Config { action } => cmd_config(cli.config, action),
    }
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = if verbose {
        "gemsearch=debug"
    } else {
        "gemsearch=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    fmt().with_env_filter(filter).with_target(false).init();
}

async fn cmd_search(
    config_path: Option<PathBuf>,
    query: &str,
    top_k: usize,
    rerank: bool,
    json: bool,
) -> Result<()> {
    let config = load_config(config_path)?;

    // Dataset problems are fatal; only the provider call downstream is a
    // request-level failure.
    let engine = build_engine(&config, rerank)?;

    match run_search(&config, &engine, query, top_k).await {
        Ok(results) => print_results(&results, json),
        Err(e) if json => {
            // Structured error payload alongside an empty result list, so
            // a calling frontend keeps a usable response shape.
            let payload = serde_json::json!({
                "error": e.to_string(),
                "results": [],
            });
            println!("{}", payload);
            Ok(())
        }
        Err(e) => Err(e),
    }
}

fn build_engine(config: &Config, rerank: bool) -> Result<HybridRanker> {
    let (catalog_path, index_path) = data_paths(config)?;

    let catalog = CatalogStore::load(&catalog_path).map_err(StartupError::from)?;
    let index = VectorIndex::load(&index_path, &config.search.index_params())
        .map_err(StartupError::from)?;

    let mut engine = HybridRanker::new(Arc::new(catalog), Arc::new(index), config.search.clone())?;

    if rerank || config.rerank.enabled {
        match std::env::var(&config.embedding.api_key_env) {
            Ok(key) if !key.is_empty() => {
                let reranker = ChatReranker::new(
                    &config.embedding.base_url,
                    &config.rerank.model,
                    &key,
                    config.embedding.timeout_secs,
                    config.rerank.temperature,
                )?;
                engine = engine.with_reranker(Arc::new(reranker));
            }
            _ => {
                // Best-effort pass: missing credentials degrade to the
                // plain hybrid ranking instead of failing the search.
                tracing::warn!(
                    "Reranking requested but {} is not set, skipping",
                    config.embedding.api_key_env
                );
            }
        }
    }

    Ok(engine)
}

async fn run_search(
    config: &Config,
    engine: &HybridRanker,
    query: &str,
    top_k: usize,
) -> Result<Vec<SearchResult>> {
    let provider = ApiEmbeddingProvider::from_config(&config.embedding)?;
    let query_vector = provider.embed(query).await?;
    Ok(engine.search_with_rerank(query, top_k, &query_vector).await?)
}

fn print_results(results: &[SearchResult], json: bool) -> Result<()> {
    if json {
        let payload = serde_json::json!({ "results": results });
        let output =
            serde_json::to_string_pretty(&payload).map_err(|e| GemsearchError::Json {
                source: e,
                context: "Failed to serialize results".to_string(),
            })?;
        println!("{}", output);
        return Ok(());
    }

    if results.is_empty() {
        println!("No results");
        return Ok(());
    }

    for (i, result) in results.iter().enumerate() {
        println!(
            "{:>2}. [{:.2}] {:<28} {} | {} | {}",
            i + 1,
            result.score,
            result.image_name,
            result.category,
            result.material,
            result.style
        );
        println!("    {}", result.caption);
    }

    Ok(())
}

async fn cmd_build_index(config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config(config_path)?;
    let (catalog_path, index_path) = data_paths(&config)?;

    let catalog = CatalogStore::load(&catalog_path).map_err(StartupError::from)?;
    if catalog.is_empty() {
        println!("Catalog is empty, nothing to index");
        return Ok(());
    }

    let provider = ApiEmbeddingProvider::from_config(&config.embedding)?;
    println!(
        "Embedding {} items with {}...",
        catalog.len(),
        provider.model_name()
    );

    let texts: Vec<String> = catalog.iter().map(|item| item.embedding_text()).collect();
    let vectors = provider.embed_batch(&texts).await?;

    if let Some(parent) = index_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| GemsearchError::Io {
            source: e,
            context: format!("Failed to create data directory: {:?}", parent),
        })?;
    }
    VectorIndex::save_vectors(&index_path, provider.dimension(), &vectors)
        .map_err(StartupError::from)?;

    println!(
        "✓ Indexed {} items ({} dims) -> {}",
        vectors.len(),
        provider.dimension(),
        index_path.display()
    );
    Ok(())
}

fn cmd_status(config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config(config_path)?;
    let (catalog_path, index_path) = data_paths(&config)?;

    println!("Gemsearch Status");
    println!("================");

    let catalog_len = match CatalogStore::load(&catalog_path) {
        Ok(catalog) => {
            println!("\nCatalog: {} items ({})", catalog.len(), catalog_path.display());
            Some(catalog.len())
        }
        Err(e) => {
            println!("\nCatalog: unavailable ({})", e);
            None
        }
    };

    let index_len = match VectorIndex::load(&index_path, &config.search.index_params()) {
        Ok(index) => {
            println!(
                "Index:   {} vectors, dimension {} ({})",
                index.len(),
                index.dimension(),
                index_path.display()
            );
            Some(index.len())
        }
        Err(e) => {
            println!("Index:   unavailable ({})", e);
            None
        }
    };

    match (catalog_len, index_len) {
        (Some(c), Some(i)) if c == i => println!("\n✓ Catalog and index are consistent"),
        (Some(c), Some(i)) => println!(
            "\n✗ DESYNCHRONIZED: catalog has {} rows but index has {} vectors",
            c, i
        ),
        _ => println!("\n✗ Dataset incomplete; run 'gemsearch build-index'"),
    }

    Ok(())
}

fn cmd_config(config_path: Option<PathBuf>, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = load_config(config_path)?;
            let json = serde_json::to_string_pretty(&config).map_err(|e| GemsearchError::Json {
                source: e,
                context: "Failed to serialize config".to_string(),
            })?;
            println!("{}", json);
        }
        ConfigAction::Validate { file } => {
            let path = match file.or(config_path) {
                Some(path) => path,
                None => Config::default_path()?,
            };
            Config::load(&path)?;
            println!("✓ Configuration is valid");
        }
        ConfigAction::Init { force } => {
            let path = match config_path {
                Some(path) => path,
                None => Config::default_path()?,
            };

            if path.exists() && !force {
                println!("Configuration file already exists at: {}", path.display());
                println!("Use --force to overwrite");
                return Ok(());
            }

            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| GemsearchError::Io {
                    source: e,
                    context: format!("Failed to create config directory: {:?}", parent),
                })?;
            }

            let config = Config::default();
            config.save(&path)?;

            println!("✓ Configuration initialized at: {}", path.display());
        }
    }

    Ok(())
}

fn load_config(config_path: Option<PathBuf>) -> Result<Config> {
    let path = match config_path {
        Some(path) => path,
        None => Config::default_path()?,
    };

    if !path.exists() {
        tracing::warn!(
            "Config file not found, using defaults. Run 'gemsearch config init' to create one."
        );
        let mut config = Config::default();
        config.apply_env_overrides();
        return Ok(config);
    }

    Config::load(&path)
}

fn data_paths(config: &Config) -> Result<(PathBuf, PathBuf)> {
    let data_dir = expand_path(&config.storage.data_dir)?;
    Ok((
        data_dir.join(&config.storage.catalog_file),
        data_dir.join(&config.storage.index_file),
    ))
}

fn expand_path(path: &std::path::Path) -> Result<PathBuf> {
    let path_str = path
        .to_str()
        .ok_or_else(|| GemsearchError::Config("Invalid path encoding".to_string()))?;

    if let Some(stripped) = path_str.strip_prefix("~/") {
        let home = dirs::home_dir()
            .ok_or_else(|| GemsearchError::Config("Cannot determine home directory".to_string()))?;
        Ok(home.join(stripped))
    } else {
        Ok(path.to_path_buf())
    }
}
