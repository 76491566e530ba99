use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vectora_backend::api;
use vectora_backend::config::{self, DEFAULT_CONFIG_PATH};
use vectora_backend::search::{store_exists, IndexBuilder, QueryEngine};
use vectora_backend::source::redact_url;
use vectora_backend::state::AppState;

/// Relational tables as a searchable corpus / 数据库表全文检索服务
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Path to the JSON config file / 配置文件路径
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Build the index store and exit / 仅构建索引后退出
    #[arg(long)]
    ingest: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vectora_backend=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    // Load configuration / 加载配置
    let app_config = config::load_config(&args.config)?;
    let index_path = app_config.index_path();

    let source_url = match std::env::var("DATABASE_URL") {
        Ok(url) if !url.trim().is_empty() => Some(url),
        _ => match app_config.source_url() {
            Ok(url) => Some(url),
            Err(e) => {
                tracing::warn!("No source database configured: {}", e);
                None
            }
        },
    };

    let needs_build = args.ingest || !store_exists(&index_path);
    if needs_build {
        let url = source_url
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("no index store at {:?} and no source database to build one", index_path))?;
        tracing::info!("Building index from {} into {:?}", redact_url(url), index_path);

        let report = IndexBuilder::from_config(&app_config.index)
            .build_from_url(url, &index_path)
            .await?;
        for issue in report.skipped_tables.iter().chain(&report.failed_tables) {
            tracing::info!("Not indexed: {} ({})", issue.table, issue.reason);
        }

        if args.ingest {
            println!("{}", serde_json::to_string_pretty(&report)?);
            return Ok(());
        }
    }

    let engine = QueryEngine::open(&index_path)?;
    tracing::info!("Opened index at {:?} ({} documents)", index_path, engine.doc_count());

    let bind_addr = app_config.get_bind_address();
    let state = Arc::new(AppState::new(app_config, source_url, engine));
    let app = api::router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("Server running at http://{}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
