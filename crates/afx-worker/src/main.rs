//! Audio effects worker binary.

use std::sync::Arc;

use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use afx_media::{check_ffmpeg, FfmpegTool};
use afx_queue::{JobQueue, QueueConfig};
use afx_storage::{BlobStore, FileRefs, RedisHistory, RedisStore, StorageConfig};
use afx_worker::{AudioProcessor, JobExecutor, WorkerConfig};

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("afx_worker=info,afx_media=info,afx_queue=info,afx_storage=info"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(true).with_target(true))
            .with(env_filter)
            .init();
    }

    info!("Starting afx-worker");

    let config = WorkerConfig::from_env();
    let storage_config = StorageConfig::from_env();
    let queue_config = QueueConfig::from_env();
    info!("Worker config: {:?}", config);

    if let Some(addr) = config.metrics_addr {
        match metrics_exporter_prometheus::PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
        {
            Ok(()) => info!("Prometheus metrics listening on {}", addr),
            Err(e) => warn!("Failed to start metrics listener: {}", e),
        }
    }

    match check_ffmpeg() {
        Ok(path) => info!("Using ffmpeg at {}", path.display()),
        Err(e) => warn!("{}; jobs will fail until it is installed", e),
    }

    let blobs = BlobStore::from_config(&storage_config);
    if let Err(e) = blobs.ensure_dirs().await {
        error!("Failed to create data directories: {}", e);
        std::process::exit(1);
    }

    let store = match RedisStore::connect(&storage_config.redis_url).await {
        Ok(s) => Arc::new(s),
        Err(e) => {
            error!("Failed to connect to Redis: {}", e);
            std::process::exit(1);
        }
    };

    let history = match RedisHistory::connect(&storage_config.redis_url).await {
        Ok(h) => Arc::new(h),
        Err(e) => {
            error!("Failed to connect history log: {}", e);
            std::process::exit(1);
        }
    };

    let queue = match JobQueue::connect(queue_config, store.clone()).await {
        Ok(q) => q,
        Err(e) => {
            error!("Failed to create job queue: {}", e);
            std::process::exit(1);
        }
    };
    if let Err(e) = queue.init().await {
        error!("Failed to initialize job queue: {}", e);
        std::process::exit(1);
    }

    let processor = AudioProcessor::new(
        Arc::new(FfmpegTool::new(config.tool_timeout)),
        blobs,
        FileRefs::new(store),
        history,
        storage_config.output_ref_ttl,
    );

    let executor = Arc::new(JobExecutor::new(config, Arc::new(queue), processor));

    // Finish the current job, then stop
    let signal_executor = executor.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received shutdown signal");
        signal_executor.shutdown();
    });

    if let Err(e) = executor.run().await {
        error!("Executor error: {}", e);
        std::process::exit(1);
    }

    info!("Worker shutdown complete");
}
