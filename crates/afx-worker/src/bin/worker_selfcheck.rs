use std::path::Path;

use afx_storage::StorageConfig;
use afx_worker::WorkerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let storage = StorageConfig::from_env();
    let worker = WorkerConfig::from_env();

    println!(
        "afx-worker-selfcheck: starting with data_dir={} tool_timeout={}s",
        storage.data_dir.display(),
        worker.tool_timeout.as_secs()
    );
    ensure_dir(storage.originals_dir()).await?;
    ensure_dir(storage.processed_dir()).await?;
    ensure_ffmpeg().await?;
    ensure_env_present(&["REDIS_URL"])?;

    println!("afx-worker-selfcheck: ok");
    Ok(())
}

async fn ensure_dir<P: AsRef<Path>>(path: P) -> anyhow::Result<()> {
    let path = path.as_ref();
    tokio::fs::create_dir_all(path).await?;
    let probe = path.join(".selfcheck");
    tokio::fs::write(&probe, b"ok")
        .await
        .map_err(|e| anyhow::anyhow!("{} is not writable: {}", path.display(), e))?;
    tokio::fs::remove_file(&probe).await?;
    Ok(())
}

async fn ensure_ffmpeg() -> anyhow::Result<()> {
    let path = afx_media::check_ffmpeg()?;
    let output = tokio::process::Command::new(&path)
        .arg("-version")
        .output()
        .await
        .map_err(|e| anyhow::anyhow!("ffmpeg not available: {}", e))?;

    if !output.status.success() {
        return Err(anyhow::anyhow!("ffmpeg -version failed: {:?}", output.status));
    }
    Ok(())
}

fn ensure_env_present(vars: &[&str]) -> anyhow::Result<()> {
    for var in vars {
        if std::env::var(var).is_err() {
            return Err(anyhow::anyhow!("missing required env var {}", var));
        }
    }
    Ok(())
}
