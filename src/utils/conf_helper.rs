use tokio::fs;
use std::sync::OnceLock;
use tracing::info;

use power_bench::{BenchError, Result};
use crate::models::bench_config::BenchConfig;

pub const DEFAULT_CONFIG_PATH: &str = "bench.json";

static CONFIG_CACHE: OnceLock<BenchConfig> = OnceLock::new();

pub async fn load_config(file_path: &str) -> Result<BenchConfig> {
    let data = fs::read_to_string(file_path)
        .await
        .map_err(|e| BenchError::Config(format!("File read Error: {e} {file_path}")))?;

    let config: BenchConfig = serde_json::from_str(&data)?;

    if config.applications.is_empty() {
        return Err(BenchError::Config("no applications configured".to_string()));
    }
    if config.windows.is_empty() {
        return Err(BenchError::Config("no windows configured".to_string()));
    }

    Ok(config)
}

pub async fn init_config(file_path: &str) -> Result<&'static BenchConfig> {
    let config = load_config(file_path).await?;

    info!(
        "Config loaded from {}: {} applications x {} windows, {} ms interval",
        file_path,
        config.applications.len(),
        config.windows.len(),
        config.sample_interval_ms
    );

    CONFIG_CACHE
        .set(config)
        .map_err(|_| BenchError::Config("Config already initialized".to_string()))?;

    Ok(get_cached_config())
}

pub fn get_cached_config() -> &'static BenchConfig {
    CONFIG_CACHE.get().expect("Config not initialized")
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn write_temp(contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("power-bench-{}.json", uuid::Uuid::new_v4()));
        fs::write(&path, contents).await.unwrap();
        path
    }

    #[tokio::test]
    async fn test_load_config() {
        let path = write_temp(r#"{"applications": ["Safari"], "windows": ["https://example.com/"]}"#).await;
        let config = load_config(path.to_str().unwrap()).await.unwrap();
        assert_eq!(config.applications, vec!["Safari"]);
        let _ = fs::remove_file(&path).await;
    }

    #[tokio::test]
    async fn test_load_config_rejects_empty_run() {
        let path = write_temp(r#"{"applications": [], "windows": ["x"]}"#).await;
        let err = load_config(path.to_str().unwrap()).await.unwrap_err();
        assert!(matches!(err, BenchError::Config(_)));
        let _ = fs::remove_file(&path).await;
    }

    #[tokio::test]
    async fn test_load_config_missing_file() {
        let err = load_config("/nonexistent/bench.json").await.unwrap_err();
        assert!(err.to_string().contains("File read Error"));
    }

    #[tokio::test]
    async fn test_load_config_bad_json() {
        let path = write_temp("{not json").await;
        let err = load_config(path.to_str().unwrap()).await.unwrap_err();
        assert!(matches!(err, BenchError::Json(_)));
        let _ = fs::remove_file(&path).await;
    }
}
