use std::path::Path;
use std::time::Duration;

use tokio::fs;

use super::error::ContentError;
use crate::config::Config;

pub(crate) fn http_client(config: &Config) -> Result<reqwest::Client, ContentError> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.http_timeout))
        .user_agent(concat!("picguessr/", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(client)
}

/// Downloads `url` to `path` unless the file is already there.
pub(crate) async fn ensure_cached(
    http: &reqwest::Client,
    url: &str,
    path: &Path,
) -> Result<(), ContentError> {
    if fs::metadata(path).await.is_ok() {
        return Ok(());
    }

    info!("Downloading {} to {}", url, path.display());
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    let body = http.get(url).send().await?.error_for_status()?.bytes().await?;

    // A partial download must not be mistaken for a cached file.
    let partial = path.with_extension("part");
    fs::write(&partial, &body).await?;
    fs::rename(&partial, path).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cached_file_is_not_downloaded() {
        let dir = std::env::temp_dir().join(format!("picguessr-cache-{}", std::process::id()));
        fs::create_dir_all(&dir).await.unwrap();
        let path = dir.join("idioms.txt");
        fs::write(&path, "一心一意 100\n").await.unwrap();

        // Nothing listens on port 9, a download attempt would fail.
        let http = reqwest::Client::new();
        ensure_cached(&http, "http://127.0.0.1:9/idioms.txt", &path)
            .await
            .unwrap();
        assert_eq!(fs::read_to_string(&path).await.unwrap(), "一心一意 100\n");

        fs::remove_dir_all(&dir).await.unwrap();
    }
}
