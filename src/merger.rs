//! src/merger.rs
use crate::store::RecordStore;
use anyhow::Context;
use std::path::Path;

/// Fetches `url` into `dest`, replacing any existing file.
pub async fn download(url: &str, dest: &Path) -> anyhow::Result<()> {
    let response = reqwest::get(url)
        .await
        .with_context(|| format!("failed to fetch {url}"))?
        .error_for_status()
        .with_context(|| format!("fetch of {url} was refused"))?;
    let bytes = response
        .bytes()
        .await
        .with_context(|| format!("failed to read body of {url}"))?;
    tokio::fs::write(dest, &bytes)
        .await
        .with_context(|| format!("failed to write {}", dest.display()))?;
    Ok(())
}

/// Concatenates the stores behind `urls` into a fresh store at `out_path`.
///
/// Each file is downloaded to `temp_path`, bulk-appended via attach-insert,
/// and deleted before the next one. Concatenation order is the order of
/// `urls`; consumers that need an order must sort on scan.
#[tracing::instrument("Merge stores", skip_all, fields(out = %out_path.display(), sources = urls.len()))]
pub async fn merge_stores(urls: &[String], out_path: &Path, temp_path: &Path) -> anyhow::Result<()> {
    let output = RecordStore::create(out_path)
        .with_context(|| format!("failed to create merge output {}", out_path.display()))?;
    for url in urls {
        tracing::debug!("downloading and merging {url}");
        download(url, temp_path).await?;
        output
            .gather_into(temp_path)
            .with_context(|| format!("failed to gather {url}"))?;
        tokio::fs::remove_file(temp_path)
            .await
            .with_context(|| format!("failed to delete {}", temp_path.display()))?;
    }
    output.close().context("failed to close merge output")?;
    Ok(())
}
