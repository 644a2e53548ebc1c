//! src/splitter.rs
use crate::error::write_error_chain;
use crate::store::RecordStore;
use anyhow::Context;
use std::path::{Path, PathBuf};

#[derive(thiserror::Error)]
pub enum SplitError {
    #[error("input has {rows} rows, fewer than the {shards} requested output shards")]
    InsufficientRows { rows: u64, shards: usize },
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl std::fmt::Debug for SplitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write_error_chain(f, self)
    }
}

/// Distributes the rows of `source` round-robin across `shards` fresh stores
/// in `out_dir`, named by `pattern`. Round-robin keeps the shards evenly
/// sized without looking at keys, whatever the key skew.
///
/// Returns the shard paths in index order. Fails with
/// [`SplitError::InsufficientRows`] when the input holds fewer rows than
/// shards; the shards already written are left closed and harmless.
#[tracing::instrument("Split store", skip(pattern), fields(source = %source.display()))]
pub fn split_store(
    source: &Path,
    out_dir: &Path,
    pattern: impl Fn(usize) -> String,
    shards: usize,
) -> Result<Vec<PathBuf>, SplitError> {
    if shards == 0 {
        return Err(anyhow::anyhow!("cannot split into zero shards").into());
    }
    let input = RecordStore::open(source).context("failed to open split source")?;
    let total_rows = input.count().context("failed to size split source")?;

    let mut outputs = Vec::with_capacity(shards);
    let mut paths = Vec::with_capacity(shards);
    for i in 0..shards {
        let path = out_dir.join(pattern(i));
        outputs.push(
            RecordStore::create(&path)
                .with_context(|| format!("failed to create shard {}", path.display()))?,
        );
        paths.push(path);
    }

    let tenth = (total_rows / 10).max(1);
    let mut index = 0usize;
    let mut written = 0u64;
    input.for_each(|pair| {
        if written % tenth == 0 {
            tracing::debug!(
                "splitting {}: {}%",
                source.display(),
                written * 100 / total_rows.max(1)
            );
        }
        outputs[index].insert(&pair.key, &pair.value)?;
        index += 1;
        if index == shards {
            index = 0;
        }
        written += 1;
        Ok(())
    })?;

    for output in outputs {
        output.close().context("failed to close shard")?;
    }
    input.close().context("failed to close split source")?;

    if written < shards as u64 {
        return Err(SplitError::InsufficientRows {
            rows: written,
            shards,
        });
    }
    Ok(paths)
}
