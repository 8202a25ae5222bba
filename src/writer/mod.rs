//! Atom/RSS rendering and the write-to-temp-then-rename commit to disk.
//!
//! Two renderer strategies live behind one [`FeedRenderer`] interface,
//! selected by [`RenderMode`]: [`full_document`]'s `AtomDocumentRenderer`
//! emits a complete `<feed>` document, [`entries_only`]'s
//! `EntriesOnlyRenderer` emits a bare sequence of entry/item elements. Both
//! know how to fold a previous run's output into a freshly rendered one
//! when caching is on.

mod atom_id;
mod dates;
mod entries_only;
mod entry_render;
mod full_document;
mod merge;

use crate::aggregator::GroupAggregate;
use entries_only::EntriesOnlyRenderer;
use full_document::AtomDocumentRenderer;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("XML rendering failed: {0}")]
    Xml(String),
    #[error("filesystem error: {0}")]
    Io(String),
}

/// Selects which renderer strategy backs a run's output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// Full `<feed xmlns="http://www.w3.org/2005/Atom">` documents (`--valid_rss`).
    FullDocument,
    /// Bare `<entry>`/`<item>` sequences (the default).
    EntriesOnly,
}

/// Strategy interface behind both output modes. Picking between them is a
/// flat match on [`RenderMode`] rather than a type hierarchy.
trait FeedRenderer {
    fn render(&self, aggregate: &GroupAggregate) -> Result<Vec<u8>, WriteError>;
    fn merge_with_existing(&self, new_doc: Vec<u8>, existing: &[u8]) -> Result<Vec<u8>, WriteError>;
}

/// Render one group's aggregate and commit it to
/// `<output_dir>/<slug>_feed.xml`, merging with any existing file at that
/// path when `caching` is on. Failures are logged and never propagate —
/// one slug's write failure never stops the others (writing is independent
/// per slug; no two groups share an output path).
pub async fn render_and_write(
    output_dir: &Path,
    aggregate: &GroupAggregate<'_>,
    mode: RenderMode,
    caching: bool,
) {
    let renderer: &dyn FeedRenderer = match mode {
        RenderMode::FullDocument => &AtomDocumentRenderer,
        RenderMode::EntriesOnly => &EntriesOnlyRenderer,
    };

    let slug = &aggregate.group.slug;
    let path = output_dir.join(format!("{slug}_feed.xml"));

    let rendered = match renderer.render(aggregate) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::error!(slug = %slug, error = %e, "failed to render feed output");
            return;
        }
    };

    let final_bytes = if caching {
        match tokio::fs::read(&path).await {
            Ok(existing) => match renderer.merge_with_existing(rendered, &existing) {
                Ok(merged) => merged,
                Err(e) => {
                    tracing::warn!(slug = %slug, error = %e, "failed to merge with existing output, discarding merge");
                    return;
                }
            },
            Err(_) => rendered,
        }
    } else {
        rendered
    };

    if let Err(e) = write_atomic(&path, &final_bytes).await {
        tracing::error!(slug = %slug, path = %path.display(), error = %e, "failed to write output file");
    } else {
        tracing::info!(slug = %slug, path = %path.display(), bytes = final_bytes.len(), "wrote feed output");
    }
}

/// Write `content` to `path` via a randomly-named sibling temp file plus an
/// atomic rename, so a crash mid-write never leaves a truncated feed file
/// in place of a previously good one.
async fn write_atomic(path: &Path, content: &[u8]) -> Result<(), WriteError> {
    let suffix = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let temp_path = path.with_extension(format!("tmp.{suffix:016x}"));

    tokio::fs::write(&temp_path, content)
        .await
        .map_err(|e| WriteError::Io(e.to_string()))?;

    if let Err(e) = tokio::fs::rename(&temp_path, path).await {
        let _ = tokio::fs::remove_file(&temp_path).await;
        return Err(WriteError::Io(e.to_string()));
    }

    Ok(())
}
