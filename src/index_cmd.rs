use anyhow::Result;
use std::path::Path;

use crate::assemble::assemble;
use crate::config::Config;
use crate::extract::ExtractorRegistry;
use crate::meili::SearchEngine;

/// Runs the `index` command: walk the directory, extract, submit one batch.
///
/// A directory with no supported files, or with files that all extract to
/// empty, is reported as a message but is still a successful run; only a
/// missing directory or an engine failure exits non-zero.
pub async fn run_index(config: &Config, directory: &Path) -> Result<()> {
    let registry = ExtractorRegistry::new(config.ocr.clone());
    let batch = assemble(&registry, directory).await?;

    if batch.files_found == 0 {
        let formats = registry
            .extensions()
            .iter()
            .map(|e| format!(".{}", e))
            .collect::<Vec<_>>()
            .join(", ");
        println!("No supported files found. Supported formats: {}", formats);
        return Ok(());
    }

    if batch.records.is_empty() {
        println!("No documents with text content found");
        return Ok(());
    }

    let engine = SearchEngine::new(&config.engine)?;
    engine.ensure_index().await?;

    println!("\nIndexing {} documents...", batch.records.len());
    engine.add_documents(&batch.records).await?;
    println!("Done!");

    Ok(())
}
