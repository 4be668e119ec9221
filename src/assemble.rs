//! Document assembly: directory walk → index-ready records.
//!
//! Enumerates supported files under a root, runs each through the extraction
//! dispatcher, and builds [`DocumentRecord`]s for every file that produced
//! text. Enumeration is deterministic: one recursive pass per supported
//! extension in registry order, paths sorted within each pass, so all `.docx`
//! files come before any `.xlsx`, and so on.

use anyhow::{bail, Result};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::extract::ExtractorRegistry;
use crate::models::DocumentRecord;

/// Hard cap on stored content, in characters (not bytes — content is
/// routinely Japanese).
pub const MAX_CONTENT_CHARS: usize = 50_000;

/// Outcome of one assembly run. `files_found` distinguishes "no supported
/// files at all" from "files found but none had text".
#[derive(Debug)]
pub struct Batch {
    pub files_found: usize,
    pub records: Vec<DocumentRecord>,
}

/// Walks `root` and builds the indexable batch. Progress and skip notices go
/// to stdout, one line per file. Fails fast when the root does not exist;
/// everything after that is per-file and non-fatal.
pub async fn assemble(registry: &ExtractorRegistry, root: &Path) -> Result<Batch> {
    if !root.exists() {
        bail!("Directory '{}' does not exist", root.display());
    }

    let files = enumerate_files(registry, root);
    let total = files.len();
    println!("Found {} files in {}", total, root.display());
    let mut records = Vec::new();

    for (i, path) in files.iter().enumerate() {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        println!("Processing {}/{}: {}", i + 1, total, filename);

        let text = registry.dispatch(path).await;
        if text.trim().is_empty() {
            println!("  -> Skipped (no text extracted)");
            continue;
        }

        records.push(DocumentRecord {
            id: stable_id(path),
            path: path.display().to_string(),
            filename,
            content: truncate_chars(&text, MAX_CONTENT_CHARS),
        });
    }

    Ok(Batch {
        files_found: total,
        records,
    })
}

/// One recursive walk per extension, matched case-insensitively, sorted by
/// path within the extension group.
fn enumerate_files(registry: &ExtractorRegistry, root: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for ext in registry.extensions() {
        let mut group: Vec<PathBuf> = WalkDir::new(root)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|p| {
                p.extension()
                    .and_then(|e| e.to_str())
                    .map(|e| e.eq_ignore_ascii_case(ext))
                    .unwrap_or(false)
            })
            .collect();
        group.sort();
        files.extend(group);
    }
    files
}

/// Document id: hash of the absolute path, stable across runs. Re-indexing a
/// changed file set upserts by identity instead of reassigning ids from
/// enumeration position (which could silently overwrite unrelated documents
/// in the engine).
pub fn stable_id(path: &Path) -> String {
    let absolute = std::fs::canonicalize(path).unwrap_or_else(|_| {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    });
    let digest = Sha256::digest(absolute.to_string_lossy().as_bytes());
    format!("{:x}", digest)[..16].to_string()
}

/// Truncate to at most `max` characters, on a character boundary.
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((byte_idx, _)) => s[..byte_idx].to_string(),
        None => s.to_string(),
    }
}
