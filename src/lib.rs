//! # Document Search
//!
//! Full-text search over heterogeneous internal documents: Word files,
//! Excel workbooks, scanned PNG images, and draw.io diagrams.
//!
//! Every supported file is reduced to a single position-annotated text blob
//! (`[段落3] …`, `[Sheet1][B2] …`, `[画像全体] …`, `[要素5] …`), indexed in an
//! external Meilisearch instance, and queried through a CLI or an
//! MCP-compatible tool server. Meilisearch owns ranking, persistence, and
//! highlight marking; this crate owns extraction, assembly, and excerpt
//! rendering.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌─────────────┐   ┌─────────────┐
//! │  Extractors  │──▶│  Assembler  │──▶│ Meilisearch │
//! │ docx/xlsx/   │   │ ids + caps  │   │  (external) │
//! │ png/drawio   │   └─────────────┘   └──────┬──────┘
//! └──────────────┘                            │
//!                          ┌──────────────────┤
//!                          ▼                  ▼
//!                    ┌───────────┐      ┌───────────┐
//!                    │    CLI    │      │    MCP    │
//!                    │(docsearch)│      │  (HTTP)   │
//!                    └───────────┘      └───────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! docsearch index ./docs            # extract and index supported files
//! docsearch search 発注 フロー       # highlighted keyword search
//! docsearch serve mcp               # MCP tool server for AI assistants
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration (engine endpoint, OCR, server bind) |
//! | [`models`] | Fragments, document records, search hits |
//! | [`extract`] | Extension registry and failure-isolating dispatch |
//! | [`extract_docx`] | Word paragraph extraction (`段落N`) |
//! | [`extract_xlsx`] | Workbook cell extraction (`[<sheet>][<col><row>]`) |
//! | [`extract_png`] | Whole-image OCR (`画像全体`) |
//! | [`extract_drawio`] | Diagram element extraction (`要素N`) |
//! | [`assemble`] | Directory walk → index-ready record batch |
//! | [`meili`] | Meilisearch gateway (ensure / submit / query) |
//! | [`format`] | Excerpt rendering for terminal and MCP output |
//! | [`server`] | MCP streamable-HTTP server |

pub mod assemble;
pub mod config;
pub mod extract;
pub mod extract_docx;
pub mod extract_drawio;
pub mod extract_png;
pub mod extract_xlsx;
pub mod format;
pub mod index_cmd;
pub mod meili;
pub mod models;
pub mod search_cmd;
pub mod server;
