use anyhow::Result;

use crate::config::Config;
use crate::format::{render_interactive, CLI_POST_TAG, CLI_PRE_TAG};
use crate::meili::SearchEngine;

/// Runs the `search` command: one highlighted query, results to stdout.
///
/// Querying before any indexing run surfaces the gateway's index-not-found
/// error, which carries the "run 'index' first" remedy and exits non-zero.
pub async fn run_search(config: &Config, query: &str, limit: usize) -> Result<()> {
    let engine = SearchEngine::new(&config.engine)?;
    let hits = engine.search(query, limit, CLI_PRE_TAG, CLI_POST_TAG).await?;

    let color = atty::is(atty::Stream::Stdout);
    print!("{}", render_interactive(query, &hits, color));
    Ok(())
}
