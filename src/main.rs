mod app;
mod cli;
mod config;
mod diagnostics;
mod dungeons;
mod error;
mod history;
mod importer;
mod player;
mod raiderio;
mod reconcile;
mod score;
mod selector;
mod times;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let (global, tokens) = cli::parse_global_options(&args);

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_filter(global.verbose))),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    cli::run(global, tokens)
}

fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        "keysmith=debug"
    } else {
        "keysmith=info"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filter_shows_import_progress() {
        assert_eq!(default_filter(false), "keysmith=info");
        assert_eq!(default_filter(true), "keysmith=debug");
        assert!(EnvFilter::try_new(default_filter(false)).is_ok());
    }
}
