//! Effective configuration.

use anyhow::{Context, Result};

use bulkstream_core::BulkstreamConfig;

/// Print the effective configuration, bootstrapping the config file with
/// defaults on first use.
pub fn cmd_config(config: &BulkstreamConfig) -> Result<()> {
    let path = BulkstreamConfig::write_default_if_missing()
        .context("failed to write default config")?;
    tracing::debug!(path = %path.display(), "config file ready");

    println!("# {}", path.display());
    print!("{}", config.to_toml()?);
    Ok(())
}
