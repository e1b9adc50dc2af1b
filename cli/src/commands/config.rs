//! Config command implementation

use anyhow::{Context, Result};
use tsbench_iotdb::AdapterConfig;

pub fn run(config: &AdapterConfig) -> Result<()> {
    let rendered = toml::to_string_pretty(config).context("Failed to render configuration")?;
    print!("{}", rendered);
    Ok(())
}
