use anyhow::Result;

use laminark_core::Config;

/// Prints the effective configuration (defaults merged with `config.json`)
/// as pretty JSON.
pub fn handle_show(config: &Config) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}
