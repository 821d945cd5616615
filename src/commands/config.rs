//! Effective configuration display

use anyhow::{Context, Result};

use crate::core::{ConfigFile, ConfigSource};

/// Prints where configuration is read from and the values currently in effect
pub fn handle_config_command(source: &ConfigFile) -> Result<()> {
    let config = source.load().context("loading configuration")?;
    let state = if source.path().exists() {
        "present"
    } else {
        "missing, showing defaults"
    };

    println!("# {} ({})", source.path().display(), state);
    print!(
        "{}",
        toml::to_string_pretty(&config).context("rendering configuration")?
    );
    Ok(())
}
