use std::{fs, path::Path, sync::Arc};

use anyhow::{Context, Result};
use reef_clash_core::{Catalog, PieceTemplate};
use reef_clash_world::Config;
use serde::Deserialize;

/// Seed used when neither the settings file nor the command line names one.
pub(crate) const DEFAULT_SEED: u64 = 0x5eed;

/// Contents of a `--config` file.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct Settings {
    /// Seed for the campaign's random source.
    pub(crate) seed: Option<u64>,
    /// Campaign parameters.
    pub(crate) world: Config,
}

impl Settings {
    /// Parses settings from TOML text.
    pub(crate) fn parse(text: &str) -> Result<Self> {
        toml::from_str(text).context("malformed settings")
    }

    /// Reads settings from a TOML file.
    pub(crate) fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read settings from {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("in {}", path.display()))
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CatalogFile {
    templates: Vec<PieceTemplate>,
}

/// Parses and validates a replacement catalog from TOML text.
pub(crate) fn parse_catalog(text: &str) -> Result<Catalog> {
    let file: CatalogFile = toml::from_str(text).context("malformed catalog")?;
    Catalog::new(file.templates).context("invalid catalog")
}

/// Loads the catalog at `path`, or the built-in one when no path is given.
pub(crate) fn load_catalog(path: Option<&Path>) -> Result<Arc<Catalog>> {
    let Some(path) = path else {
        return Ok(Arc::new(Catalog::standard()));
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read catalog from {}", path.display()))?;
    let catalog = parse_catalog(&text).with_context(|| format!("in {}", path.display()))?;
    Ok(Arc::new(catalog))
}
