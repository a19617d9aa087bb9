//! Reference data for simulations: embedded by default, overridable from disk.
use caravan_game::{Catalog, CatalogLoader, EconomyConfig, LoadError, StaticLoader};
use std::convert::Infallible;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("failed to read {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Load(#[from] LoadError),
}

/// Loads the catalog and config from JSON files, falling back to the embedded
/// data for whichever path is not given.
#[derive(Debug, Clone, Default)]
pub struct FileLoader {
    pub catalog_path: Option<PathBuf>,
    pub config_path: Option<PathBuf>,
}

fn read(path: &Path) -> Result<String, AssetError> {
    fs::read_to_string(path).map_err(|source| AssetError::Io {
        path: path.to_path_buf(),
        source,
    })
}

impl CatalogLoader for FileLoader {
    type Error = AssetError;

    fn load_catalog(&self) -> Result<Catalog, Self::Error> {
        match &self.catalog_path {
            Some(path) => Ok(Catalog::from_json(&read(path)?).map_err(LoadError::from)?),
            None => Ok(StaticLoader.load_catalog()?),
        }
    }

    fn load_config(&self) -> Result<EconomyConfig, Self::Error> {
        match &self.config_path {
            Some(path) => Ok(EconomyConfig::from_json(&read(path)?).map_err(LoadError::from)?),
            None => Ok(StaticLoader.load_config()?),
        }
    }
}

/// Catalog and tuning shared by every simulation in a run.
#[derive(Debug, Clone)]
pub struct TesterAssets {
    pub catalog: Arc<Catalog>,
    pub config: EconomyConfig,
}

impl TesterAssets {
    #[must_use]
    pub fn load_default() -> Self {
        Self {
            catalog: Arc::new(Catalog::reference().clone()),
            config: EconomyConfig::default(),
        }
    }

    /// # Errors
    ///
    /// Returns an error if a file cannot be read or its content is rejected.
    pub fn load<L: CatalogLoader>(loader: &L) -> Result<Self, L::Error> {
        Ok(Self {
            catalog: Arc::new(loader.load_catalog()?),
            config: loader.load_config()?,
        })
    }
}

/// Already-loaded assets hand out copies, so every run gets a fresh registry.
impl CatalogLoader for TesterAssets {
    type Error = Infallible;

    fn load_catalog(&self) -> Result<Catalog, Self::Error> {
        Ok(self.catalog.as_ref().clone())
    }

    fn load_config(&self) -> Result<EconomyConfig, Self::Error> {
        Ok(self.config.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use caravan_game::{CaravanRegistry, CatalogError, CatalogTable, IdSource, ManualClock};

    fn temp_file(label: &str, body: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "caravan-assets-{label}-{}.json",
            std::process::id()
        ));
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn defaults_match_embedded_data() {
        let assets = TesterAssets::load(&FileLoader::default()).unwrap();
        assert_eq!(assets.catalog.types().len(), 4);
        assert_eq!(assets.config, EconomyConfig::default());
    }

    #[test]
    fn config_file_overrides_tuning() {
        let path = temp_file("config", r#"{ "progress_step": 10.0 }"#);
        let loader = FileLoader {
            config_path: Some(path),
            ..FileLoader::default()
        };
        let assets = TesterAssets::load(&loader).unwrap();
        assert!((assets.config.progress_step - 10.0).abs() < f64::EPSILON);
        assert_eq!(assets.config.guard_share_bps, 1_000);
    }

    #[test]
    fn missing_file_reports_path() {
        let loader = FileLoader {
            catalog_path: Some(PathBuf::from("/nonexistent/caravans.json")),
            ..FileLoader::default()
        };
        let err = TesterAssets::load(&loader).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/caravans.json"));
    }

    #[test]
    fn invalid_catalog_is_rejected() {
        let path = temp_file(
            "catalog",
            r#"{ "types": [{ "id": 1, "name": "x", "icon": "x", "capacity": 1, "speed": 0,
                 "base_cost": 1, "min_guards": 0, "max_guards": 1, "reward_multiplier": 1.0 }] }"#,
        );
        let loader = FileLoader {
            catalog_path: Some(path),
            ..FileLoader::default()
        };
        assert!(matches!(
            TesterAssets::load(&loader),
            Err(AssetError::Load(LoadError::Catalog(_)))
        ));
    }

    #[test]
    fn empty_catalog_file_is_rejected() {
        let path = temp_file("empty", r#"{ "types": [], "routes": [] }"#);
        let loader = FileLoader {
            catalog_path: Some(path),
            ..FileLoader::default()
        };
        assert!(matches!(
            TesterAssets::load(&loader),
            Err(AssetError::Load(LoadError::Catalog(CatalogError::Empty {
                table: CatalogTable::Type
            })))
        ));
    }

    #[test]
    fn registries_are_built_from_loaded_assets() {
        let assets = TesterAssets {
            config: EconomyConfig {
                progress_step: 50.0,
                ..EconomyConfig::default()
            },
            ..TesterAssets::load_default()
        };
        let Ok(registry) = CaravanRegistry::from_loader(
            &assets,
            Arc::new(ManualClock::at_epoch()),
            IdSource::seeded(2),
        );
        assert!((registry.config().progress_step - 50.0).abs() < f64::EPSILON);
        assert_eq!(registry.catalog(), assets.catalog.as_ref());
    }
}
