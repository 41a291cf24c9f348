//! Layered TOML/YAML configuration: paths, source aliases, and the three missing-artifact
//! policies the verifier consults.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde_derive::Deserialize;
use validator::Validate;

use crate::core::GenericResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Policy {
    Error,
    #[default]
    Warn,
    Ignore,
}

#[derive(Debug, Deserialize, Validate, Default)]
#[serde(rename_all = "kebab-case", default)]
pub struct Settings {
    pub checksum_missing: Policy,
    pub signature_missing: Policy,
    pub checksum_unknown: Policy,
}

/// A source alias: either a bare string (`"owner/repo@version"`) or a struct form naming an
/// explicit id/version pair, mirroring the original's short-string-or-struct unmarshal.
#[derive(Debug, Clone)]
pub struct Alias {
    pub id: String,
    pub version: Option<String>,
}

impl<'de> serde::Deserialize<'de> for Alias {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where D: serde::Deserializer<'de> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Short(String),
            Full {id: String, version: Option<String>},
        }

        Ok(match Repr::deserialize(deserializer)? {
            Repr::Short(text) => match text.split_once('@') {
                Some((id, version)) => Alias {id: id.to_owned(), version: Some(version.to_owned())},
                None => Alias {id: text, version: None},
            },
            Repr::Full {id, version} => Alias {id, version},
        })
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "kebab-case", deny_unknown_fields, default)]
pub struct Config {
    pub path: Option<PathBuf>,
    pub bin_path: Option<PathBuf>,
    pub cache_path: Option<PathBuf>,

    #[validate(length(min = 1))]
    pub default_source: String,

    /// Accepted for config round-trip compatibility; not read elsewhere in this crate.
    pub language: Option<String>,

    pub aliases: BTreeMap<String, Alias>,

    #[validate(nested)]
    pub settings: Settings,

    pub providers: BTreeMap<String, toml::Value>,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            path: None,
            bin_path: None,
            cache_path: None,
            default_source: "github".to_owned(),
            language: None,
            aliases: BTreeMap::new(),
            settings: Settings::default(),
            providers: BTreeMap::new(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> GenericResult<Config> {
        let contents = fs::read_to_string(path)?;

        let config: Config = match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => toml::from_str(&contents)?,
            _ => serde_yaml::from_str(&contents)?,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn load_or_default(path: &Path) -> GenericResult<Config> {
        match fs::metadata(path) {
            Ok(_) => Config::load(path),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Config::default()),
            Err(err) => Err(err.into()),
        }
    }

    pub fn resolve_path(&self) -> PathBuf {
        self.path.clone().unwrap_or_else(|| {
            PathBuf::from(shellexpand::tilde(&format!("~/.local/share/{}", env!("CARGO_PKG_NAME"))).to_string())
        })
    }

    pub fn get_bin_path(&self) -> PathBuf {
        self.bin_path.clone().unwrap_or_else(|| self.resolve_path().join("bin"))
    }

    pub fn get_opt_path(&self) -> PathBuf {
        self.resolve_path().join("opt")
    }

    pub fn get_cache_path(&self) -> PathBuf {
        self.cache_path.clone().unwrap_or_else(|| {
            PathBuf::from(shellexpand::tilde(&format!("~/.cache/{}", env!("CARGO_PKG_NAME"))).to_string())
        })
    }

    pub fn get_downloads_path(&self) -> PathBuf {
        self.get_cache_path().join("downloads")
    }

    pub fn get_metadata_path(&self) -> PathBuf {
        self.get_cache_path().join("metadata")
    }

    /// Substitute a known alias for `identifier`, returning it unchanged when there's no match.
    pub fn resolve_alias<'a>(&'a self, identifier: &'a str) -> (&'a str, Option<&'a str>) {
        match self.aliases.get(identifier) {
            Some(alias) => (alias.id.as_str(), alias.version.as_deref()),
            None => (identifier, None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_are_warn() {
        let settings = Settings::default();
        assert_eq!(settings.checksum_missing, Policy::Warn);
        assert_eq!(settings.signature_missing, Policy::Warn);
        assert_eq!(settings.checksum_unknown, Policy::Warn);
    }

    #[test]
    fn alias_short_form_splits_on_at() {
        let alias: Alias = serde_yaml::from_str("\"owner/repo@1.2.3\"").unwrap();
        assert_eq!(alias.id, "owner/repo");
        assert_eq!(alias.version.as_deref(), Some("1.2.3"));
    }

    #[test]
    fn alias_short_form_without_version() {
        let alias: Alias = serde_yaml::from_str("\"owner/repo\"").unwrap();
        assert_eq!(alias.id, "owner/repo");
        assert!(alias.version.is_none());
    }

    #[test]
    fn toml_and_yaml_both_parse() {
        let yaml = "default-source: github\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.default_source, "github");

        let toml_text = "default-source = \"github\"\n";
        let config: Config = toml::from_str(toml_text).unwrap();
        assert_eq!(config.default_source, "github");
    }
}