//! core::config
//!
//! Configuration loading and sectioned value access.
//!
//! # Overview
//!
//! Configuration is a set of named sections holding key/value pairs, read
//! from one or more files. Files are layered: a later file overrides
//! individual keys of an earlier one. Top-level keys that are not tables
//! land in the `DEFAULT` section.
//!
//! # Formats
//!
//! `.ini` and `.cfg` files are INI: unquoted values, `;` or `#` comments
//! (also after a value), every value a string. A dotted section name such
//! as `[links.exp]` nests like its TOML counterpart. Other files are TOML.
//! Text without a known extension is tried as TOML first, then as INI.
//!
//! # Locations
//!
//! When no file is given explicitly, the first existing candidate is used:
//! 1. `$TRANSLATOR_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/translator/config.toml`
//! 3. `~/.translator/config.toml`
//!
//! [`locate`] adds instrument layering on top: the default file of a
//! directory plus an instrument specific file when one exists.
//!
//! # Example
//!
//! ```
//! use translator_module::core::config::Config;
//!
//! let config = Config::parse_str(r#"
//!     [ob_keys]
//!     exposure_time = "exptime"
//!
//!     [waitfor]
//!     timeout = 30
//! "#).unwrap();
//!
//! assert_eq!(config.value("ob_keys", "exposure_time").unwrap(), "exptime");
//! assert_eq!(config.parsed::<f64>("waitfor", "timeout").unwrap(), 30.0);
//! assert!(config.value("waitfor", "missing").is_err());
//! ```

pub mod schema;

pub use schema::{LinkEntry, TranslatorSettings};

use std::collections::BTreeMap;
use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use ini::Ini;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Section receiving top-level scalar keys.
pub const DEFAULT_SECTION: &str = "DEFAULT";

/// Syntax of a configuration source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Ini,
    /// TOML, falling back to INI when the text is not valid TOML.
    Detect,
}

impl ConfigFormat {
    /// Format implied by a file extension.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => ConfigFormat::Toml,
            Some(ext) if ext.eq_ignore_ascii_case("ini") || ext.eq_ignore_ascii_case("cfg") => {
                ConfigFormat::Ini
            }
            _ => ConfigFormat::Detect,
        }
    }
}

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    /// A requested section or key is absent, or its value is empty.
    #[error("config value [{section}] {key} is missing or empty")]
    Missing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {message}")]
    InvalidValue {
        section: String,
        key: String,
        message: String,
    },
}

/// Warnings generated during config loading.
#[derive(Debug, Clone)]
pub struct ConfigWarning {
    /// The warning message.
    pub message: String,
    /// The path that triggered the warning.
    pub path: PathBuf,
}

/// Result of loading configuration.
#[derive(Debug)]
pub struct ConfigLoadResult {
    /// The merged configuration.
    pub config: Config,
    /// Any warnings generated during loading.
    pub warnings: Vec<ConfigWarning>,
}

/// Merged configuration from every loaded file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    sections: BTreeMap<String, toml::Table>,
    sources: Vec<PathBuf>,
}

impl Config {
    /// An empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration.
    ///
    /// With explicit paths, every path must exist and they are layered in
    /// order. Without, the default locations are searched.
    ///
    /// # Errors
    ///
    /// Returns an error if a file cannot be read or parsed.
    pub fn load(explicit: &[PathBuf]) -> Result<ConfigLoadResult, ConfigError> {
        if !explicit.is_empty() {
            let mut config = Config::new();
            for path in explicit {
                config.merge(Self::read_file(path)?);
            }
            return Ok(ConfigLoadResult {
                config,
                warnings: Vec::new(),
            });
        }

        match Self::default_path() {
            Some(path) => Self::load_layered(&[path]),
            None => Ok(ConfigLoadResult {
                config: Config::new(),
                warnings: Vec::new(),
            }),
        }
    }

    /// Layer the given files in order, skipping (with a warning) any that
    /// do not exist.
    pub fn load_layered<P: AsRef<Path>>(paths: &[P]) -> Result<ConfigLoadResult, ConfigError> {
        let mut config = Config::new();
        let mut warnings = Vec::new();
        for path in paths {
            let path = path.as_ref();
            if !path.exists() {
                warnings.push(ConfigWarning {
                    message: "config file not found, skipping".to_string(),
                    path: path.to_path_buf(),
                });
                continue;
            }
            config.merge(Self::read_file(path)?);
        }
        Ok(ConfigLoadResult { config, warnings })
    }

    /// Find the default config file, if any exists.
    fn default_path() -> Option<PathBuf> {
        // 1. Check $TRANSLATOR_CONFIG
        if let Ok(path) = std::env::var("TRANSLATOR_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        // 2. Check $XDG_CONFIG_HOME/translator/config.toml
        if let Ok(xdg_home) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_home).join("translator/config.toml");
            if path.exists() {
                return Some(path);
            }
        }

        // 3. Check ~/.translator/config.toml
        dirs::home_dir()
            .map(|home| home.join(".translator/config.toml"))
            .filter(|path| path.exists())
    }

    /// Read and parse one config file.
    fn read_file(path: &Path) -> Result<Config, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;
        let mut config = Self::parse_at(&contents, path, ConfigFormat::from_path(path))?;
        config.sources.push(path.to_path_buf());
        Ok(config)
    }

    /// Parse configuration from a string, TOML or INI.
    pub fn parse_str(contents: &str) -> Result<Config, ConfigError> {
        Self::parse_at(contents, Path::new("<inline>"), ConfigFormat::Detect)
    }

    fn parse_at(contents: &str, path: &Path, format: ConfigFormat) -> Result<Config, ConfigError> {
        let parse_error = |message: String| ConfigError::ParseError {
            path: path.to_path_buf(),
            message,
        };
        let sections = match format {
            ConfigFormat::Toml => Self::toml_sections(contents).map_err(parse_error)?,
            ConfigFormat::Ini => Self::ini_sections(contents).map_err(parse_error)?,
            ConfigFormat::Detect => match Self::toml_sections(contents) {
                Ok(sections) => sections,
                Err(toml_error) => {
                    let sections =
                        Self::ini_sections(contents).map_err(|_| parse_error(toml_error))?;
                    tracing::debug!(path = %path.display(), "read configuration as INI");
                    sections
                }
            },
        };

        Ok(Config {
            sections,
            sources: Vec::new(),
        })
    }

    fn toml_sections(contents: &str) -> Result<BTreeMap<String, toml::Table>, String> {
        let table: toml::Table = contents
            .parse()
            .map_err(|e: toml::de::Error| e.to_string())?;

        let mut sections: BTreeMap<String, toml::Table> = BTreeMap::new();
        for (name, value) in table {
            match value {
                toml::Value::Table(section) => {
                    sections.insert(name, section);
                }
                scalar => {
                    sections
                        .entry(DEFAULT_SECTION.to_string())
                        .or_default()
                        .insert(name, scalar);
                }
            }
        }
        Ok(sections)
    }

    fn ini_sections(contents: &str) -> Result<BTreeMap<String, toml::Table>, String> {
        let ini = Ini::load_from_str(contents).map_err(|e| e.to_string())?;

        let mut sections: BTreeMap<String, toml::Table> = BTreeMap::new();
        for (name, properties) in &ini {
            let table: toml::Table = properties
                .iter()
                .map(|(key, value)| (key.to_string(), toml::Value::String(value.to_string())))
                .collect();
            let name = name.unwrap_or(DEFAULT_SECTION);
            if table.is_empty() && name == DEFAULT_SECTION {
                continue;
            }

            match name.split_once('.') {
                Some((outer, inner)) if !outer.is_empty() && !inner.is_empty() => {
                    sections
                        .entry(outer.to_string())
                        .or_default()
                        .insert(inner.to_string(), toml::Value::Table(table));
                }
                _ => sections.entry(name.to_string()).or_default().extend(table),
            }
        }
        Ok(sections)
    }

    /// Layer `other` on top of this config, key by key.
    pub fn merge(&mut self, other: Config) {
        for (name, section) in other.sections {
            let target = self.sections.entry(name).or_default();
            for (key, value) in section {
                target.insert(key, value);
            }
        }
        self.sources.extend(other.sources);
    }

    /// Files this configuration was read from, in load order.
    pub fn sources(&self) -> &[PathBuf] {
        &self.sources
    }

    pub fn section(&self, name: &str) -> Option<&toml::Table> {
        self.sections.get(name)
    }

    /// Get a scalar value as a string.
    ///
    /// # Errors
    ///
    /// - `ConfigError::Missing` if the section or key is absent, or the value
    ///   is an empty string
    /// - `ConfigError::InvalidValue` if the value is a table or array
    pub fn value(&self, section: &str, key: &str) -> Result<String, ConfigError> {
        let missing = || ConfigError::Missing {
            section: section.to_string(),
            key: key.to_string(),
        };
        let value = self
            .sections
            .get(section)
            .and_then(|s| s.get(key))
            .ok_or_else(missing)?;

        let text = match value {
            toml::Value::String(s) => s.clone(),
            toml::Value::Integer(i) => i.to_string(),
            toml::Value::Float(f) => f.to_string(),
            toml::Value::Boolean(b) => b.to_string(),
            toml::Value::Datetime(d) => d.to_string(),
            toml::Value::Array(_) | toml::Value::Table(_) => {
                return Err(ConfigError::InvalidValue {
                    section: section.to_string(),
                    key: key.to_string(),
                    message: "expected a scalar value".to_string(),
                })
            }
        };

        if text.trim().is_empty() {
            return Err(missing());
        }
        Ok(text)
    }

    /// Get a value and parse it with `FromStr`.
    pub fn parsed<T>(&self, section: &str, key: &str) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: Display,
    {
        let text = self.value(section, key)?;
        text.trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue {
                section: section.to_string(),
                key: key.to_string(),
                message: e.to_string(),
            })
    }

    /// Like [`Config::parsed`], but absent values yield `None`.
    pub fn optional<T>(&self, section: &str, key: &str) -> Result<Option<T>, ConfigError>
    where
        T: FromStr,
        T::Err: Display,
    {
        match self.parsed(section, key) {
            Ok(value) => Ok(Some(value)),
            Err(ConfigError::Missing { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Deserialize a whole section. An absent section deserializes from an
    /// empty table.
    pub fn section_as<T: DeserializeOwned>(&self, name: &str) -> Result<T, ConfigError> {
        let table = self.sections.get(name).cloned().unwrap_or_default();
        toml::Value::Table(table)
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::InvalidValue {
                section: name.to_string(),
                key: "*".to_string(),
                message: e.to_string(),
            })
    }

    /// The `[translator]` settings, with defaults for absent keys.
    pub fn translator(&self) -> Result<TranslatorSettings, ConfigError> {
        let settings: TranslatorSettings = self.section_as("translator")?;
        settings.validate()?;
        Ok(settings)
    }

    /// The `[links.<alias>]` linking table.
    pub fn links(&self) -> Result<BTreeMap<String, LinkEntry>, ConfigError> {
        let links: BTreeMap<String, LinkEntry> = self.section_as("links")?;
        for (alias, entry) in &links {
            entry.validate(alias)?;
        }
        Ok(links)
    }
}

/// Config files for a directory: `default_config` first, then
/// `<instrument>_config` if an instrument is given and the file exists.
///
/// Each name is looked up as `.toml`, then `.ini`.
pub fn locate(dir: &Path, instrument: Option<&str>) -> Vec<PathBuf> {
    let default =
        existing(dir, "default_config").unwrap_or_else(|| dir.join("default_config.toml"));
    let mut files = vec![default];
    if let Some(inst) = instrument.map(str::trim).filter(|i| !i.is_empty()) {
        if let Some(specific) = existing(dir, &format!("{}_config", inst.to_lowercase())) {
            files.push(specific);
        }
    }
    files
}

fn existing(dir: &Path, stem: &str) -> Option<PathBuf> {
    ["toml", "ini"]
        .iter()
        .map(|ext| dir.join(format!("{}.{}", stem, ext)))
        .find(|path| path.exists())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"
        instrument = "mosfire"

        [ob_keys]
        exposure_time = "exptime"
        empty = ""

        [waitfor]
        timeout = 30
        ratio = 0.5
        enabled = true
        servers = ["a", "b"]
    "#;

    #[test]
    fn sections_and_default() {
        let config = Config::parse_str(SAMPLE).unwrap();
        assert!(config.section("ob_keys").is_some());
        assert_eq!(config.value(DEFAULT_SECTION, "instrument").unwrap(), "mosfire");
    }

    #[test]
    fn scalars_become_strings() {
        let config = Config::parse_str(SAMPLE).unwrap();
        assert_eq!(config.value("waitfor", "timeout").unwrap(), "30");
        assert_eq!(config.value("waitfor", "ratio").unwrap(), "0.5");
        assert_eq!(config.value("waitfor", "enabled").unwrap(), "true");
    }

    #[test]
    fn missing_and_empty_values() {
        let config = Config::parse_str(SAMPLE).unwrap();
        assert!(matches!(
            config.value("nope", "key"),
            Err(ConfigError::Missing { .. })
        ));
        assert!(matches!(
            config.value("ob_keys", "nope"),
            Err(ConfigError::Missing { .. })
        ));
        assert!(matches!(
            config.value("ob_keys", "empty"),
            Err(ConfigError::Missing { .. })
        ));
        assert!(matches!(
            config.value("waitfor", "servers"),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn parsed_and_optional() {
        let config = Config::parse_str(SAMPLE).unwrap();
        assert_eq!(config.parsed::<u64>("waitfor", "timeout").unwrap(), 30);
        assert!(config.parsed::<u64>("waitfor", "ratio").is_err());
        assert_eq!(config.optional::<u64>("waitfor", "absent").unwrap(), None);
        assert!(config.optional::<u64>("waitfor", "ratio").is_err());
    }

    #[test]
    fn parse_error_names_path() {
        let err = Config::parse_str("[broken").unwrap_err();
        assert!(err.to_string().contains("<inline>"));
    }

    #[test]
    fn later_files_override_per_key() {
        let temp = TempDir::new().unwrap();
        let base = temp.path().join("default_config.toml");
        let inst = temp.path().join("mosfire_config.toml");
        fs::write(&base, "[waitfor]\ntimeout = 30\npoll_interval_ms = 500\n").unwrap();
        fs::write(&inst, "[waitfor]\ntimeout = 90\n").unwrap();

        let result = Config::load_layered(&[&base, &inst]).unwrap();
        let config = result.config;
        assert_eq!(config.value("waitfor", "timeout").unwrap(), "90");
        assert_eq!(config.value("waitfor", "poll_interval_ms").unwrap(), "500");
        assert_eq!(config.sources(), [base, inst]);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn layered_skips_missing_with_warning() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("nope.toml");
        let result = Config::load_layered(&[&missing]).unwrap();
        assert_eq!(result.warnings.len(), 1);
        assert!(result.config.sources().is_empty());
    }

    #[test]
    fn explicit_missing_file_is_error() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("nope.toml");
        let err = Config::load(&[missing]).unwrap_err();
        assert!(matches!(err, ConfigError::ReadError { .. }));
    }

    #[test]
    fn locate_adds_instrument_file_when_present() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("kpf_config.toml"), "").unwrap();

        let files = locate(temp.path(), Some("KPF"));
        assert_eq!(files.len(), 2);
        assert!(files[1].ends_with("kpf_config.toml"));

        let files = locate(temp.path(), Some("hires"));
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("default_config.toml"));
    }

    mod ini_files {
        use super::*;

        const INI: &str = "\
instrument = mosfire

[ob_keys]
exposure_time = exptime ; seconds
object = targname # from the OB

[waitfor]
timeout = 30

[links.exp]
function = mosfire.expose
";

        #[test]
        fn unquoted_values_and_inline_comments() {
            let config = Config::parse_str(INI).unwrap();
            assert_eq!(config.value("ob_keys", "exposure_time").unwrap(), "exptime");
            assert_eq!(config.value("ob_keys", "object").unwrap(), "targname");
            assert_eq!(config.parsed::<f64>("waitfor", "timeout").unwrap(), 30.0);
            assert_eq!(config.value(DEFAULT_SECTION, "instrument").unwrap(), "mosfire");
        }

        #[test]
        fn rename_table_from_ini() {
            let config = Config::parse_str(INI).unwrap();
            let table = crate::ob::RenameTable::from_config(&config).unwrap();
            assert_eq!(table.get("exposure_time"), Some("exptime"));
            assert_eq!(table.get("object"), Some("targname"));
        }

        #[test]
        fn dotted_sections_nest() {
            let config = Config::parse_at(INI, Path::new("a.ini"), ConfigFormat::Ini).unwrap();
            let links = config.links().unwrap();
            assert_eq!(links["exp"].function, "mosfire.expose");
        }

        #[test]
        fn toml_files_stay_strict() {
            let err = Config::parse_at(INI, Path::new("a.toml"), ConfigFormat::Toml).unwrap_err();
            assert!(matches!(err, ConfigError::ParseError { .. }));
        }

        #[test]
        fn format_follows_extension() {
            assert_eq!(ConfigFormat::from_path(Path::new("a.toml")), ConfigFormat::Toml);
            assert_eq!(ConfigFormat::from_path(Path::new("a.INI")), ConfigFormat::Ini);
            assert_eq!(ConfigFormat::from_path(Path::new("a.cfg")), ConfigFormat::Ini);
            assert_eq!(ConfigFormat::from_path(Path::new("config")), ConfigFormat::Detect);
        }

        #[test]
        fn ini_file_loads_and_locates() {
            let temp = TempDir::new().unwrap();
            let base = temp.path().join("default_config.ini");
            fs::write(&base, INI).unwrap();
            fs::write(temp.path().join("kpf_config.ini"), "[waitfor]\ntimeout = 90\n").unwrap();

            let files = locate(temp.path(), Some("kpf"));
            assert_eq!(files[0], base);
            let config = Config::load_layered(&files).unwrap().config;
            assert_eq!(config.value("waitfor", "timeout").unwrap(), "90");
            assert_eq!(config.value("ob_keys", "exposure_time").unwrap(), "exptime");
        }
    }

    #[test]
    fn translator_settings_default() {
        let settings = Config::new().translator().unwrap();
        assert_eq!(settings.root, "translator");
        assert_eq!(settings.function_prefix, "func");
    }
}
