//! Querier configuration
//!
//! Loads `provquery.toml`, which names the four input files and the encoding
//! variants they use:
//!
//! ```toml
//! [inputs]
//! identifiers = "identifiers.txt"
//! dictionaries = "prov_data_dicts.txt"
//! metadata = "compressed_metadata.txt"
//! graph = "graph.cpg"
//! common_strings = "common_strs" # .bin and .txt pair
//!
//! [encoding]
//! graph_format = "grouped"      # or "delta"
//! date_fields = "with-fraction" # or "seconds", "none"
//! width_rule = "ceil-log2"      # or "bit-length"
//! common_strings = false
//!
//! [loading]
//! mmap = true
//! ```
//!
//! Relative input paths resolve against the data directory: `--data-dir`,
//! else `PROVQUERY_DATA_DIR`, else the config file's directory, else `.`.

use crate::bits::WidthRule;
use crate::graph::GraphFormat;
use crate::metadata::{DateLayout, MetadataOptions};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const CONFIG_FILE: &str = "provquery.toml";
pub const DATA_DIR_ENV: &str = "PROVQUERY_DATA_DIR";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct QuerierConfig {
    #[serde(default)]
    pub inputs: InputsConfig,

    #[serde(default)]
    pub encoding: EncodingConfig,

    #[serde(default)]
    pub loading: LoadingConfig,

    /// Directory relative input paths are joined onto
    #[serde(skip)]
    pub data_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct InputsConfig {
    pub identifiers: PathBuf,
    pub dictionaries: PathBuf,
    pub metadata: PathBuf,
    pub graph: PathBuf,
    /// Base name of the common-string table; `.bin` and `.txt` are appended
    pub common_strings: PathBuf,
}

impl Default for InputsConfig {
    fn default() -> Self {
        Self {
            identifiers: PathBuf::from("identifiers.txt"),
            dictionaries: PathBuf::from("prov_data_dicts.txt"),
            metadata: PathBuf::from("compressed_metadata.txt"),
            graph: PathBuf::from("graph.cpg"),
            common_strings: PathBuf::from("common_strs"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct EncodingConfig {
    pub graph_format: GraphFormat,
    pub date_fields: DateLayout,
    pub width_rule: WidthRule,
    /// Metadata records carry a common-string section
    pub common_strings: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoadingConfig {
    /// Memory-map the inputs instead of reading them into memory
    pub mmap: bool,
}

impl Default for LoadingConfig {
    fn default() -> Self {
        Self { mmap: true }
    }
}

impl QuerierConfig {
    /// Load configuration.
    ///
    /// An explicit path must exist. Without one, `./provquery.toml` and then
    /// the user config (`~/.config/provquery/config.toml`) are tried, and
    /// defaults are used if neither exists.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let found = match path {
            Some(p) => Some(p.to_path_buf()),
            None => [Some(PathBuf::from(CONFIG_FILE)), Self::user_config_path()]
                .into_iter()
                .flatten()
                .find(|p| p.exists()),
        };

        let Some(file) = found else {
            debug!("No config file found, using defaults");
            return Ok(Self::default());
        };

        let content = std::fs::read_to_string(&file)
            .with_context(|| format!("Failed to read config file {}", file.display()))?;
        let mut config = Self::from_toml(&content)
            .with_context(|| format!("Invalid config file {}", file.display()))?;
        config.data_dir = file
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        debug!("Loaded config from {}", file.display());
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Get the user config path
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("provquery").join("config.toml"))
    }

    /// Apply the `--data-dir` flag and `PROVQUERY_DATA_DIR` on top of the
    /// config file's own directory
    pub fn with_data_dir(mut self, flag: Option<&Path>) -> Self {
        self.data_dir = resolve_data_dir(flag, std::env::var_os(DATA_DIR_ENV), &self.data_dir);
        self
    }

    pub fn resolve(&self, input: &Path) -> PathBuf {
        if input.is_absolute() {
            input.to_path_buf()
        } else {
            self.data_dir.join(input)
        }
    }

    pub fn identifiers_path(&self) -> PathBuf {
        self.resolve(&self.inputs.identifiers)
    }

    pub fn dictionaries_path(&self) -> PathBuf {
        self.resolve(&self.inputs.dictionaries)
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.resolve(&self.inputs.metadata)
    }

    pub fn graph_path(&self) -> PathBuf {
        self.resolve(&self.inputs.graph)
    }

    /// (`.bin` codes, `.txt` names) of the common-string table
    pub fn common_strings_paths(&self) -> (PathBuf, PathBuf) {
        let base = self.resolve(&self.inputs.common_strings);
        (base.with_extension("bin"), base.with_extension("txt"))
    }

    pub fn metadata_options(&self) -> MetadataOptions {
        MetadataOptions {
            date_layout: self.encoding.date_fields,
            width_rule: self.encoding.width_rule,
            common_strings: self.encoding.common_strings,
        }
    }
}

fn resolve_data_dir(flag: Option<&Path>, env: Option<OsString>, config_dir: &Path) -> PathBuf {
    if let Some(dir) = flag {
        return dir.to_path_buf();
    }
    if let Some(dir) = env.filter(|d| !d.is_empty()) {
        return PathBuf::from(dir);
    }
    if config_dir.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        config_dir.to_path_buf()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = QuerierConfig::default();
        assert_eq!(config.inputs.graph, PathBuf::from("graph.cpg"));
        assert_eq!(config.encoding.graph_format, GraphFormat::Grouped);
        assert_eq!(config.encoding.date_fields, DateLayout::WithFraction);
        assert_eq!(config.encoding.width_rule, WidthRule::CeilLog2);
        assert!(config.loading.mmap);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = QuerierConfig::from_toml(
            r#"
[inputs]
graph = "v1.graph"

[encoding]
graph_format = "delta"
date_fields = "none"
"#,
        )
        .unwrap();
        assert_eq!(config.inputs.graph, PathBuf::from("v1.graph"));
        assert_eq!(config.inputs.metadata, PathBuf::from("compressed_metadata.txt"));
        assert_eq!(config.encoding.graph_format, GraphFormat::Delta);
        assert_eq!(config.encoding.date_fields, DateLayout::None);
        assert_eq!(config.encoding.width_rule, WidthRule::CeilLog2);
        assert!(config.loading.mmap);
    }

    #[test]
    fn test_common_strings_variant() {
        let mut config = QuerierConfig::from_toml(
            "[inputs]\ncommon_strings = \"tables/common\"\n[encoding]\ndate_fields = \"seconds\"\ncommon_strings = true\n",
        )
        .unwrap();
        config.data_dir = PathBuf::from("/data");
        let options = config.metadata_options();
        assert!(options.common_strings);
        assert_eq!(options.date_layout, DateLayout::Seconds);
        assert_eq!(
            config.common_strings_paths(),
            (
                PathBuf::from("/data/tables/common.bin"),
                PathBuf::from("/data/tables/common.txt")
            )
        );
        assert!(!QuerierConfig::default().metadata_options().common_strings);
    }

    #[test]
    fn test_unknown_variant_rejected() {
        assert!(QuerierConfig::from_toml("[encoding]\ngraph_format = \"v3\"\n").is_err());
    }

    #[test]
    fn test_load_sets_config_directory() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "[loading]\nmmap = false\n[encoding]\nwidth_rule = \"bit-length\"\n")
            .unwrap();
        let config = QuerierConfig::load(Some(&path)).unwrap();
        assert!(!config.loading.mmap);
        assert_eq!(config.data_dir, dir.path());
        assert_eq!(config.graph_path(), dir.path().join("graph.cpg"));
        assert_eq!(config.metadata_options().width_rule, WidthRule::BitLength);
    }

    #[test]
    fn test_load_missing_explicit_file_fails() {
        let dir = TempDir::new().unwrap();
        assert!(QuerierConfig::load(Some(&dir.path().join("absent.toml"))).is_err());
    }

    #[test]
    fn test_data_dir_precedence() {
        let config_dir = Path::new("/etc/prov");
        assert_eq!(
            resolve_data_dir(Some(Path::new("/flag")), Some("/env".into()), config_dir),
            PathBuf::from("/flag")
        );
        assert_eq!(
            resolve_data_dir(None, Some("/env".into()), config_dir),
            PathBuf::from("/env")
        );
        assert_eq!(resolve_data_dir(None, None, config_dir), PathBuf::from("/etc/prov"));
        assert_eq!(resolve_data_dir(None, None, Path::new("")), PathBuf::from("."));
    }

    #[test]
    fn test_absolute_inputs_are_kept() {
        let mut config = QuerierConfig::default();
        config.data_dir = PathBuf::from("/data");
        config.inputs.graph = PathBuf::from("/elsewhere/g.cpg");
        assert_eq!(config.graph_path(), PathBuf::from("/elsewhere/g.cpg"));
        assert_eq!(config.identifiers_path(), PathBuf::from("/data/identifiers.txt"));
    }
}
