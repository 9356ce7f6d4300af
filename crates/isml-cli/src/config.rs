//! Optional TOML configuration for the `isml` command.
//!
//! ```toml
//! scope = "all"
//! max_errors = 20
//! void_tags = ["isproductprice", "isbreadcrumbs"]
//! extensions = ["isml"]
//! ```
//!
//! Command-line flags win over file settings.

use crate::CliError;
use isml_parser::{ParseOptions, TagScope};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CliConfig {
    pub scope: Option<TagScope>,
    pub max_errors: Option<usize>,
    /// Custom module tags that never take a body.
    pub void_tags: Vec<String>,
    /// File extensions picked up when walking directories.
    pub extensions: Vec<String>,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            scope: None,
            max_errors: None,
            void_tags: Vec::new(),
            extensions: vec!["isml".to_string()],
        }
    }
}

impl CliConfig {
    pub fn load(path: &Path) -> Result<Self, CliError> {
        let text = std::fs::read_to_string(path).map_err(|source| CliError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml(&text).map_err(|source| CliError::Config {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), ?config, "loaded config");
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Build parse options, letting command-line values override the file.
    pub fn parse_options(&self, scope: Option<TagScope>, max_errors: Option<usize>) -> ParseOptions {
        let mut options = ParseOptions::new().with_scope(scope.or(self.scope).unwrap_or_default());
        if let Some(max) = max_errors.or(self.max_errors) {
            options = options.with_max_errors(max);
        }
        for tag in &self.void_tags {
            options = options.with_void_tag(tag);
        }
        options
    }

    /// Check if a directory entry should be parsed.
    pub fn wants(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
    }
}
