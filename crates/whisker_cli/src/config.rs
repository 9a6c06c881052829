//! Whisker configuration file handling

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Top-level configuration (whisker.toml)
#[derive(Debug, Default, Deserialize)]
pub struct WhiskerConfig {
    #[serde(default)]
    pub mount: MountConfig,
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub components: Vec<ComponentConfig>,
    #[serde(default)]
    pub log: LogConfig,
    /// Directory relative paths in the file are resolved against
    #[serde(skip)]
    pub base_dir: PathBuf,
}

/// Where the page instance mounts
#[derive(Debug, Default, Deserialize)]
pub struct MountConfig {
    /// CSS selector of the mount element; the whole page when absent
    #[serde(default)]
    pub selector: Option<String>,
}

/// Initial data fields
#[derive(Debug, Default, Deserialize)]
pub struct DataConfig {
    /// JSON file holding an object of fields
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Inline fields, applied after the file
    #[serde(default)]
    pub fields: toml::Table,
}

#[derive(Debug, Deserialize)]
pub struct ComponentConfig {
    pub name: String,
    #[serde(default)]
    pub template: Option<String>,
    #[serde(default)]
    pub template_file: Option<PathBuf>,
    #[serde(default)]
    pub data: toml::Table,
}

#[derive(Debug, Default, Deserialize)]
pub struct LogConfig {
    /// `tracing` filter directive, e.g. `whisker_app=debug`
    #[serde(default)]
    pub filter: Option<String>,
}

impl WhiskerConfig {
    /// Load configuration from a file, or from `whisker.toml` in a directory
    pub fn load(path: &Path) -> Result<Self> {
        let config_path = if path.is_dir() {
            path.join("whisker.toml")
        } else {
            path.to_path_buf()
        };

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;
        let mut config = Self::from_toml(&content)
            .with_context(|| format!("Failed to parse {}", config_path.display()))?;
        config.base_dir = config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    /// Initial fields: the data file first, then the inline table.
    pub fn data_fields(&self) -> Result<serde_json::Map<String, serde_json::Value>> {
        let mut fields = match &self.data.path {
            Some(path) => read_json_object(&self.resolve(path))?,
            None => serde_json::Map::new(),
        };
        for (name, value) in &self.data.fields {
            fields.insert(name.clone(), toml_to_json(value)?);
        }
        Ok(fields)
    }
}

impl ComponentConfig {
    /// The template markup, inline or read from `template_file`.
    pub fn template(&self, config: &WhiskerConfig) -> Result<String> {
        match (&self.template, &self.template_file) {
            (Some(template), _) => Ok(template.clone()),
            (None, Some(file)) => {
                let path = config.resolve(file);
                fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read template {}", path.display()))
            }
            (None, None) => anyhow::bail!("Component `{}` has no template", self.name),
        }
    }

    pub fn data_json(&self) -> Result<serde_json::Value> {
        toml_to_json(&toml::Value::Table(self.data.clone()))
    }
}

/// Read a JSON file that must hold an object
pub fn read_json_object(path: &Path) -> Result<serde_json::Map<String, serde_json::Value>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    match value {
        serde_json::Value::Object(fields) => Ok(fields),
        _ => anyhow::bail!("{} must contain a JSON object", path.display()),
    }
}

fn toml_to_json(value: &toml::Value) -> Result<serde_json::Value> {
    serde_json::to_value(value).context("Failed to convert TOML data to JSON")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_parse_full_config() {
        let config = WhiskerConfig::from_toml(
            r##"
[mount]
selector = "#app"

[data.fields]
title = "Todos"
todos = [{ text = "a", done = false }]

[[components]]
name = "todo-item"
template = "<li>{{ text }}</li>"

[components.data]
text = ""

[log]
filter = "whisker_app=debug"
"##,
        )
        .unwrap();

        assert_eq!(config.mount.selector.as_deref(), Some("#app"));
        assert_eq!(config.log.filter.as_deref(), Some("whisker_app=debug"));
        assert_eq!(
            serde_json::Value::Object(config.data_fields().unwrap()),
            json!({ "title": "Todos", "todos": [{ "text": "a", "done": false }] })
        );
        let component = &config.components[0];
        assert_eq!(component.template(&config).unwrap(), "<li>{{ text }}</li>");
        assert_eq!(component.data_json().unwrap(), json!({ "text": "" }));
    }

    #[test]
    fn test_empty_config_defaults() {
        let config = WhiskerConfig::from_toml("").unwrap();
        assert_eq!(config.mount.selector, None);
        assert!(config.components.is_empty());
        assert!(config.data_fields().unwrap().is_empty());
    }

    #[test]
    fn test_component_without_template() {
        let config = WhiskerConfig::from_toml("[[components]]\nname = \"x-a\"\n").unwrap();
        assert!(config.components[0].template(&config).is_err());
    }
}
