//! Scripted interactions applied to a mounted page.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::info;
use whisker_app::{Instance, NodeId, Value};

/// Ordered steps run against a mounted instance.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Scenario {
    pub steps: Vec<Step>,
}

impl Scenario {
    /// Load a scenario from JSON text.
    pub fn from_json(input: &str) -> Result<Self> {
        Ok(serde_json::from_str(input)?)
    }

    /// Load a scenario from file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_json(&raw).with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Build steps from command-line flags: writes, then inputs, then clicks.
    pub fn from_flags(sets: &[String], inputs: &[String], clicks: &[String]) -> Result<Self> {
        let mut steps = Vec::new();
        for set in sets {
            let (path, raw) = split_pair(set, "--set")?;
            let value = serde_json::from_str(raw)
                .unwrap_or_else(|_| serde_json::Value::String(raw.to_string()));
            steps.push(Step::Set {
                path: path.to_string(),
                value,
            });
        }
        for input in inputs {
            let (selector, text) = split_pair(input, "--input")?;
            steps.push(Step::Input {
                selector: selector.to_string(),
                text: text.to_string(),
            });
        }
        steps.extend(clicks.iter().map(|selector| Step::Click {
            selector: selector.clone(),
        }));
        Ok(Self { steps })
    }

    pub fn extend(&mut self, other: Scenario) {
        self.steps.extend(other.steps);
    }

    pub fn run(&self, instance: &mut Instance) -> Result<()> {
        for step in &self.steps {
            step.run(instance)?;
        }
        Ok(())
    }
}

/// One scripted interaction.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Step {
    /// Write a data path.
    Set {
        path: String,
        value: serde_json::Value,
    },
    /// Type into a form control and fire `input`.
    Input { selector: String, text: String },
    /// Fire `click`.
    Click { selector: String },
    /// Check or uncheck a box or radio and fire `change`.
    Check {
        selector: String,
        #[serde(default = "default_checked")]
        checked: bool,
    },
}

fn default_checked() -> bool {
    true
}

impl Step {
    pub fn run(&self, instance: &mut Instance) -> Result<()> {
        match self {
            Step::Set { path, value } => {
                info!(path, "set");
                instance.set(path, Value::from(value.clone()))?;
            }
            Step::Input { selector, text } => {
                info!(selector, text, "input");
                let node = find(instance, selector)?;
                instance.input(node, text)?;
            }
            Step::Click { selector } => {
                info!(selector, "click");
                let node = find(instance, selector)?;
                instance.click(node)?;
            }
            Step::Check { selector, checked } => {
                info!(selector, checked, "check");
                let node = find(instance, selector)?;
                instance.set_checked(node, *checked)?;
            }
        }
        Ok(())
    }
}

fn split_pair<'a>(raw: &'a str, flag: &str) -> Result<(&'a str, &'a str)> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => Ok((key.trim(), value)),
        _ => bail!("{flag} expects KEY=VALUE, got `{raw}`"),
    }
}

/// First element under the mount root matching `selector`.
fn find(instance: &Instance, selector: &str) -> Result<NodeId> {
    let (Some(doc), Some(root)) = (instance.document(), instance.root()) else {
        bail!("the page is not mounted");
    };
    doc.query_selector(root, selector)?
        .with_context(|| format!("No element matches `{selector}`"))
}
