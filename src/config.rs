//! Augmentor settings.
//!
//! Defaults describe the pages produced by common static site generators:
//! snippets live in `<pre><code>`, and some of them are wrapped in an extra
//! layout container carrying the `highlight` class. A JSON file may override
//! any subset of the fields.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_LABEL: &str = "Copy";
pub const CONFIRMED_LABEL: &str = "Copied!";
pub const REVERT_DELAY_MS: u64 = 2000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Tag of the element holding the snippet text.
    pub block_tag: String,
    /// Required tag of the snippet element's parent; `None` accepts any parent.
    pub block_parent_tag: Option<String>,
    /// Class marking a snippet's container as a layout wrapper.
    pub container_class: String,
    pub control_tag: String,
    pub control_class: String,
    pub default_label: String,
    pub confirmed_label: String,
    /// Label shown when the clipboard refuses a copy. `None` leaves the label
    /// untouched on failure.
    pub failure_label: Option<String>,
    pub revert_delay_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            block_tag: "code".to_string(),
            block_parent_tag: Some("pre".to_string()),
            container_class: "highlight".to_string(),
            control_tag: "button".to_string(),
            control_class: "copy-button".to_string(),
            default_label: DEFAULT_LABEL.to_string(),
            confirmed_label: CONFIRMED_LABEL.to_string(),
            failure_label: None,
            revert_delay_ms: REVERT_DELAY_MS,
        }
    }
}

impl Settings {
    /// Load settings from a JSON file, or the defaults when `path` is `None`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let settings: Self = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        settings
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.display()))?;

        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.block_tag.trim().is_empty() {
            anyhow::bail!("blockTag cannot be empty");
        }
        if self
            .block_parent_tag
            .as_deref()
            .is_some_and(|t| t.trim().is_empty())
        {
            anyhow::bail!("blockParentTag cannot be empty (use null to accept any parent)");
        }
        if self.control_tag.trim().is_empty() {
            anyhow::bail!("controlTag cannot be empty");
        }
        if self.default_label.is_empty() || self.confirmed_label.is_empty() {
            anyhow::bail!("defaultLabel and confirmedLabel cannot be empty");
        }
        Ok(())
    }

    pub fn revert_delay(&self) -> Duration {
        Duration::from_millis(self.revert_delay_ms)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize settings")
    }
}
