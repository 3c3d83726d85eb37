//! JSON configuration for the combo box options.
//!
//! Every field is optional. Configs are layered with [`ComboConfig::merge`]
//! (later layers win) and finally applied onto [`ComboOptions`], whose
//! defaults fill whatever no layer set.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::combo::ComboOptions;
use crate::error::{Error, Result};
use crate::filter::MatchMode;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ComboConfig {
    /// Match mode name; unrecognized names fall back to `contains`.
    pub match_mode: Option<String>,
    pub select_only_leafs: Option<bool>,
    pub clear_button_visible: Option<bool>,
    pub disable_filtering: Option<bool>,
    pub width: Option<u16>,
    pub popup_width: Option<u16>,
    pub label: Option<String>,
    pub helper_text: Option<String>,
    pub tooltip_text: Option<String>,
    pub error_message: Option<String>,
    /// Show the field as invalid, with `error-message` in place of the helper.
    pub invalid: Option<bool>,
    pub required: Option<bool>,
    pub read_only: Option<bool>,
    pub icon: Option<String>,
    /// Value change timeout in milliseconds.
    pub debounce_ms: Option<u64>,
}

impl ComboConfig {
    pub fn from_json(contents: &str, path: &Path) -> Result<Self> {
        serde_json::from_str(contents).map_err(|e| Error::json(path, e))
    }

    /// Layer `other` on top of `self`: fields set in `other` win.
    pub fn merge(self, other: ComboConfig) -> ComboConfig {
        ComboConfig {
            match_mode: other.match_mode.or(self.match_mode),
            select_only_leafs: other.select_only_leafs.or(self.select_only_leafs),
            clear_button_visible: other.clear_button_visible.or(self.clear_button_visible),
            disable_filtering: other.disable_filtering.or(self.disable_filtering),
            width: other.width.or(self.width),
            popup_width: other.popup_width.or(self.popup_width),
            label: other.label.or(self.label),
            helper_text: other.helper_text.or(self.helper_text),
            tooltip_text: other.tooltip_text.or(self.tooltip_text),
            error_message: other.error_message.or(self.error_message),
            invalid: other.invalid.or(self.invalid),
            required: other.required.or(self.required),
            read_only: other.read_only.or(self.read_only),
            icon: other.icon.or(self.icon),
            debounce_ms: other.debounce_ms.or(self.debounce_ms),
        }
    }

    pub fn apply(&self, options: &mut ComboOptions) {
        if let Some(mode) = &self.match_mode {
            options.match_mode = MatchMode::from_name(mode);
        }
        if let Some(only_leafs) = self.select_only_leafs {
            options.select_only_leafs = only_leafs;
        }
        if let Some(visible) = self.clear_button_visible {
            options.clear_button_visible = visible;
        }
        if let Some(disabled) = self.disable_filtering {
            options.filtering_disabled = disabled;
        }
        if let Some(width) = self.width {
            options.width = width;
        }
        if self.popup_width.is_some() {
            options.popup_width = self.popup_width;
        }
        if self.label.is_some() {
            options.label.clone_from(&self.label);
        }
        if self.helper_text.is_some() {
            options.helper_text.clone_from(&self.helper_text);
        }
        if self.tooltip_text.is_some() {
            options.tooltip_text.clone_from(&self.tooltip_text);
        }
        if self.error_message.is_some() {
            options.error_message.clone_from(&self.error_message);
        }
        if let Some(invalid) = self.invalid {
            options.invalid = invalid;
        }
        if let Some(required) = self.required {
            options.required_indicator_visible = required;
        }
        if let Some(read_only) = self.read_only {
            options.read_only = read_only;
        }
        if self.icon.is_some() {
            options.icon.clone_from(&self.icon);
        }
        if let Some(ms) = self.debounce_ms {
            options.value_change_timeout = Duration::from_millis(ms);
        }
    }

    /// Resolve into a full option set over the defaults.
    pub fn to_options(&self) -> ComboOptions {
        let mut options = ComboOptions::default();
        self.apply(&mut options);
        options
    }
}

/// Load a config file.
pub fn load_config(path: &Path) -> Result<ComboConfig> {
    let contents = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    let config = ComboConfig::from_json(&contents, path)?;
    tracing::debug!(path = %path.display(), "loaded config");
    Ok(config)
}
