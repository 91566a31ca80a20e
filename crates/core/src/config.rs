use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::actions::action::{Action, ActionGroup, ActionType};
use crate::actions::action_store::ActionStore;
use crate::layout::MenuLayout;
use crate::midi::message_mapping::{MessageMapping, ANY_CHANNEL};

const APP_DIR: &str = "padctl";
const CONFIG_FILE: &str = "config.json";

/// Device-kind tags understood by the device registry.
pub const DEVICE_KINDS: [&str; 3] = ["classic", "colorful", "generic"];

/// One configured controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    pub id: String,
    pub name: String,
    pub in_port: String,
    pub out_port: String,
    /// Device-kind tag, see [`DEVICE_KINDS`]
    #[serde(rename = "type")]
    pub kind: String,
    /// Name of the menu layout shown on this device, empty for none
    pub main_menu: String,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: "New Device".to_string(),
            in_port: String::new(),
            out_port: String::new(),
            kind: "classic".to_string(),
            main_menu: String::new(),
        }
    }
}

/// The persisted document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub first_launch_completed: bool,
    pub open_at_startup: bool,
    pub suppress_unsaved_warning: bool,
    pub devices: Vec<DeviceConfig>,
    pub menus: Vec<MenuLayout>,
    pub current_menu_id: String,
    pub actions: Vec<Action>,
    pub action_groups: Vec<ActionGroup>,
    pub message_mappings: Vec<MessageMapping>,
}

impl Default for Config {
    fn default() -> Self {
        let menu = MenuLayout::default();
        Self {
            first_launch_completed: false,
            open_at_startup: false,
            suppress_unsaved_warning: false,
            devices: Vec::new(),
            current_menu_id: menu.id.clone(),
            menus: vec![menu],
            actions: Vec::new(),
            action_groups: Vec::new(),
            message_mappings: Vec::new(),
        }
    }
}

impl Config {
    /// The selected menu, falling back to the first one.
    pub fn current_menu(&self) -> Option<&MenuLayout> {
        self.menus
            .iter()
            .find(|m| m.id == self.current_menu_id)
            .or_else(|| self.menus.first())
    }

    pub fn menu_by_name(&self, name: &str) -> Option<&MenuLayout> {
        if name.is_empty() {
            return None;
        }
        self.menus.iter().find(|m| m.name == name)
    }

    pub fn add_device(&mut self, device: DeviceConfig) {
        self.devices.push(device);
    }

    pub fn remove_device(&mut self, id: &str) -> bool {
        let before = self.devices.len();
        self.devices.retain(|d| d.id != id);
        self.devices.len() != before
    }

    pub fn update_device(&mut self, device: DeviceConfig) -> bool {
        match self.devices.iter_mut().find(|d| d.id == device.id) {
            Some(existing) => {
                *existing = device;
                true
            }
            None => false,
        }
    }

    /// Build the in-memory action tree from the two flat collections.
    pub fn action_store(&self) -> ActionStore {
        ActionStore::from_parts(self.actions.clone(), self.action_groups.clone())
    }

    /// Copy the tree back into the document before saving.
    pub fn sync_action_store(&mut self, store: &ActionStore) {
        self.actions = store.actions().to_vec();
        self.action_groups = store.groups().to_vec();
    }

    /// Fill in missing structure after loading an older or hand-edited file.
    fn repair(&mut self) {
        if self.menus.is_empty() {
            let menu = MenuLayout::default();
            self.current_menu_id = menu.id.clone();
            self.menus.push(menu);
        }
        for menu in self.menus.iter_mut() {
            let linked = menu.ensure_default_linking();
            if linked > 0 {
                log::debug!("Linked {} classic color(s) in menu '{}'", linked, menu.name);
            }
        }
        for action in self.actions.iter() {
            if action.action_type == ActionType::Unknown {
                log::warn!("Action '{}' has an unknown type and will not run", action.name);
            }
        }
    }
}

/// Loads and saves the [`Config`] document as pretty-printed JSON.
pub struct ConfigManager {
    config_path: PathBuf,
    config: Config,
}

impl ConfigManager {
    /// Create a manager for `config_path`, or the platform default location.
    pub fn new(config_path: Option<PathBuf>) -> Self {
        let config_path = config_path.unwrap_or_else(Self::default_path);

        Self {
            config_path,
            config: Config::default(),
        }
    }

    /// `<platform config dir>/padctl/config.json`, or `./config.json` when the
    /// platform has no config directory.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
            .unwrap_or_else(|| PathBuf::from(CONFIG_FILE))
    }

    /// Load the document. A missing file yields defaults without writing one.
    pub fn load(&mut self) -> Result<&Config, ConfigError> {
        if !self.config_path.exists() {
            log::info!(
                "No config at {}; starting with defaults",
                self.config_path.display()
            );
            self.config = Config::default();
            return Ok(&self.config);
        }

        let content = fs::read_to_string(&self.config_path)
            .map_err(|e| ConfigError::ReadError(e.to_string()))?;

        let mut config: Config =
            serde_json::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.repair();

        self.config = config;
        Ok(&self.config)
    }

    /// Write the document, creating the parent directory if needed.
    pub fn save(&self) -> Result<(), ConfigError> {
        if let Some(parent) = self.config_path.parent() {
            if parent != Path::new("") && parent != Path::new(".") {
                fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError(e.to_string()))?;
            }
        }

        let content = serde_json::to_string_pretty(&self.config)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        fs::write(&self.config_path, content)
            .map_err(|e| ConfigError::WriteError(e.to_string()))?;

        log::debug!("Saved config to {}", self.config_path.display());
        Ok(())
    }

    pub fn update_config(&mut self, config: Config) -> Result<(), ConfigError> {
        if let Err(errors) = Self::validate(&config) {
            return Err(ConfigError::ValidationError(errors));
        }
        self.config = config;
        self.save()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Collect every problem in `config` rather than stopping at the first.
    pub fn validate(config: &Config) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        let store = config.action_store();

        for device in &config.devices {
            if device.name.trim().is_empty() {
                errors.push(format!("device {} has no name", device.id));
            }
            if !DEVICE_KINDS.contains(&device.kind.as_str()) {
                log::warn!(
                    "Device '{}' has unknown type '{}'; it will be treated as colorful",
                    device.name,
                    device.kind
                );
            }
            if !device.main_menu.is_empty() && config.menu_by_name(&device.main_menu).is_none() {
                errors.push(format!(
                    "device '{}' uses missing menu '{}'",
                    device.name, device.main_menu
                ));
            }
        }

        for mapping in &config.message_mappings {
            if mapping.channel != ANY_CHANNEL && !(0..=15).contains(&mapping.channel) {
                errors.push(format!(
                    "mapping '{}' channel must be -1 or between 0 and 15",
                    mapping.name
                ));
            }
            if !(0..=127).contains(&mapping.number) {
                errors.push(format!(
                    "mapping '{}' number must be between 0 and 127",
                    mapping.name
                ));
            }
            if !mapping.action_id.is_empty() && !Self::resolves(&store, &mapping.action_id) {
                errors.push(format!(
                    "mapping '{}' refers to unknown action {}",
                    mapping.name, mapping.action_id
                ));
            }
        }

        for menu in &config.menus {
            for (row, col, pad) in menu.cells() {
                if !pad.action_id.is_empty() && !Self::resolves(&store, &pad.action_id) {
                    errors.push(format!(
                        "menu '{}' pad ({}, {}) refers to unknown action {}",
                        menu.name, row, col, pad.action_id
                    ));
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Reset the document to defaults and save
    pub fn reset_to_defaults(&mut self) -> Result<(), ConfigError> {
        self.config = Config::default();
        self.save()
    }

    fn resolves(store: &ActionStore, id: &str) -> bool {
        store.action(id).is_some() || store.group(id).is_some()
    }
}

/// Configuration error types
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(String),
    #[error("Failed to write config file: {0}")]
    WriteError(String),
    #[error("Failed to parse config file: {0}")]
    ParseError(String),
    #[error("Failed to serialize config: {0}")]
    SerializeError(String),
    #[error("Config validation errors: {}", .0.join(", "))]
    ValidationError(Vec<String>),
}
