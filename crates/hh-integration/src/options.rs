//! Core options and directories
//!
//! Every option a core declares starts at its first choice unless the
//! configuration overrides it for that core.

use hh_core::Config;
use hh_libretro::{CoreConfig, SystemInfo, Variable};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// A declared option and its current choice
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreOption {
    pub key: String,
    pub description: String,
    pub choices: Vec<String>,
    pub selected: usize,
}

impl CoreOption {
    fn from_variable(variable: &Variable) -> Self {
        let mut choices: Vec<String> = variable.choices().map(str::to_string).collect();
        if choices.is_empty() {
            choices.push(String::new());
        }

        Self {
            key: variable.key.clone(),
            description: variable.description().to_string(),
            choices,
            selected: 0,
        }
    }

    pub fn value(&self) -> &str {
        &self.choices[self.selected]
    }
}

/// [`CoreConfig`] backed by the frontend configuration
pub struct CoreOptions {
    system: PathBuf,
    assets: PathBuf,
    saves: PathBuf,
    /// Overrides for every core, by library name
    overrides: BTreeMap<String, BTreeMap<String, String>>,
    /// Library name of the running core
    core: Option<String>,
    options: BTreeMap<String, CoreOption>,
    updated: bool,
}

impl CoreOptions {
    pub fn new(config: &Config) -> Self {
        Self {
            system: config.paths.system.clone(),
            assets: config.paths.assets.clone(),
            saves: config.paths.saves.clone(),
            overrides: config.core.options.clone(),
            core: None,
            options: BTreeMap::new(),
            updated: false,
        }
    }

    /// Options declared by the running core
    pub fn options(&self) -> impl Iterator<Item = &CoreOption> {
        self.options.values()
    }

    /// Select `value` for `key`, returns false if the core doesn't offer it
    pub fn set(&mut self, key: &str, value: &str) -> bool {
        let Some(option) = self.options.get_mut(key) else {
            return false;
        };
        let Some(index) = option.choices.iter().position(|c| c == value) else {
            return false;
        };

        if option.selected != index {
            option.selected = index;
            self.updated = true;
            tracing::info!("Variable {} changed to {}", option.description, value);
        }
        true
    }

    /// Current choices of the running core, as they would be saved to the config
    pub fn selections(&self) -> BTreeMap<String, String> {
        self.options
            .values()
            .map(|o| (o.key.clone(), o.value().to_string()))
            .collect()
    }

    fn override_for(&self, key: &str) -> Option<&str> {
        let core = self.core.as_ref()?;
        self.overrides.get(core)?.get(key).map(String::as_str)
    }
}

impl CoreConfig for CoreOptions {
    fn system_directory(&self) -> &Path {
        &self.system
    }

    fn assets_directory(&self) -> &Path {
        &self.assets
    }

    fn save_directory(&self) -> &Path {
        &self.saves
    }

    fn set_core(&mut self, info: &SystemInfo) {
        self.core = Some(info.library_name.clone());
        self.options.clear();
    }

    fn set_variables(&mut self, variables: &[Variable]) {
        self.options.clear();

        for variable in variables {
            let mut option = CoreOption::from_variable(variable);

            if let Some(wanted) = self.override_for(&option.key).map(str::to_string) {
                match option.choices.iter().position(|c| *c == wanted) {
                    Some(index) => {
                        option.selected = index;
                        self.updated |= index != 0;
                    }
                    None => tracing::warn!(
                        "Ignoring invalid value \"{}\" for option {}",
                        wanted,
                        option.key
                    ),
                }
            }

            self.options.insert(option.key.clone(), option);
        }
    }

    fn variables_updated(&mut self) -> bool {
        std::mem::take(&mut self.updated)
    }

    fn variable(&self, key: &str) -> Option<&str> {
        let option = self.options.get(key);
        if option.is_none() {
            tracing::error!("Unknown variable {}", key);
        }
        option.map(CoreOption::value)
    }
}
