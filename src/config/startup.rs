//! Module definitions for the StartupRegistry
//!
//! Adding a module? Add it here and it shows up in the startup banner.

use super::Config;
use crate::startup::ModuleDefinition;

impl Config {
    pub fn module_definitions(&self) -> Vec<ModuleDefinition> {
        vec![
            ModuleDefinition::new("bootstrap", "Service endpoints", true),
            ModuleDefinition::new("auth", "Bearer token", true),
            ModuleDefinition::new("poller", "Live CDR feed", true),
            ModuleDefinition::new("tui", "Terminal dashboard", self.enable_tui),
            ModuleDefinition::new("log-file", "JSON log files", self.logging.file_enabled),
        ]
    }
}
