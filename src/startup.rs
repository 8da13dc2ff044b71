// Startup module - banner and module status
//
// Shows which parts of the dashboard came up:
// - Version info and branding
// - Configuration loaded from file
// - Module status with checkmarks, updated as initialization proceeds

use crate::config::{Config, VERSION};

/// ANSI color codes for terminal output
mod colors {
    pub const RESET: &str = "\x1b[0m";
    pub const BOLD: &str = "\x1b[1m";
    pub const DIM: &str = "\x1b[2m";
    pub const CYAN: &str = "\x1b[36m";
    pub const GREEN: &str = "\x1b[32m";
    pub const RED: &str = "\x1b[31m";
    pub const MAGENTA: &str = "\x1b[35m";
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleState {
    /// Enabled by config, not initialized yet
    Pending,
    Active,
    Disabled,
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct ModuleDefinition {
    pub id: &'static str,
    pub description: &'static str,
    pub state: ModuleState,
}

impl ModuleDefinition {
    pub fn new(id: &'static str, description: &'static str, enabled: bool) -> Self {
        Self {
            id,
            description,
            state: if enabled {
                ModuleState::Pending
            } else {
                ModuleState::Disabled
            },
        }
    }
}

/// Module states collected during initialization
#[derive(Debug, Clone)]
pub struct StartupRegistry {
    modules: Vec<ModuleDefinition>,
}

impl StartupRegistry {
    pub fn from_config(config: &Config) -> Self {
        Self {
            modules: config.module_definitions(),
        }
    }

    pub fn activate(&mut self, id: &str) {
        self.set(id, ModuleState::Active);
    }

    pub fn fail(&mut self, id: &str, reason: impl Into<String>) {
        self.set(id, ModuleState::Failed(reason.into()));
    }

    fn set(&mut self, id: &str, state: ModuleState) {
        if let Some(module) = self.modules.iter_mut().find(|m| m.id == id) {
            module.state = state;
        }
    }

    pub fn state(&self, id: &str) -> Option<&ModuleState> {
        self.modules.iter().find(|m| m.id == id).map(|m| &m.state)
    }

    pub fn modules(&self) -> &[ModuleDefinition] {
        &self.modules
    }
}

/// One banner line per module; failures carry their reason
fn module_line(module: &ModuleDefinition) -> String {
    use colors::*;

    let (icon, style) = match &module.state {
        ModuleState::Active => (format!("{GREEN}✓{RESET}"), ""),
        ModuleState::Pending => (format!("{DIM}·{RESET}"), DIM),
        ModuleState::Disabled => (format!("{DIM}○{RESET}"), DIM),
        ModuleState::Failed(_) => (format!("{RED}✗{RESET}"), RED),
    };
    let mut line = format!(
        "    {icon} {style}{:<10}{RESET} {DIM}{}{RESET}",
        module.id, module.description
    );
    match &module.state {
        ModuleState::Failed(reason) => line.push_str(&format!(" {RED}{}{RESET}", reason)),
        ModuleState::Pending => line.push_str(&format!(" {DIM}(not started){RESET}")),
        _ => {}
    }
    line
}

/// Print the banner before the TUI takes over the screen (or in headless mode)
///
/// Also printed when startup aborts, in which case `backend` may be unknown.
pub fn print_startup(config: &Config, registry: &StartupRegistry, backend: Option<&str>) {
    use colors::*;

    println!();
    println!("  {BOLD}{CYAN}CDR Dashboard{RESET} {DIM}v{VERSION}{RESET}");
    println!("  {DIM}Live call detail records{RESET}");
    println!();

    if let Some(path) = Config::config_path() {
        if path.exists() {
            println!("  {DIM}Config:{RESET} {GREEN}✓{RESET} {}", path.display());
        } else {
            println!("  {DIM}Config:{RESET} {DIM}(using defaults){RESET}");
        }
    }
    println!();

    for module in registry.modules() {
        println!("{}", module_line(module));
    }
    println!();

    if let Some(backend) = backend {
        println!("  {MAGENTA}▸{RESET} Backend {BOLD}{}{RESET}", backend);
    }
    println!(
        "  {MAGENTA}▸{RESET} Polling every {}s, {} filters",
        config.poll_interval.as_secs(),
        config.filter_mode
    );
    println!();
}

/// Boot sequence for the TUI log panel
pub fn log_startup(registry: &StartupRegistry, backend: Option<&str>) {
    tracing::info!("═══════════════════════════════");
    tracing::info!("  📞 CDR DASHBOARD v{}", VERSION);
    tracing::info!("═══════════════════════════════");

    for module in registry.modules() {
        match &module.state {
            ModuleState::Failed(reason) => {
                tracing::warn!("  ✗ {} - {} ({})", module.id, module.description, reason)
            }
            ModuleState::Disabled => {
                tracing::info!("  ○ {} - {}", module.id, module.description)
            }
            ModuleState::Pending => {
                tracing::info!("  · {} - {} (not started)", module.id, module.description)
            }
            ModuleState::Active => tracing::info!("  ✓ {} - {}", module.id, module.description),
        }
    }

    if let Some(backend) = backend {
        tracing::info!("▸ Backend {}", backend);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_tracks_states() {
        let config = Config {
            enable_tui: false,
            ..Config::default()
        };
        let mut registry = StartupRegistry::from_config(&config);

        assert_eq!(registry.state("tui"), Some(&ModuleState::Disabled));
        assert_eq!(registry.state("poller"), Some(&ModuleState::Pending));

        registry.activate("poller");
        registry.fail("auth", "no token");
        assert_eq!(registry.state("poller"), Some(&ModuleState::Active));
        assert_eq!(
            registry.state("auth"),
            Some(&ModuleState::Failed("no token".to_string()))
        );
        assert_eq!(registry.state("missing"), None);
    }

    #[test]
    fn failed_module_line_shows_reason() {
        let mut registry = StartupRegistry::from_config(&Config::default());
        registry.activate("bootstrap");
        registry.fail("auth", "identity provider unreachable");

        let line = |id: &str| {
            let module = registry.modules().iter().find(|m| m.id == id).unwrap();
            module_line(module)
        };

        let auth = line("auth");
        assert!(auth.contains('✗'));
        assert!(auth.contains("identity provider unreachable"));

        assert!(line("bootstrap").contains('✓'));
        // Modules after the failure never came up
        let poller = line("poller");
        assert!(!poller.contains('✓'));
        assert!(poller.contains("not started"));
    }
}
