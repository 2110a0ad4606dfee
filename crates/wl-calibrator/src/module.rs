//! Kernel module control
//!
//! Automatic calibration reloads the WLAN driver so it picks up a freshly
//! written NVS file. Loading and unloading shell out to the module tools,
//! the same way an operator would.

use std::fmt::Debug;
use std::path::Path;
use std::process::Command;

use crate::error::{CalError, Result};

/// Load / unload the WLAN driver module
pub trait ModuleControl: Debug {
    /// Load `module` (a module name, or a path to a `.ko`)
    ///
    /// # Errors
    ///
    /// Returns error if the module tool fails.
    fn load(&mut self, module: &str) -> Result<()>;

    /// Unload `module`
    ///
    /// # Errors
    ///
    /// Returns error if the module tool fails.
    fn unload(&mut self, module: &str) -> Result<()>;

    /// Whether `module` is currently loaded
    ///
    /// # Errors
    ///
    /// Returns error if the module list cannot be read.
    fn is_loaded(&mut self, module: &str) -> Result<bool>;
}

/// Module control through `insmod` / `modprobe` / `rmmod`
#[derive(Debug, Default)]
pub struct SystemModules;

impl SystemModules {
    /// Create a system module controller
    pub const fn new() -> Self {
        Self
    }
}

impl ModuleControl for SystemModules {
    fn load(&mut self, module: &str) -> Result<()> {
        let (tool, arg) = if module.ends_with(".ko") {
            ("insmod", module)
        } else {
            ("modprobe", module)
        };
        tracing::info!("Loading module: {tool} {arg}");
        run_tool(tool, arg)
    }

    fn unload(&mut self, module: &str) -> Result<()> {
        let name = module_name(module);
        tracing::info!("Unloading module {name}");
        run_tool("rmmod", &name)
    }

    fn is_loaded(&mut self, module: &str) -> Result<bool> {
        let name = module_name(module);
        let modules = std::fs::read_to_string("/proc/modules")?;
        Ok(modules
            .lines()
            .filter_map(|line| line.split_whitespace().next())
            .any(|loaded| loaded == name))
    }
}

/// Module control that only records what it would do
///
/// Used for dry runs and tests. Tracks a loaded set so that
/// [`ModuleControl::is_loaded`] answers consistently.
#[derive(Debug, Default)]
pub struct RecordingModules {
    loaded: Vec<String>,
    actions: Vec<String>,
}

impl RecordingModules {
    /// Start with nothing loaded
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with `modules` already loaded
    pub fn with_loaded(modules: &[&str]) -> Self {
        Self {
            loaded: modules.iter().map(|m| module_name(m)).collect(),
            actions: Vec::new(),
        }
    }

    /// Actions so far, as `load <module>` / `unload <module>`
    pub fn actions(&self) -> &[String] {
        &self.actions
    }
}

impl ModuleControl for RecordingModules {
    fn load(&mut self, module: &str) -> Result<()> {
        tracing::info!("Would load module {module}");
        self.actions.push(format!("load {module}"));
        let name = module_name(module);
        if !self.loaded.contains(&name) {
            self.loaded.push(name);
        }
        Ok(())
    }

    fn unload(&mut self, module: &str) -> Result<()> {
        tracing::info!("Would unload module {module}");
        self.actions.push(format!("unload {module}"));
        let name = module_name(module);
        self.loaded.retain(|m| *m != name);
        Ok(())
    }

    fn is_loaded(&mut self, module: &str) -> Result<bool> {
        Ok(self.loaded.contains(&module_name(module)))
    }
}

/// Kernel module name for a name or `.ko` path (`wl12xx-sdio.ko` -> `wl12xx_sdio`)
pub fn module_name(module: &str) -> String {
    let file = Path::new(module)
        .file_name()
        .and_then(|f| f.to_str())
        .unwrap_or(module);
    file.trim_end_matches(".ko").replace('-', "_")
}

fn run_tool(tool: &str, arg: &str) -> Result<()> {
    let status = Command::new(tool)
        .arg(arg)
        .status()
        .map_err(|e| CalError::module(format!("cannot run {tool}: {e}")))?;

    if !status.success() {
        return Err(CalError::module(format!("{tool} {arg} failed ({status})")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_from_paths() {
        assert_eq!(module_name("wl12xx_sdio"), "wl12xx_sdio");
        assert_eq!(module_name("/lib/modules/x/wl12xx-sdio.ko"), "wl12xx_sdio");
        assert_eq!(module_name("wlcore.ko"), "wlcore");
    }

    #[test]
    fn recording_tracks_loaded_set() {
        let mut modules = RecordingModules::with_loaded(&["wl12xx-sdio"]);
        assert!(modules.is_loaded("wl12xx_sdio").unwrap());
        modules.unload("wl12xx_sdio").unwrap();
        assert!(!modules.is_loaded("wl12xx_sdio").unwrap());
        modules.load("/tmp/wl12xx_sdio.ko").unwrap();
        assert!(modules.is_loaded("wl12xx_sdio").unwrap());
        assert_eq!(
            modules.actions(),
            &["unload wl12xx_sdio", "load /tmp/wl12xx_sdio.ko"]
        );
    }

    #[test]
    fn proc_modules_lookup() {
        let mut modules = SystemModules::new();
        match modules.is_loaded("surely_not_a_loaded_module") {
            Ok(loaded) => assert!(!loaded),
            Err(e) => println!("ℹ️  /proc/modules unavailable: {e}"),
        }
    }
}
