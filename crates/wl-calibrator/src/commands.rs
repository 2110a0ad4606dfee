//! Command table and dispatch
//!
//! ```text
//! calibrator [dev <devname> | phy <phyname>] <section> <command> [args...]
//! calibrator <section-less command> [args...]
//! ```
//!
//! The table is scanned in order; the first `(section, name)` match wins.
//! Multi-step flows re-enter [`execute`] with fixed argument vectors.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::backend::TestmodeBackend;
use crate::config::Config;
use crate::error::{CalError, Result};
use crate::module::ModuleControl;
use crate::nvs::NvsFile;
use crate::target::{resolve_netdev, resolve_phy, IdBy, Target};
use crate::testmode::{self, FwAnswer};
use crate::{misc, plt, sequence, wl18xx};

/// Command handler: receives the arguments after the command words
pub type Handler = fn(&mut Context<'_>, &[&str]) -> Result<()>;

/// Static command descriptor
pub struct Command {
    /// Section word (`plt`, `get`, ...) or `None` for top-level commands
    pub section: Option<&'static str>,
    /// Command word
    pub name: &'static str,
    /// Argument synopsis
    pub args: &'static str,
    /// Which device kind the command is addressed by
    pub id_by: IdBy,
    /// Implementation
    pub handler: Handler,
    /// One-line description
    pub help: &'static str,
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Command")
            .field("section", &self.section)
            .field("name", &self.name)
            .field("id_by", &self.id_by)
            .finish_non_exhaustive()
    }
}

impl Command {
    /// Full usage line
    pub fn synopsis(&self) -> String {
        let device = match self.id_by {
            IdBy::None => "",
            IdBy::Phy => "phy <phyname> ",
            IdBy::Netdev => "dev <devname> ",
            IdBy::Any => "dev <devname> | phy <phyname> ",
        };
        let words = match self.section {
            Some(section) => format!("{section} {}", self.name),
            None => self.name.to_string(),
        };
        let line = format!("calibrator {device}{words} {}", self.args);
        line.trim_end().to_string()
    }
}

/// State shared by every handler
pub struct Context<'a> {
    /// Testmode transport
    pub backend: &'a mut dyn TestmodeBackend,
    /// Driver module control
    pub modules: &'a mut dyn ModuleControl,
    /// Paths and flags
    pub config: Config,
    /// Device the current command is addressed to
    pub target: Target,
    /// Command output
    pub out: &'a mut dyn Write,
    /// NVS images a dry run would have written, by path
    staged: HashMap<PathBuf, NvsFile>,
}

impl std::fmt::Debug for Context<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("backend", &self.backend)
            .field("modules", &self.modules)
            .field("config", &self.config)
            .field("target", &self.target)
            .field("staged", &self.staged.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl<'a> Context<'a> {
    /// Create a context with no target
    pub fn new(
        backend: &'a mut dyn TestmodeBackend,
        modules: &'a mut dyn ModuleControl,
        config: Config,
        out: &'a mut dyn Write,
    ) -> Self {
        Self {
            backend,
            modules,
            config,
            target: Target::None,
            out,
            staged: HashMap::new(),
        }
    }

    /// Read an NVS file, seeing writes a dry run held back
    ///
    /// # Errors
    ///
    /// Returns error if the file is missing, unreadable or invalid.
    pub fn load_nvs(&self, path: &Path) -> Result<NvsFile> {
        match self.staged.get(path) {
            Some(nvs) => {
                tracing::info!("Dry run: using unwritten NVS for {}", path.display());
                Ok(nvs.clone())
            }
            None => NvsFile::load(path),
        }
    }

    /// Write an NVS file, or only record it during a dry run
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be written.
    pub fn save_nvs(&mut self, nvs: &NvsFile, path: &Path) -> Result<()> {
        if self.config.dry_run {
            tracing::info!(
                "Dry run: would write {} NVS ({} bytes) to {}",
                nvs.variant(),
                nvs.as_bytes().len(),
                path.display()
            );
            self.staged.insert(path.to_path_buf(), nvs.clone());
            return Ok(());
        }
        nvs.save(path)
    }

    /// Paths a dry run would have written
    pub fn staged_paths(&self) -> impl Iterator<Item = &Path> {
        self.staged.keys().map(PathBuf::as_path)
    }

    /// Send an encoded testmode request to the current target
    ///
    /// # Errors
    ///
    /// Returns error if the backend fails.
    pub fn testmode(&mut self, request: &[u8]) -> Result<Option<Vec<u8>>> {
        self.backend.testmode(&self.target, request)
    }

    /// Run a firmware test that needs no answer
    ///
    /// A reply, if the driver sends one anyway, is still status-checked.
    ///
    /// # Errors
    ///
    /// Returns error if delivery fails or the firmware reports failure.
    pub fn fw_test(&mut self, test_id: u8, params: &[u8]) -> Result<()> {
        let request = testmode::fw_test(test_id, params, false);
        if let Some(reply) = self.testmode(&request)? {
            let data = testmode::answer_data(&reply)?;
            testmode::parse_fw_answer(&data, test_id)?;
        }
        Ok(())
    }

    /// Run a firmware test and return its answer
    ///
    /// # Errors
    ///
    /// Returns `CalError::NoAnswer` if the driver sends nothing back.
    pub fn fw_query(&mut self, test_id: u8, params: &[u8]) -> Result<FwAnswer> {
        let request = testmode::fw_test(test_id, params, true);
        let reply = self
            .testmode(&request)?
            .ok_or_else(|| CalError::no_answer(format!("test 0x{test_id:02x}")))?;
        let data = testmode::answer_data(&reply)?;
        testmode::parse_fw_answer(&data, test_id)
    }
}

macro_rules! command {
    ($section:expr, $name:literal, $args:literal, $id_by:ident, $handler:path, $help:literal) => {
        Command {
            section: $section,
            name: $name,
            args: $args,
            id_by: IdBy::$id_by,
            handler: $handler,
            help: $help,
        }
    };
}

/// Every command, in dispatch order
pub static COMMANDS: &[Command] = &[
    // wl12xx production line test
    command!(
        Some("plt"),
        "power_mode",
        "<on|off|fem_detect>",
        Any,
        plt::power_mode,
        "Enter or leave PLT mode"
    ),
    command!(
        Some("plt"),
        "tune_channel",
        "<band> <channel>",
        Any,
        plt::tune_channel,
        "Tune the radio (band 0 = 2.4 GHz, 1 = 5 GHz)"
    ),
    command!(
        Some("plt"),
        "ref_point",
        "<voltage> <power> <subband>",
        Any,
        plt::ref_point,
        "Set the power-detector reference point"
    ),
    command!(
        Some("plt"),
        "tx_bip",
        "<0|1> <0|1> <0|1> <0|1> <0|1> <0|1> <0|1> <0|1> [nvs file]",
        Any,
        plt::tx_bip,
        "Run TX-BIP calibration on the flagged sub-bands and write a new NVS"
    ),
    command!(
        Some("plt"),
        "tx_cont",
        "<delay> <rate> <size> <amount> <power> <seed> <pkt mode> <dcf> <gi> <type> <mode> <src mac> <dst mac>",
        Any,
        plt::tx_cont,
        "Start continuous TX"
    ),
    command!(
        Some("plt"),
        "tx_tone",
        "<mode> <power>",
        Any,
        plt::tx_tone,
        "Start a carrier tone"
    ),
    command!(
        Some("plt"),
        "tx_stop",
        "",
        Any,
        plt::tx_stop,
        "Stop any TX test"
    ),
    command!(
        Some("plt"),
        "start_rx_statcs",
        "",
        Any,
        plt::start_rx_statcs,
        "Start collecting RX statistics"
    ),
    command!(
        Some("plt"),
        "stop_rx_statcs",
        "",
        Any,
        plt::stop_rx_statcs,
        "Stop collecting RX statistics"
    ),
    command!(
        Some("plt"),
        "reset_rx_statcs",
        "",
        Any,
        plt::reset_rx_statcs,
        "Reset RX statistics"
    ),
    command!(
        Some("plt"),
        "get_rx_statcs",
        "",
        Any,
        plt::get_rx_statcs,
        "Print RX statistics"
    ),
    command!(
        Some("plt"),
        "get_mac",
        "",
        Any,
        plt::get_mac,
        "Print the MAC address burned into the chip"
    ),
    command!(
        Some("plt"),
        "fw_version",
        "",
        Any,
        plt::fw_version,
        "Print firmware and PHY versions"
    ),
    command!(
        Some("plt"),
        "calibrate",
        "[dual] [nvs file]",
        Any,
        sequence::calibrate_cmd,
        "Power on, tune, run TX-BIP, power off"
    ),
    command!(
        Some("plt"),
        "autocalibrate",
        "<dev> <module> <ini file> <nvs file> [mac]",
        None,
        sequence::autocalibrate_cmd,
        "Reload the driver around a full calibration and stamp a MAC"
    ),
    // wl18xx production line test
    command!(
        Some("wl18xx_plt"),
        "tune_channel",
        "<channel> <band> <bandwidth>",
        Any,
        wl18xx::tune_channel,
        "Tune channel, band and bandwidth"
    ),
    command!(
        Some("wl18xx_plt"),
        "start_tx",
        "<rate> <power> <size> <mode>",
        Any,
        wl18xx::start_tx,
        "Start TX simulation"
    ),
    command!(
        Some("wl18xx_plt"),
        "stop_tx",
        "",
        Any,
        wl18xx::stop_tx,
        "Stop TX simulation"
    ),
    command!(
        Some("wl18xx_plt"),
        "start_rx",
        "",
        Any,
        wl18xx::start_rx,
        "Start counting received packets"
    ),
    command!(
        Some("wl18xx_plt"),
        "stop_rx",
        "",
        Any,
        wl18xx::stop_rx,
        "Stop counting received packets"
    ),
    command!(
        Some("wl18xx_plt"),
        "get_rx_stats",
        "",
        Any,
        wl18xx::get_rx_stats,
        "Print RX counters"
    ),
    command!(
        Some("wl18xx_plt"),
        "tx_tone_start",
        "<mode> <offset>",
        Any,
        wl18xx::tx_tone_start,
        "Start a carrier tone"
    ),
    command!(
        Some("wl18xx_plt"),
        "tx_tone_stop",
        "",
        Any,
        wl18xx::tx_tone_stop,
        "Stop the carrier tone"
    ),
    command!(
        Some("wl18xx_plt"),
        "set_antenna_mode_24g",
        "<mode>",
        Any,
        wl18xx::set_antenna_mode_24g,
        "Select the 2.4 GHz antenna mode"
    ),
    command!(
        Some("wl18xx_plt"),
        "set_antenna_mode_5g",
        "<mode>",
        Any,
        wl18xx::set_antenna_mode_5g,
        "Select the 5 GHz antenna mode"
    ),
    // NVS files
    command!(
        Some("get"),
        "nvs_mac",
        "<nvs file>",
        None,
        misc::get_nvs_mac,
        "Print the MAC address stored in an NVS file"
    ),
    command!(
        Some("set"),
        "nvs_mac",
        "<nvs file> [mac]",
        None,
        misc::set_nvs_mac,
        "Store a MAC address (random TI MAC if omitted) in an NVS file"
    ),
    command!(
        Some("set"),
        "ref_nvs",
        "<ini file> [output] [127x|128x]",
        None,
        misc::set_ref_nvs,
        "Create a reference NVS from an INI file (chip detected from its keys by default)"
    ),
    command!(
        Some("set"),
        "upd_nvs",
        "<ini file> [nvs file]",
        None,
        misc::set_upd_nvs,
        "Regenerate the radio section of an NVS from an INI file"
    ),
    command!(
        Some("get"),
        "dump_nvs",
        "[nvs file]",
        None,
        misc::get_dump_nvs,
        "Print the contents of an NVS file"
    ),
    // top level
    command!(
        None,
        "help",
        "[section]",
        None,
        help,
        "List commands"
    ),
];

/// Parse an optional `dev <name>` / `phy <name>` prefix, then execute
///
/// The command is looked up before the device, so a typo is reported as a
/// usage error even when the device does not exist.
///
/// # Errors
///
/// Returns error if the device cannot be resolved or the command fails.
pub fn dispatch(ctx: &mut Context<'_>, argv: &[&str]) -> Result<()> {
    let (device, rest) = match argv {
        [kind @ ("dev" | "phy"), name, rest @ ..] => (Some((*kind, *name)), rest),
        ["dev" | "phy"] => {
            return Err(CalError::usage(format!("`{}` needs a device name", argv[0])))
        }
        _ => (None, argv),
    };

    find(rest)?;

    ctx.target = match device {
        Some(("dev", name)) => resolve_netdev(&ctx.config.sysfs_root, name)?,
        Some((_, name)) => resolve_phy(&ctx.config.sysfs_root, name)?,
        None => Target::None,
    };

    execute(ctx, rest)
}

/// Look up and run a command against the current target
///
/// # Errors
///
/// Returns `CalError::Usage` / `CalError::UnknownCommand` on lookup
/// failures, otherwise whatever the handler returns.
pub fn execute(ctx: &mut Context<'_>, argv: &[&str]) -> Result<()> {
    let (cmd, args) = find(argv)?;

    if !ctx.target.accepted_by(cmd.id_by) {
        let reason = match (&ctx.target, cmd.id_by) {
            (Target::None, _) => format!("{} needs a device", cmd.name),
            (_, IdBy::None) => format!("{} does not take a device", cmd.name),
            (target, _) => format!("{} cannot be addressed by {target}", cmd.name),
        };
        return Err(CalError::Usage {
            reason,
            usage: Some(cmd.synopsis()),
        });
    }

    tracing::debug!("Running {} on {}", argv.join(" "), ctx.target);

    (cmd.handler)(ctx, args).map_err(|e| match e {
        CalError::Usage { reason, usage: None } => CalError::Usage {
            reason,
            usage: Some(cmd.synopsis()),
        },
        other => other,
    })
}

/// Linear scan of [`COMMANDS`]
///
/// # Errors
///
/// Returns `CalError::Usage` listing the section when the section exists
/// but the command does not, `CalError::UnknownCommand` otherwise.
pub fn find<'v, 's>(argv: &'v [&'s str]) -> Result<(&'static Command, &'v [&'s str])> {
    let Some(&first) = argv.first() else {
        return Err(CalError::Usage {
            reason: "No command given".into(),
            usage: Some(help_text(None)),
        });
    };

    for cmd in COMMANDS {
        match cmd.section {
            Some(section) if section == first => {
                if argv.get(1) == Some(&cmd.name) {
                    return Ok((cmd, &argv[2..]));
                }
            }
            None if cmd.name == first => return Ok((cmd, &argv[1..])),
            _ => {}
        }
    }

    if COMMANDS.iter().any(|c| c.section == Some(first)) {
        let what = argv.get(1).copied().unwrap_or("<none>");
        return Err(CalError::Usage {
            reason: format!("Unknown {first} command: {what}"),
            usage: Some(help_text(Some(first))),
        });
    }

    Err(CalError::UnknownCommand {
        command: argv.join(" "),
    })
}

/// Command listing, optionally restricted to one section
pub fn help_text(section: Option<&str>) -> String {
    let mut text = String::from("Commands:\n");
    for cmd in COMMANDS {
        if section.is_some_and(|s| cmd.section != Some(s)) {
            continue;
        }
        text.push_str("  ");
        text.push_str(&cmd.synopsis());
        text.push_str("\n      ");
        text.push_str(cmd.help);
        text.push('\n');
    }
    text
}

fn help(ctx: &mut Context<'_>, args: &[&str]) -> Result<()> {
    crate::args::expect_range(args, 0, 1)?;
    write!(ctx.out, "{}", help_text(args.first().copied()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_has_no_duplicates() {
        for (i, a) in COMMANDS.iter().enumerate() {
            for b in &COMMANDS[i + 1..] {
                assert!(
                    !(a.section == b.section && a.name == b.name),
                    "duplicate command {:?} {}",
                    a.section,
                    a.name
                );
            }
        }
    }

    #[test]
    fn find_section_command() {
        let (cmd, args) = find(&["plt", "tune_channel", "0", "7"]).unwrap();
        assert_eq!(cmd.name, "tune_channel");
        assert_eq!(cmd.section, Some("plt"));
        assert_eq!(args, &["0", "7"]);

        let (cmd, _) = find(&["wl18xx_plt", "tune_channel", "6", "0", "0"]).unwrap();
        assert_eq!(cmd.section, Some("wl18xx_plt"));
    }

    #[test]
    fn find_top_level_command() {
        let (cmd, args) = find(&["help", "plt"]).unwrap();
        assert_eq!(cmd.name, "help");
        assert_eq!(args, &["plt"]);
    }

    #[test]
    fn unknown_commands() {
        assert!(matches!(
            find(&["plt", "frobnicate"]),
            Err(CalError::Usage { usage: Some(_), .. })
        ));
        assert!(matches!(find(&["frobnicate"]), Err(CalError::UnknownCommand { .. })));
        assert_eq!(find(&[]).unwrap_err().exit_code(), 1);
    }

    #[test]
    fn synopsis_mentions_device_kind() {
        let (cmd, _) = find(&["plt", "power_mode"]).unwrap();
        assert!(cmd
            .synopsis()
            .starts_with("calibrator dev <devname> | phy <phyname> plt power_mode"));
        let (cmd, _) = find(&["get", "nvs_mac"]).unwrap();
        assert_eq!(cmd.synopsis(), "calibrator get nvs_mac <nvs file>");
    }

    #[test]
    fn help_filters_by_section() {
        let text = help_text(Some("wl18xx_plt"));
        assert!(text.contains("start_tx"));
        assert!(!text.contains("tx_bip"));
    }
}
