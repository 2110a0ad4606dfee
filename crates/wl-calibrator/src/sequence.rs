//! Multi-step calibration flows
//!
//! Each step is an ordinary table command run through
//! [`execute`](crate::commands::execute) with a fixed argument vector, so
//! a sequence behaves exactly like typing the steps by hand.

use std::path::Path;

use wl_chip::band::CALIBRATION_CHANNEL_2_4;
use wl_chip::testmode::TX_BIP_SUB_BANDS;

use crate::args::{expect_range, parse_mac};
use crate::commands::{execute, Context};
use crate::error::{CalError, Result};
use crate::mac::MacAddr;
use crate::misc::{create_reference, write_mac};
use crate::target::wait_for_netdev;

fn run_step(ctx: &mut Context<'_>, argv: &[&str]) -> Result<()> {
    tracing::info!("Step: {}", argv.join(" "));
    execute(ctx, argv).map_err(|e| CalError::Step {
        step: argv.join(" "),
        source: Box::new(e),
    })
}

/// Power on, tune to the calibration channel, run TX-BIP, power off
///
/// `dual` calibrates every sub-band instead of 2.4 GHz only. Results go to
/// `output`, or the configured new-NVS path. If a step fails the radio is
/// powered off before the step's error is returned.
///
/// # Errors
///
/// Returns `CalError::Step` naming the first failing step.
pub fn calibrate(ctx: &mut Context<'_>, dual: bool, output: Option<&str>) -> Result<()> {
    let channel = CALIBRATION_CHANNEL_2_4.to_string();
    let mut tx_bip = vec!["plt", "tx_bip"];
    for sub_band in 0..TX_BIP_SUB_BANDS {
        tx_bip.push(if dual || sub_band == 0 { "1" } else { "0" });
    }
    tx_bip.extend(output);

    let steps: [&[&str]; 3] = [
        &["plt", "power_mode", "on"],
        &["plt", "tune_channel", "0", channel.as_str()],
        tx_bip.as_slice(),
    ];

    for step in steps {
        if let Err(e) = run_step(ctx, step) {
            tracing::error!("{e}");
            if let Err(off) = execute(ctx, &["plt", "power_mode", "off"]) {
                tracing::warn!("Power off after failed step also failed: {off}");
            }
            return Err(e);
        }
    }

    run_step(ctx, &["plt", "power_mode", "off"])
}

/// `plt calibrate [dual] [nvs file]`
pub(crate) fn calibrate_cmd(ctx: &mut Context<'_>, args: &[&str]) -> Result<()> {
    expect_range(args, 0, 2)?;
    let (dual, rest) = match args {
        ["dual", rest @ ..] => (true, rest),
        _ => (false, args),
    };
    if rest.len() > 1 {
        return Err(CalError::usage(format!("Unexpected argument: {}", rest[1])));
    }

    calibrate(ctx, dual, rest.first().copied())
}

/// Parameters of an automatic calibration
#[derive(Debug, Clone, Copy)]
pub struct AutoCalibration<'a> {
    /// Interface the driver creates
    pub netdev: &'a str,
    /// Driver module name or `.ko` path
    pub module: &'a str,
    /// Radio INI file
    pub ini: &'a Path,
    /// NVS file the driver loads; rewritten in place
    pub nvs: &'a Path,
    /// MAC to stamp; random TI address when `None`
    pub mac: Option<MacAddr>,
}

/// Full calibration including driver reloads
///
/// 1. unload the driver if loaded
/// 2. write a reference NVS built from the INI
/// 3. load the driver and wait for the interface, as often as
///    [`Config::netdev_wait_attempts`](crate::Config::netdev_wait_attempts)
///    allows
/// 4. [`calibrate`] with the NVS as both input and output
/// 5. unload, stamp the MAC, load again
///
/// Returns the MAC written to the NVS.
///
/// # Errors
///
/// Returns the first failing step's error.
pub fn autocalibrate(ctx: &mut Context<'_>, params: &AutoCalibration<'_>) -> Result<MacAddr> {
    let module = params.module;

    if ctx.modules.is_loaded(module)? {
        ctx.modules.unload(module)?;
    } else {
        tracing::debug!("{module} not loaded");
    }

    let variant = create_reference(ctx, params.ini, params.nvs, None)?;
    tracing::info!(
        "Reference {variant} NVS prepared at {}",
        params.nvs.display()
    );

    ctx.modules.load(module)?;
    let target = wait_for_netdev(
        &ctx.config.sysfs_root,
        params.netdev,
        ctx.config.netdev_wait_attempts,
        ctx.config.netdev_wait_interval,
    )?;

    let mut config = ctx.config.clone();
    config.nvs_path = params.nvs.to_path_buf();
    config.new_nvs_path = params.nvs.to_path_buf();
    let saved_config = std::mem::replace(&mut ctx.config, config);
    let saved_target = std::mem::replace(&mut ctx.target, target);

    let calibrated = calibrate(ctx, false, None);

    ctx.config = saved_config;
    ctx.target = saved_target;
    calibrated?;

    ctx.modules.unload(module)?;

    let mac = match params.mac {
        Some(mac) => mac,
        None => MacAddr::random_ti()?,
    };
    write_mac(ctx, params.nvs, mac)?;
    tracing::info!("NVS MAC set to {mac}");

    ctx.modules.load(module)?;
    Ok(mac)
}

/// `plt autocalibrate <dev> <module> <ini file> <nvs file> [mac]`
pub(crate) fn autocalibrate_cmd(ctx: &mut Context<'_>, args: &[&str]) -> Result<()> {
    expect_range(args, 4, 5)?;
    let mac = args.get(4).map(|arg| parse_mac(arg)).transpose()?;

    let params = AutoCalibration {
        netdev: args[0],
        module: args[1],
        ini: Path::new(args[2]),
        nvs: Path::new(args[3]),
        mac,
    };
    let mac = autocalibrate(ctx, &params)?;

    writeln!(ctx.out, "Calibration done, MAC address {mac}")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::ScriptedBackend;
    use crate::config::Config;
    use crate::module::RecordingModules;
    use crate::target::Target;
    use tempfile::TempDir;
    use wl_chip::testmode::test;

    fn with_ctx<T>(backend: &mut ScriptedBackend, f: impl FnOnce(&mut Context<'_>) -> T) -> T {
        let mut modules = RecordingModules::new();
        let mut out = Vec::new();
        let mut ctx = Context::new(backend, &mut modules, Config::default(), &mut out);
        ctx.target = Target::Phy {
            index: 0,
            name: "phy0".into(),
        };
        f(&mut ctx)
    }

    #[test]
    fn failed_tune_still_powers_off() {
        let mut backend = ScriptedBackend::new();
        backend.push_ack().push_fw_status(test::CHANNEL_TUNE, 2);

        let result = with_ctx(&mut backend, |ctx| calibrate(ctx, false, None));
        let err = result.unwrap_err();
        match &err {
            CalError::Step { step, source } => {
                assert_eq!(step, "plt tune_channel 0 7");
                assert!(matches!(**source, CalError::Firmware { status: 2, .. }));
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(err.exit_code(), 2);

        let transcript = backend.transcript();
        assert_eq!(transcript.len(), 3);
        assert_eq!(transcript[0], "SET_PLT_MODE mode=1");
        assert_eq!(transcript[2], "SET_PLT_MODE mode=0");
    }

    #[test]
    fn missing_nvs_aborts_before_calibration() {
        let dir = TempDir::new().unwrap();
        let mut backend = ScriptedBackend::new();
        let err = with_ctx(&mut backend, |ctx| {
            ctx.config.nvs_path = dir.path().join("missing.bin");
            calibrate(ctx, true, None)
        })
        .unwrap_err();

        match err {
            CalError::Step { step, source } => {
                assert_eq!(step, "plt tx_bip 1 1 1 1 1 1 1 1");
                assert!(matches!(*source, CalError::FileNotFound { .. }));
            }
            other => panic!("unexpected error {other:?}"),
        }
        // on, tune, off: the P2G request is never sent
        assert_eq!(backend.transcript().len(), 3);
    }

    #[test]
    fn calibrate_argument_forms() {
        let mut backend = ScriptedBackend::new();
        let result = with_ctx(&mut backend, |ctx| calibrate_cmd(ctx, &["dual", "a", "b"]));
        assert_eq!(result.unwrap_err().exit_code(), 1);
        assert!(backend.requests().is_empty());
    }
}
