//! NVS file commands (`get` / `set` sections)
//!
//! None of these talk to the driver; they work on files only. Writes go
//! through [`Context::save_nvs`] so a dry run leaves the disk untouched.

use std::path::{Path, PathBuf};

use wl_chip::ChipVariant;

use crate::args::{expect_exact, expect_range, parse_mac};
use crate::commands::Context;
use crate::error::{CalError, Result};
use crate::ini::IniFile;
use crate::mac::MacAddr;
use crate::nvs::NvsFile;

fn path_or(args: &[&str], index: usize, default: &Path) -> PathBuf {
    args.get(index)
        .map_or_else(|| default.to_path_buf(), PathBuf::from)
}

/// `get nvs_mac <nvs file>`
pub(crate) fn get_nvs_mac(ctx: &mut Context<'_>, args: &[&str]) -> Result<()> {
    expect_exact(args, 1)?;
    let nvs = ctx.load_nvs(Path::new(args[0]))?;
    writeln!(ctx.out, "MAC address: {}", nvs.mac())?;
    Ok(())
}

/// `set nvs_mac <nvs file> [mac]`
///
/// Without a MAC a random address under the TI OUI is generated.
pub(crate) fn set_nvs_mac(ctx: &mut Context<'_>, args: &[&str]) -> Result<()> {
    expect_range(args, 1, 2)?;
    let mac = match args.get(1) {
        Some(arg) => parse_mac(arg)?,
        None => MacAddr::random_ti()?,
    };
    write_mac(ctx, Path::new(args[0]), mac)?;
    writeln!(ctx.out, "MAC address {mac} written to {}", args[0])?;
    Ok(())
}

/// Store `mac` in the NVS file at `path`, in place
///
/// # Errors
///
/// Returns `CalError::Usage` for a zero or multicast address, or the
/// load / save failure.
pub fn write_mac(ctx: &mut Context<'_>, path: &Path, mac: MacAddr) -> Result<()> {
    if mac.is_zero() || mac.is_multicast() {
        return Err(CalError::usage(format!("{mac} is not a valid station address")));
    }
    let mut nvs = ctx.load_nvs(path)?;
    nvs.set_mac(mac);
    ctx.save_nvs(&nvs, path)
}

/// `set ref_nvs <ini file> [output] [chip]`
pub(crate) fn set_ref_nvs(ctx: &mut Context<'_>, args: &[&str]) -> Result<()> {
    expect_range(args, 1, 3)?;
    let output = path_or(args, 1, &ctx.config.new_nvs_path);
    let variant = match args.get(2) {
        Some(name) => {
            let variant = ChipVariant::parse(name)
                .ok_or_else(|| CalError::usage(format!("Unknown chip: {name}")))?;
            if !variant.is_wl12xx() {
                return Err(CalError::usage(format!("{variant} does not use an NVS file")));
            }
            Some(variant)
        }
        None => None,
    };

    let variant = create_reference(ctx, Path::new(args[0]), &output, variant)?;
    writeln!(
        ctx.out,
        "Reference {variant} NVS written to {}",
        output.display()
    )?;
    Ok(())
}

/// Build a reference NVS from `ini` and write it to `output`
///
/// The chip variant is detected from the INI keys unless `variant` is given.
///
/// # Errors
///
/// Returns error if the INI cannot be read or does not fit the variant.
pub fn create_reference(
    ctx: &mut Context<'_>,
    ini: &Path,
    output: &Path,
    variant: Option<ChipVariant>,
) -> Result<ChipVariant> {
    let ini = IniFile::load(ini)?;
    let variant = variant.unwrap_or_else(|| ini.detect_variant());
    let nvs = NvsFile::reference(variant, &ini)?;
    ctx.save_nvs(&nvs, output)?;
    Ok(variant)
}

/// `set upd_nvs <ini file> [nvs file]`
///
/// Reads the given NVS (default: the current one), regenerates its INI
/// section and writes the result to the new-NVS path.
pub(crate) fn set_upd_nvs(ctx: &mut Context<'_>, args: &[&str]) -> Result<()> {
    expect_range(args, 1, 2)?;
    let input = path_or(args, 1, &ctx.config.nvs_path);
    let ini = IniFile::load(args[0])?;

    let mut nvs = ctx.load_nvs(&input)?;
    nvs.update_ini(&ini)?;
    let output = ctx.config.new_nvs_path.clone();
    ctx.save_nvs(&nvs, &output)?;

    writeln!(ctx.out, "Updated NVS written to {}", output.display())?;
    Ok(())
}

/// `get dump_nvs [nvs file]`
pub(crate) fn get_dump_nvs(ctx: &mut Context<'_>, args: &[&str]) -> Result<()> {
    expect_range(args, 0, 1)?;
    let path = path_or(args, 0, &ctx.config.nvs_path);
    let nvs = ctx.load_nvs(&path)?;
    write!(ctx.out, "{}", nvs.dump())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::ScriptedBackend;
    use crate::config::Config;
    use crate::module::RecordingModules;
    use tempfile::TempDir;

    fn with_ctx<T>(dry_run: bool, f: impl FnOnce(&mut Context<'_>) -> T) -> T {
        let mut backend = ScriptedBackend::new();
        let mut modules = RecordingModules::new();
        let mut out = Vec::new();
        let config = Config {
            dry_run,
            ..Config::default()
        };
        let mut ctx = Context::new(&mut backend, &mut modules, config, &mut out);
        f(&mut ctx)
    }

    #[test]
    fn reference_then_mac() {
        let dir = TempDir::new().unwrap();
        let ini = dir.path().join("radio.ini");
        let nvs = dir.path().join("nvs.bin");
        std::fs::write(&ini, "RefClk = 05\n").unwrap();
        let mac: MacAddr = "08:00:28:01:02:03".parse().unwrap();

        with_ctx(false, |ctx| {
            let variant = create_reference(ctx, &ini, &nvs, None).unwrap();
            assert_eq!(variant, ChipVariant::Wl127x);
            write_mac(ctx, &nvs, mac).unwrap();
        });
        assert_eq!(std::fs::metadata(&nvs).unwrap().len(), 912);
        assert_eq!(NvsFile::load(&nvs).unwrap().mac(), mac);

        let forced = dir.path().join("forced.bin");
        let variant = with_ctx(false, |ctx| {
            create_reference(ctx, &ini, &forced, Some(ChipVariant::Wl128x)).unwrap()
        });
        assert_eq!(variant, ChipVariant::Wl128x);
        assert_eq!(std::fs::metadata(&forced).unwrap().len(), 1113);
    }

    #[test]
    fn rejects_non_station_addresses() {
        let dir = TempDir::new().unwrap();
        let nvs = dir.path().join("missing.bin");
        with_ctx(false, |ctx| {
            assert!(write_mac(ctx, &nvs, MacAddr::ZERO).is_err());
            let multicast = "01:00:5e:00:00:01".parse().unwrap();
            assert!(write_mac(ctx, &nvs, multicast).is_err());
            let station = "08:00:28:00:00:01".parse().unwrap();
            assert!(matches!(
                write_mac(ctx, &nvs, station),
                Err(CalError::FileNotFound { .. })
            ));
        });
    }

    #[test]
    fn dry_run_keeps_files_in_memory() {
        let dir = TempDir::new().unwrap();
        let ini = dir.path().join("radio.ini");
        let nvs = dir.path().join("nvs.bin");
        std::fs::write(&ini, "RefClk = 05\n").unwrap();
        let mac: MacAddr = "08:00:28:0a:0b:0c".parse().unwrap();

        with_ctx(true, |ctx| {
            create_reference(ctx, &ini, &nvs, None).unwrap();
            write_mac(ctx, &nvs, mac).unwrap();
            assert_eq!(ctx.load_nvs(&nvs).unwrap().mac(), mac);
            assert_eq!(ctx.staged_paths().collect::<Vec<_>>(), vec![nvs.as_path()]);
        });
        assert!(!nvs.exists());
    }
}
