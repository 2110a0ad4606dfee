//! NVS file commands through the dispatcher

use tempfile::TempDir;
use wl_calibrator::{
    dispatch, CalError, ChipVariant, Config, Context, NvsFile, RecordingModules, ScriptedBackend,
};

const WL127X_INI: &str = "\
# wl1271 radio parameters
TXBiPFEMAutoDetect = 01
TXBiPFEMManufacturer = 01
RefClk = 05
SettlingTime = 05
ClockValidOnWakeup = 00
DC2DCMode = 00
Single_Dual_Band_Solution = 00
Settings = 00 00 1F 00
";

const WL128X_INI: &str = "\
TXBiPFEMAutoDetect = 01
RefClk = 05
TCXO_Clk = 05
";

struct Scratch {
    dir: TempDir,
}

impl Scratch {
    fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    fn file(&self, name: &str, contents: &str) -> String {
        let path = self.dir.path().join(name);
        std::fs::write(&path, contents).unwrap();
        path.to_string_lossy().into_owned()
    }

    fn path(&self, name: &str) -> String {
        self.dir.path().join(name).to_string_lossy().into_owned()
    }

    fn run(&self, argv: &[&str]) -> Result<String, CalError> {
        self.run_with(false, argv)
    }

    fn run_with(&self, dry_run: bool, argv: &[&str]) -> Result<String, CalError> {
        let config = Config {
            nvs_path: self.dir.path().join("current.bin"),
            new_nvs_path: self.dir.path().join("new.bin"),
            sysfs_root: self.dir.path().join("sys"),
            dry_run,
            ..Config::default()
        };
        let mut backend = ScriptedBackend::new();
        let mut modules = RecordingModules::new();
        let mut out = Vec::new();
        let mut ctx = Context::new(&mut backend, &mut modules, config, &mut out);
        dispatch(&mut ctx, argv)?;
        assert!(
            backend.requests().is_empty(),
            "file commands must not touch the driver"
        );
        Ok(String::from_utf8_lossy(&out).into_owned())
    }
}

#[test]
fn reference_nvs_variant_follows_ini() {
    let s = Scratch::new();
    let ini127 = s.file("127x.ini", WL127X_INI);
    let ini128 = s.file("128x.ini", WL128X_INI);
    let out127 = s.path("127x.bin");

    let msg = s.run(&["set", "ref_nvs", &ini127, &out127]).unwrap();
    assert!(msg.contains("Reference wl127x NVS"));
    let nvs = NvsFile::load(&out127).unwrap();
    assert_eq!(nvs.variant(), ChipVariant::Wl127x);
    assert!(nvs.mac().is_zero());

    // default output path
    s.run(&["set", "ref_nvs", &ini128]).unwrap();
    let nvs = NvsFile::load(s.path("new.bin")).unwrap();
    assert_eq!(nvs.variant(), ChipVariant::Wl128x);
    assert_eq!(nvs.as_bytes().len(), 1113);

    // explicit chip overrides detection
    let forced = s.path("forced.bin");
    s.run(&["set", "ref_nvs", &ini127, &forced, "wl1281"]).unwrap();
    let nvs = NvsFile::load(&forced).unwrap();
    assert_eq!(nvs.variant(), ChipVariant::Wl128x);

    let err = s.run(&["set", "ref_nvs", &ini127, &forced, "18xx"]).unwrap_err();
    assert_eq!(err.exit_code(), 1);
}

#[test]
fn mac_set_and_get() {
    let s = Scratch::new();
    let ini = s.file("radio.ini", WL127X_INI);
    let nvs = s.path("nvs.bin");
    s.run(&["set", "ref_nvs", &ini, &nvs]).unwrap();

    s.run(&["set", "nvs_mac", &nvs, "08:00:28:de:ad:01"]).unwrap();
    let out = s.run(&["get", "nvs_mac", &nvs]).unwrap();
    assert_eq!(out, "MAC address: 08:00:28:de:ad:01\n");

    // random address stays under the TI OUI
    s.run(&["set", "nvs_mac", &nvs]).unwrap();
    let mac = NvsFile::load(&nvs).unwrap().mac();
    assert_eq!(&mac.octets()[..3], &[0x08, 0x00, 0x28]);

    let err = s.run(&["set", "nvs_mac", &nvs, "not-a-mac"]).unwrap_err();
    assert_eq!(err.exit_code(), 1);
    match err {
        CalError::Usage { usage, .. } => assert!(usage.unwrap().contains("set nvs_mac")),
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn update_keeps_mac_and_replaces_radio_section() {
    let s = Scratch::new();
    let ini = s.file("radio.ini", WL127X_INI);
    let current = s.path("current.bin");
    s.run(&["set", "ref_nvs", &ini, &current]).unwrap();
    s.run(&["set", "nvs_mac", &current, "08:00:28:00:00:02"]).unwrap();

    let updated_ini = s.file("updated.ini", "RefClk = 03\n");
    s.run(&["set", "upd_nvs", &updated_ini]).unwrap();

    let nvs = NvsFile::load(s.path("new.bin")).unwrap();
    assert_eq!(nvs.mac().to_string(), "08:00:28:00:00:02");
    assert_eq!(nvs.ini_section()[2], 0x03);
    // TXBiPFEMAutoDetect was not in the update
    assert_eq!(nvs.ini_section()[0], 0x00);
}

#[test]
fn dump_defaults_to_current_nvs() {
    let s = Scratch::new();
    let ini = s.file("radio.ini", WL127X_INI);
    s.run(&["set", "ref_nvs", &ini, &s.path("current.bin")]).unwrap();

    let out = s.run(&["get", "dump_nvs"]).unwrap();
    assert!(out.contains("wl127x (912 bytes)"));
    assert!(out.contains("not calibrated"));
    assert!(out.contains("Settings"));
}

#[test]
fn bad_files_are_reported() {
    let s = Scratch::new();
    let truncated = s.path("short.bin");
    std::fs::write(&truncated, [0u8; 100]).unwrap();

    let err = s.run(&["get", "nvs_mac", &truncated]).unwrap_err();
    assert!(matches!(err, CalError::InvalidNvs { .. }));
    assert_eq!(err.exit_code(), 2);

    let err = s.run(&["get", "nvs_mac", &s.path("missing.bin")]).unwrap_err();
    assert!(matches!(err, CalError::FileNotFound { .. }));

    let ini = s.file("broken.ini", "RefClk 05\n");
    let err = s.run(&["set", "ref_nvs", &ini]).unwrap_err();
    assert!(matches!(err, CalError::InvalidIni { .. }));
}

#[test]
fn dry_run_writes_nothing() {
    let s = Scratch::new();
    let ini = s.file("radio.ini", WL127X_INI);
    let nvs = s.path("nvs.bin");
    s.run(&["set", "ref_nvs", &ini, &nvs]).unwrap();
    let before = std::fs::read(&nvs).unwrap();

    s.run_with(true, &["set", "nvs_mac", &nvs, "08:00:28:de:ad:01"]).unwrap();
    assert_eq!(std::fs::read(&nvs).unwrap(), before);

    s.run_with(true, &["set", "ref_nvs", &ini]).unwrap();
    assert!(!std::path::Path::new(&s.path("new.bin")).exists());
}
