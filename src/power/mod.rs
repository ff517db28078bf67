use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

pub mod monitor;

/// Immutable snapshot of the host power source, taken once per poll.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PowerState {
    pub on_ac: bool,
    pub observed_at: DateTime<Utc>,
}

/// Source of power state snapshots.
///
/// `read` must not fail: on any underlying error implementations substitute a
/// conservative default (`on_ac = false`) and log, so the poll loop stays
/// alive.
pub trait PowerReader: Send + Sync + 'static {
    fn read(&self) -> PowerState;
}

/// Primary indicator: the AC adapter online flag.
pub const AC_ONLINE_PATH: &str = "/sys/class/power_supply/AC/online";

/// Fallback indicator: the battery status text.
pub const BATTERY_STATUS_PATH: &str = "/sys/class/power_supply/BAT0/status";

/// Reads power state from `/sys/class/power_supply`.
///
/// Fallback order is fixed: AC online flag first, battery status text second,
/// `on_ac = false` if neither is accessible. Battery statuses Charging, Full
/// and "Not charging" all imply the charger is attached.
pub struct SysfsPowerReader {
    ac_online: PathBuf,
    battery_status: PathBuf,
}

impl SysfsPowerReader {
    pub fn new() -> Self {
        Self {
            ac_online: AC_ONLINE_PATH.into(),
            battery_status: BATTERY_STATUS_PATH.into(),
        }
    }

    #[cfg(test)]
    fn with_paths(ac_online: PathBuf, battery_status: PathBuf) -> Self {
        Self {
            ac_online,
            battery_status,
        }
    }
}

impl Default for SysfsPowerReader {
    fn default() -> Self {
        Self::new()
    }
}

impl PowerReader for SysfsPowerReader {
    fn read(&self) -> PowerState {
        let observed_at = Utc::now();

        match fs::read_to_string(&self.ac_online) {
            Ok(raw) => {
                return PowerState {
                    on_ac: raw.trim() == "1",
                    observed_at,
                };
            }
            Err(e) => debug!("AC indicator unreadable ({e}), trying battery status"),
        }

        match fs::read_to_string(&self.battery_status) {
            Ok(raw) => {
                let on_ac = matches!(raw.trim(), "Charging" | "Full" | "Not charging");
                return PowerState { on_ac, observed_at };
            }
            Err(e) => warn!("could not determine power state ({e}), assuming battery"),
        }

        PowerState {
            on_ac: false,
            observed_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("powerwatch-test-{name}-{}", std::process::id()));
        let _ = fs::create_dir_all(&dir);
        dir
    }

    fn reader(dir: &Path, ac: Option<&str>, battery: Option<&str>) -> SysfsPowerReader {
        let ac_path = dir.join("online");
        let battery_path = dir.join("status");
        let _ = fs::remove_file(&ac_path);
        let _ = fs::remove_file(&battery_path);
        if let Some(contents) = ac {
            fs::write(&ac_path, contents).unwrap();
        }
        if let Some(contents) = battery {
            fs::write(&battery_path, contents).unwrap();
        }
        SysfsPowerReader::with_paths(ac_path, battery_path)
    }

    #[test]
    fn ac_flag_takes_precedence() {
        let dir = scratch_dir("ac-flag");
        let r = reader(&dir, Some("1\n"), Some("Discharging\n"));
        assert!(r.read().on_ac);

        let r = reader(&dir, Some("0\n"), Some("Charging\n"));
        assert!(!r.read().on_ac);
    }

    #[test]
    fn battery_status_fallback_maps_charger_states() {
        let dir = scratch_dir("battery");
        for status in ["Charging\n", "Full\n", "Not charging\n"] {
            let r = reader(&dir, None, Some(status));
            assert!(r.read().on_ac, "{status:?} should mean AC attached");
        }
        for status in ["Discharging\n", "Unknown\n"] {
            let r = reader(&dir, None, Some(status));
            assert!(!r.read().on_ac, "{status:?} should mean battery");
        }
    }

    #[test]
    fn missing_indicators_default_to_battery() {
        let dir = scratch_dir("missing");
        let r = reader(&dir, None, None);
        let state = r.read();
        assert!(!state.on_ac);
    }
}
