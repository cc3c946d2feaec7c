//! The engine's run mode, applied uniformly to every subvolume in a run.

use std::fmt;
use std::str::FromStr;

use anyhow::{bail, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    Reset,
    SnapshotOnly,
    RestorePrevious,
    RestorePenultimate,
    Disabled,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Reset => "reset",
            Mode::SnapshotOnly => "snapshot-only",
            Mode::RestorePrevious => "restore-previous",
            Mode::RestorePenultimate => "restore-penultimate",
            Mode::Disabled => "disabled",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s {
            "reset" => Mode::Reset,
            "snapshot-only" => Mode::SnapshotOnly,
            "restore-previous" => Mode::RestorePrevious,
            "restore-penultimate" => Mode::RestorePenultimate,
            "disabled" => Mode::Disabled,
            other => bail!(
                "unknown mode '{other}': expected one of reset, snapshot-only, \
                 restore-previous, restore-penultimate, disabled"
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_known_mode() {
        for (text, expected) in [
            ("reset", Mode::Reset),
            ("snapshot-only", Mode::SnapshotOnly),
            ("restore-previous", Mode::RestorePrevious),
            ("restore-penultimate", Mode::RestorePenultimate),
            ("disabled", Mode::Disabled),
        ] {
            assert_eq!(text.parse::<Mode>().unwrap(), expected);
        }
    }

    #[test]
    fn rejects_unknown_mode() {
        let err = "wipe-everything".parse::<Mode>().unwrap_err();
        assert!(err.to_string().contains("unknown mode"));
    }

    #[test]
    fn display_round_trips() {
        for mode in [
            Mode::Reset,
            Mode::SnapshotOnly,
            Mode::RestorePrevious,
            Mode::RestorePenultimate,
            Mode::Disabled,
        ] {
            assert_eq!(mode.to_string().parse::<Mode>().unwrap(), mode);
        }
    }
}
