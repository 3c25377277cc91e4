//! Remote commands received over the device messaging channel.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CaptureError;

/// Message path that starts a capture session.
pub const START_SENSING_PATH: &str = "/start-sensing";

/// Message path that stops the session and sends the snapshot.
pub const STOP_SENSING_PATH: &str = "/stop-sensing";

/// A command from the paired peer.
///
/// # Example
///
/// ```
/// use sensor_capture::RemoteCommand;
///
/// let cmd: RemoteCommand = "/start-sensing".parse().unwrap();
/// assert_eq!(cmd, RemoteCommand::StartSensing);
/// assert_eq!(RemoteCommand::StopSensing.path(), "/stop-sensing");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RemoteCommand {
    /// Begin recording.
    StartSensing,
    /// End recording and hand off the snapshot.
    StopSensing,
}

impl RemoteCommand {
    /// Message path for this command.
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::StartSensing => START_SENSING_PATH,
            Self::StopSensing => STOP_SENSING_PATH,
        }
    }
}

impl fmt::Display for RemoteCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

impl FromStr for RemoteCommand {
    type Err = CaptureError;

    fn from_str(path: &str) -> Result<Self, Self::Err> {
        match path {
            START_SENSING_PATH => Ok(Self::StartSensing),
            STOP_SENSING_PATH => Ok(Self::StopSensing),
            other => Err(CaptureError::UnknownCommand(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_known_paths() {
        assert_eq!(
            START_SENSING_PATH.parse::<RemoteCommand>().ok(),
            Some(RemoteCommand::StartSensing)
        );
        assert_eq!(
            STOP_SENSING_PATH.parse::<RemoteCommand>().ok(),
            Some(RemoteCommand::StopSensing)
        );
    }

    #[test]
    fn parse_unknown_path() {
        let err = "/reboot".parse::<RemoteCommand>().unwrap_err();
        assert!(err.to_string().contains("/reboot"));
    }

    #[test]
    fn display_is_path() {
        assert_eq!(RemoteCommand::StartSensing.to_string(), "/start-sensing");
    }
}
