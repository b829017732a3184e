use std::{fs::File, io::BufReader, path::Path};

use serde::Deserialize;

use super::errors::StatusBoardError;

/// Non-secret settings read from the YAML config file. Credentials come from
/// the environment instead.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// report heading, also used as the email subject
    #[serde(default = "default_report_title")]
    pub report_title: String,

    /// display name on outgoing mail
    #[serde(default = "default_sender_name")]
    pub sender_name: String,

    #[serde(default = "default_send_timeout_secs")]
    pub send_timeout_secs: u64,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_report_title() -> String {
    "Sites Status".to_string()
}

fn default_sender_name() -> String {
    "AutoDBData".to_string()
}

fn default_send_timeout_secs() -> u64 {
    10
}

fn default_max_connections() -> u32 {
    5
}

impl Config {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, StatusBoardError> {
        Ok(serde_yaml::from_reader(BufReader::new(File::open(path)?))?)
    }
}
