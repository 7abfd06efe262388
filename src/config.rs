use std::{str::FromStr, path::PathBuf};

use chrono::Duration;
use envconfig::Envconfig;

use crate::data::BlockPeriods;

#[derive(Envconfig)]
pub struct Config {
    #[envconfig(from = "BIND_HOST", default = "0.0.0.0")]
    pub host: String,

    #[envconfig(from = "BIND_PORT", default = "8080")]
    pub port: u16,

    #[envconfig(from = "STORE_PATH", default = "store")]
    pub store_path: PathBuf,

    #[envconfig(from = "ASSETS_PATH", default = "assets")]
    pub assets_path: PathBuf,

    #[envconfig(from = "DATABASE_STATUS", default = "online")]
    pub database_status: DatabaseStatus,

    #[envconfig(from = "USER_BLOCK_PERIODS", default = "0,1,3,6,12,24,48,96")]
    pub block_periods: BlockPeriods,

    #[envconfig(from = "BLOCKS_PER_PAGE", default = "20")]
    pub blocks_per_page: usize,

    #[envconfig(from = "SESSION_MAX_AGE_HOURS", default = "720")]
    pub session_max_age_hours: i64,
}

impl Config {
    pub fn bind(&self) -> (&str, u16) {
        (self.host.as_str(), self.port)
    }

    pub fn session_max_age(&self) -> Duration {
        Duration::hours(self.session_max_age_hours)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseStatus {
    Online,
    Readonly,
    Offline,
}

#[derive(thiserror::Error, Debug)]
#[error("Unknown database status '{0}', expected online, readonly or offline")]
pub struct UnknownDatabaseStatus(String);

impl FromStr for DatabaseStatus {
    type Err = UnknownDatabaseStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "online" => Ok(Self::Online),
            "readonly" => Ok(Self::Readonly),
            "offline" => Ok(Self::Offline),
            _ => Err(UnknownDatabaseStatus(s.to_string())),
        }
    }
}
