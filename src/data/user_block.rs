use std::{str::FromStr, num::ParseIntError};

use chrono::{DateTime, Utc, Duration};

use super::UserID;

#[derive(Debug, Clone)]
pub struct UserBlock {
    pub user: UserID,
    pub creator: UserID,
    pub revoker: Option<UserID>,
    pub reason: String,
    pub ends_at: DateTime<Utc>,
    pub needs_view: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserBlock {
    /// A block stays in force until it has both expired and been seen by the user.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.needs_view || self.ends_at > now
    }

    /// Whole hours left until the block ends, rounded up. Zero or negative once it has ended.
    pub fn hours_remaining(&self, now: DateTime<Utc>) -> i64 {
        const HOUR: i64 = 3_600_000;
        let millis = self.ends_at.signed_duration_since(now).num_milliseconds();
        let hours = millis.div_euclid(HOUR);
        if millis.rem_euclid(HOUR) > 0 { hours + 1 } else { hours }
    }
}

/// The durations, in hours, a moderator may pick for a block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockPeriods(Vec<u32>);

impl BlockPeriods {
    pub fn new(mut hours: Vec<u32>) -> Self {
        hours.sort_unstable();
        hours.dedup();
        Self(hours)
    }

    pub fn contains(&self, hours: u32) -> bool {
        self.0.contains(&hours)
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.0.iter().copied()
    }

    /// Parses a submitted period, accepting it only if it is one of the allowed values.
    pub fn parse_allowed(&self, input: &str) -> Option<u32> {
        input.trim().parse::<u32>().ok().filter(|hours| self.contains(*hours))
    }

    pub fn duration(hours: u32) -> Duration {
        Duration::hours(i64::from(hours))
    }
}

impl Default for BlockPeriods {
    fn default() -> Self {
        Self(vec![0, 1, 3, 6, 12, 24, 48, 96])
    }
}

impl FromStr for BlockPeriods {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hours = s.split(',')
            .map(str::trim)
            .filter(|x| !x.is_empty())
            .map(str::parse::<u32>)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(hours))
    }
}
