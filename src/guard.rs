//! Checks run at the top of handlers before any state is read or written.

use chrono::{DateTime, Utc};

use crate::{config::{Config, DatabaseStatus}, db::DB, data::{UserID, UserBlock, BlockID, BlockPeriods}, error::AppError, flash::Flash, auth::UserSession};

pub fn check_database_readable(config: &Config) -> Result<(), AppError> {
    match config.database_status {
        DatabaseStatus::Offline => Err(AppError::DatabaseOffline),
        _ => Ok(()),
    }
}

pub fn check_database_writable(config: &Config) -> Result<(), AppError> {
    match config.database_status {
        DatabaseStatus::Online => Ok(()),
        DatabaseStatus::Readonly => Err(AppError::DatabaseReadonly),
        DatabaseStatus::Offline => Err(AppError::DatabaseOffline),
    }
}

/// Anonymous visitors are sent to log in. Runs after the database status check.
pub fn require_user(user: Option<UserSession>) -> Result<UserSession, AppError> {
    user.ok_or_else(|| AppError::Redirect { to: "/login".to_string(), flash: None })
}

/// Sends non-moderators back to the block list.
pub fn require_moderator(db: &DB, user: &UserID) -> Result<(), AppError> {
    if db.is_moderator(user) {
        Ok(())
    } else {
        Err(AppError::redirect("/user_blocks", Flash::NotAModerator))
    }
}

pub fn require_administrator(db: &DB, user: &UserID, back: &str) -> Result<(), AppError> {
    if db.is_admin(user) {
        Ok(())
    } else {
        Err(AppError::redirect(back, Flash::NotAnAdministrator))
    }
}

pub fn lookup_this_user(db: &DB, display_name: &str) -> Result<UserID, AppError> {
    let id = UserID(display_name.to_string());
    if db.user_exists(&id) {
        Ok(id)
    } else {
        Err(AppError::UserNotFound(display_name.to_string()))
    }
}

/// Block ids in paths are plain integers; anything else cannot name a block.
pub fn parse_block_id(raw: &str) -> Result<BlockID, AppError> {
    raw.parse::<u64>()
        .map(BlockID)
        .map_err(|_| AppError::NotFound)
}

pub fn lookup_user_block(db: &DB, id: BlockID) -> Result<&UserBlock, AppError> {
    db.get_block(id).ok_or(AppError::BlockNotFound(id))
}

/// Validates a submitted block period; when editing, the block must still be in force.
pub fn require_valid_params(periods: &BlockPeriods, period: &str, editing: Option<&UserBlock>, now: DateTime<Utc>) -> Result<u32, Flash> {
    let Some(period) = periods.parse_allowed(period) else {
        return Err(Flash::BlockPeriod);
    };
    match editing {
        Some(block) if !block.is_active(now) => Err(Flash::BlockExpired),
        _ => Ok(period),
    }
}

/// A user with an unseen block is sent to it before anything else.
pub fn require_block_seen(db: &DB, user: Option<&UserSession>, now: DateTime<Utc>) -> Result<(), AppError> {
    send_to_pending_block(db, user, now, None)
}

/// Like `require_block_seen`, but lets the user through to the block they still have to see.
pub fn require_block_seen_unless_viewing(db: &DB, user: Option<&UserSession>, viewing: BlockID, now: DateTime<Utc>) -> Result<(), AppError> {
    send_to_pending_block(db, user, now, Some(viewing))
}

fn send_to_pending_block(db: &DB, user: Option<&UserSession>, now: DateTime<Utc>, viewing: Option<BlockID>) -> Result<(), AppError> {
    let pending = user.and_then(|x| db.pending_block_view(&x.user, now));
    match pending {
        Some(id) if Some(id) != viewing => Err(AppError::Redirect { to: format!("/user_blocks/{id}"), flash: None }),
        _ => Ok(()),
    }
}
