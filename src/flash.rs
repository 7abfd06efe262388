use std::io;

use serde::Deserialize;

use crate::{auth::{LoginError, SignupError}, db::BlockError};

/// One-shot messages carried across a redirect in the query string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flash {
    NotAModerator,
    NotAnAdministrator,
    BlockPeriod,
    BlockExpired,
    OnlyCreatorCanEdit,
    BlankReason,
    NonModeratorUpdate,
    NonModeratorRevoke,
    WrongCredentials,
    InvalidUserName,
    AlreadyExists,
    EmptyPassword,

    BlockCreated,
    BlockUpdated,
    BlockRevoked,
    ModeratorGranted,
    ModeratorRevoked,
}

const ALL: [Flash; 17] = [
    Flash::NotAModerator,
    Flash::NotAnAdministrator,
    Flash::BlockPeriod,
    Flash::BlockExpired,
    Flash::OnlyCreatorCanEdit,
    Flash::BlankReason,
    Flash::NonModeratorUpdate,
    Flash::NonModeratorRevoke,
    Flash::WrongCredentials,
    Flash::InvalidUserName,
    Flash::AlreadyExists,
    Flash::EmptyPassword,
    Flash::BlockCreated,
    Flash::BlockUpdated,
    Flash::BlockRevoked,
    Flash::ModeratorGranted,
    Flash::ModeratorRevoked,
];

impl Flash {
    pub fn code(&self) -> &'static str {
        match self {
            Flash::NotAModerator => "not_a_moderator",
            Flash::NotAnAdministrator => "not_an_administrator",
            Flash::BlockPeriod => "block_period",
            Flash::BlockExpired => "block_expired",
            Flash::OnlyCreatorCanEdit => "only_creator_can_edit",
            Flash::BlankReason => "blank_reason",
            Flash::NonModeratorUpdate => "non_moderator_update",
            Flash::NonModeratorRevoke => "non_moderator_revoke",
            Flash::WrongCredentials => "wrong_credentials",
            Flash::InvalidUserName => "invalid_user_name",
            Flash::AlreadyExists => "already_exists",
            Flash::EmptyPassword => "empty_password",
            Flash::BlockCreated => "block_created",
            Flash::BlockUpdated => "block_updated",
            Flash::BlockRevoked => "block_revoked",
            Flash::ModeratorGranted => "moderator_granted",
            Flash::ModeratorRevoked => "moderator_revoked",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        ALL.into_iter().find(|x| x.code() == code)
    }

    /// `{name}` is filled in by the page showing the message.
    pub fn message(&self) -> &'static str {
        match self {
            Flash::NotAModerator => "You need to be a moderator to perform that action.",
            Flash::NotAnAdministrator => "You need to be an administrator to perform that action.",
            Flash::BlockPeriod => "The block period must be one of the values selectable in the drop-down list.",
            Flash::BlockExpired => "This block has expired and so cannot be edited.",
            Flash::OnlyCreatorCanEdit => "Only the moderator who created this block can edit it.",
            Flash::BlankReason => "A reason for the block must be given.",
            Flash::NonModeratorUpdate => "Must be a moderator to create or update a block.",
            Flash::NonModeratorRevoke => "Must be a moderator to revoke a block.",
            Flash::WrongCredentials => "Wrong credentials",
            Flash::InvalidUserName => "Invalid user name. Only alphanumeric characters, '_' & '-' are allowed",
            Flash::AlreadyExists => "User with such name already exists",
            Flash::EmptyPassword => "Password must not be empty",
            Flash::BlockCreated => "Created a block on user {name}.",
            Flash::BlockUpdated => "Block updated.",
            Flash::BlockRevoked => "This block has been revoked.",
            Flash::ModeratorGranted => "{name} is now a moderator.",
            Flash::ModeratorRevoked => "{name} is no longer a moderator.",
        }
    }

    pub fn is_error(&self) -> bool {
        !matches!(self, Flash::BlockCreated | Flash::BlockUpdated | Flash::BlockRevoked
            | Flash::ModeratorGranted | Flash::ModeratorRevoked)
    }

    pub fn query(&self) -> String {
        let kind = if self.is_error() { "error" } else { "notice" };
        format!("{kind}={}", self.code())
    }

    pub fn append_to(&self, url: &str) -> String {
        let separator = if url.contains('?') { '&' } else { '?' };
        format!("{url}{separator}{}", self.query())
    }

    pub fn from_block_error(e: &BlockError) -> Option<Self> {
        match e {
            BlockError::NonModeratorUpdate => Some(Flash::NonModeratorUpdate),
            BlockError::NonModeratorRevoke => Some(Flash::NonModeratorRevoke),
            BlockError::OnlyCreatorCanEdit => Some(Flash::OnlyCreatorCanEdit),
            BlockError::BlankReason => Some(Flash::BlankReason),
            BlockError::NotFound(_) | BlockError::Store(_) => None,
        }
    }

    /// Credential problems become a message; storage failures are passed on.
    pub fn from_login_error(e: LoginError) -> Result<Self, io::Error> {
        match e {
            LoginError::WrongCredentials => Ok(Flash::WrongCredentials),
            LoginError::InvalidUserName => Ok(Flash::InvalidUserName),
            LoginError::Store(e) => Err(e),
        }
    }

    pub fn from_signup_error(e: SignupError) -> Result<Self, io::Error> {
        match e {
            SignupError::AlreadyExists => Ok(Flash::AlreadyExists),
            SignupError::InvalidUserName => Ok(Flash::InvalidUserName),
            SignupError::EmptyPassword => Ok(Flash::EmptyPassword),
            SignupError::Store(e) => Err(e),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct FlashQuery {
    error: Option<String>,
    notice: Option<String>,
}

impl FlashQuery {
    pub fn flash(&self) -> Option<Flash> {
        self.error.as_deref()
            .and_then(Flash::from_code)
            .filter(Flash::is_error)
            .or_else(|| self.notice.as_deref()
                .and_then(Flash::from_code)
                .filter(|x| !x.is_error()))
    }
}
