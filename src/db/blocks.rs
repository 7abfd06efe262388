use std::{cmp::Reverse, io};

use chrono::{DateTime, Utc};

use crate::data::{UserID, UserBlock, BlockID, BlockPeriods};

use super::DB;

#[derive(thiserror::Error, Debug)]
pub enum BlockError {
    #[error("Must be a moderator to create or update a block.")]
    NonModeratorUpdate,
    #[error("Must be a moderator to revoke a block.")]
    NonModeratorRevoke,
    #[error("Only the moderator who created this block can edit it.")]
    OnlyCreatorCanEdit,
    #[error("A reason for the block must be given.")]
    BlankReason,
    #[error("The user block with ID {0} could not be found.")]
    NotFound(BlockID),
    #[error("Could not write block: {0}")]
    Store(#[from] io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockFilter {
    All,
    On(UserID),
    By(UserID),
}

impl BlockFilter {
    fn matches(&self, block: &UserBlock) -> bool {
        match self {
            BlockFilter::All => true,
            BlockFilter::On(user) => &block.user == user,
            BlockFilter::By(user) => &block.creator == user,
        }
    }
}

pub struct BlockPage<'a> {
    pub blocks: Vec<(BlockID, &'a UserBlock)>,
    /// 1-based.
    pub number: usize,
    pub total_pages: usize,
}

impl DB {
    pub fn get_block(&self, id: BlockID) -> Option<&UserBlock> {
        self.blocks.get(&id)
    }

    fn next_block_id(&self) -> BlockID {
        BlockID(self.blocks.keys().map(|x| x.0).max().unwrap_or(0) + 1)
    }

    pub fn create_block(&mut self, user: &UserID, creator: &UserID, reason: &str, period: u32, needs_view: bool, now: DateTime<Utc>) -> Result<BlockID, BlockError> {
        if !self.is_moderator(creator) {
            return Err(BlockError::NonModeratorUpdate);
        }
        let reason = checked_reason(reason)?;
        let id = self.next_block_id();
        let block = UserBlock {
            user: user.clone(),
            creator: creator.clone(),
            revoker: None,
            reason,
            ends_at: now + BlockPeriods::duration(period),
            needs_view,
            created_at: now,
            updated_at: now,
        };
        self.store.store_block(id, &block)?;
        self.blocks.insert(id, block);
        tracing::info!(block = id.0, user = %user.0, creator = %creator.0, hours = period, "created block");
        Ok(id)
    }

    pub fn update_block(&mut self, id: BlockID, editor: &UserID, reason: &str, period: u32, needs_view: bool, now: DateTime<Utc>) -> Result<(), BlockError> {
        let block = self.blocks.get(&id).ok_or(BlockError::NotFound(id))?;
        if &block.creator != editor {
            return Err(BlockError::OnlyCreatorCanEdit);
        }
        if !self.is_moderator(editor) {
            return Err(BlockError::NonModeratorUpdate);
        }
        let updated = UserBlock {
            reason: checked_reason(reason)?,
            ends_at: now + BlockPeriods::duration(period),
            needs_view,
            updated_at: now,
            ..block.clone()
        };
        self.store.store_block(id, &updated)?;
        self.blocks.insert(id, updated);
        tracing::info!(block = id.0, editor = %editor.0, hours = period, "updated block");
        Ok(())
    }

    /// Ends the block now and records who ended it.
    pub fn revoke_block(&mut self, id: BlockID, revoker: &UserID, now: DateTime<Utc>) -> Result<(), BlockError> {
        if !self.is_moderator(revoker) {
            return Err(BlockError::NonModeratorRevoke);
        }
        let block = self.blocks.get(&id).ok_or(BlockError::NotFound(id))?;
        let revoked = UserBlock {
            revoker: Some(revoker.clone()),
            ends_at: now,
            needs_view: false,
            updated_at: now,
            ..block.clone()
        };
        self.store.store_block(id, &revoked)?;
        self.blocks.insert(id, revoked);
        tracing::info!(block = id.0, revoker = %revoker.0, "revoked block");
        Ok(())
    }

    /// Marks the block as seen when `viewer` is the blocked user. Returns whether anything changed.
    pub fn acknowledge_block(&mut self, id: BlockID, viewer: &UserID) -> Result<bool, BlockError> {
        let block = self.blocks.get_mut(&id).ok_or(BlockError::NotFound(id))?;
        if &block.user != viewer || !block.needs_view {
            return Ok(false);
        }
        block.needs_view = false;
        self.store.store_block(id, block)?;
        tracing::debug!(block = id.0, user = %viewer.0, "block acknowledged");
        Ok(true)
    }

    /// The block the user still has to look at before using the site, if any.
    pub fn pending_block_view(&self, user: &UserID, now: DateTime<Utc>) -> Option<BlockID> {
        self.blocks.iter()
            .filter(|(_, b)| &b.user == user && b.needs_view && b.is_active(now))
            .max_by_key(|(id, b)| (b.ends_at, **id))
            .map(|(id, _)| *id)
    }

    pub fn count_active_blocks(&self, filter: &BlockFilter, now: DateTime<Utc>) -> usize {
        self.blocks.values()
            .filter(|b| filter.matches(b) && b.is_active(now))
            .count()
    }

    /// Blocks matching `filter`, latest ending first.
    pub fn list_blocks(&self, filter: &BlockFilter, page: usize, per_page: usize) -> BlockPage<'_> {
        let per_page = per_page.max(1);
        let mut blocks = self.blocks.iter()
            .filter(|(_, b)| filter.matches(b))
            .map(|(id, b)| (*id, b))
            .collect::<Vec<_>>();
        blocks.sort_unstable_by_key(|(id, b)| Reverse((b.ends_at, *id)));
        let total_pages = ((blocks.len() + per_page - 1) / per_page).max(1);
        let number = page.max(1);
        let blocks = blocks.into_iter()
            .skip((number - 1).saturating_mul(per_page))
            .take(per_page)
            .collect();
        BlockPage { blocks, number, total_pages }
    }
}

fn checked_reason(reason: &str) -> Result<String, BlockError> {
    let reason = reason.trim();
    if reason.is_empty() {
        Err(BlockError::BlankReason)
    } else {
        Ok(reason.to_string())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Duration};

    use crate::db::{store::Store, Permission};

    use super::*;

    fn user(name: &str) -> UserID {
        UserID(name.to_string())
    }

    fn setup() -> (tempfile::TempDir, DB, DateTime<Utc>) {
        let dir = tempfile::tempdir().unwrap();
        let mut db = DB::load(Store::new(dir.path())).unwrap();
        db.grant_permission(&user("alice"), Permission::Moderator).unwrap();
        db.grant_permission(&user("bob"), Permission::Moderator).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
        (dir, db, now)
    }

    #[test]
    fn create_sets_expiry_from_period() {
        let (_dir, mut db, now) = setup();
        let id = db.create_block(&user("spammer"), &user("alice"), "  ads  ", 24, true, now).unwrap();
        assert_eq!(id, BlockID(1));
        let block = db.get_block(id).unwrap();
        assert_eq!(block.ends_at, now + Duration::hours(24));
        assert_eq!(block.reason, "ads");
        assert_eq!(block.creator, user("alice"));
        assert!(block.needs_view);
        assert!(block.revoker.is_none());
        assert_eq!(db.create_block(&user("spammer"), &user("alice"), "again", 1, false, now).unwrap(), BlockID(2));
    }

    #[test]
    fn create_requires_moderator_and_reason() {
        let (_dir, mut db, now) = setup();
        assert!(matches!(
            db.create_block(&user("spammer"), &user("mallory"), "ads", 1, false, now),
            Err(BlockError::NonModeratorUpdate)
        ));
        assert!(matches!(
            db.create_block(&user("spammer"), &user("alice"), " \n ", 1, false, now),
            Err(BlockError::BlankReason)
        ));
        assert!(db.list_blocks(&BlockFilter::All, 1, 20).blocks.is_empty());
    }

    #[test]
    fn only_creator_may_update() {
        let (_dir, mut db, now) = setup();
        let id = db.create_block(&user("spammer"), &user("alice"), "ads", 1, false, now).unwrap();
        assert!(matches!(
            db.update_block(id, &user("bob"), "more ads", 48, false, now),
            Err(BlockError::OnlyCreatorCanEdit)
        ));

        let later = now + Duration::minutes(30);
        db.update_block(id, &user("alice"), "more ads", 48, true, later).unwrap();
        let block = db.get_block(id).unwrap();
        assert_eq!(block.reason, "more ads");
        assert_eq!(block.ends_at, later + Duration::hours(48));
        assert_eq!(block.created_at, now);
        assert_eq!(block.updated_at, later);
        assert!(block.needs_view);
    }

    #[test]
    fn revoke_ends_block_now() {
        let (_dir, mut db, now) = setup();
        let id = db.create_block(&user("spammer"), &user("alice"), "ads", 96, true, now).unwrap();
        assert!(matches!(
            db.revoke_block(id, &user("spammer"), now),
            Err(BlockError::NonModeratorRevoke)
        ));

        let later = now + Duration::hours(2);
        db.revoke_block(id, &user("bob"), later).unwrap();
        let block = db.get_block(id).unwrap();
        assert_eq!(block.ends_at, later);
        assert_eq!(block.revoker, Some(user("bob")));
        assert!(!block.needs_view);
        assert!(!block.is_active(later));
        assert!(matches!(db.revoke_block(BlockID(99), &user("bob"), later), Err(BlockError::NotFound(BlockID(99)))));
    }

    #[test]
    fn only_the_blocked_user_acknowledges() {
        let (_dir, mut db, now) = setup();
        let id = db.create_block(&user("spammer"), &user("alice"), "ads", 0, true, now).unwrap();
        assert_eq!(db.pending_block_view(&user("spammer"), now), Some(id));

        assert!(!db.acknowledge_block(id, &user("alice")).unwrap());
        assert!(db.get_block(id).unwrap().needs_view);
        assert!(db.acknowledge_block(id, &user("spammer")).unwrap());
        assert!(!db.acknowledge_block(id, &user("spammer")).unwrap());
        assert_eq!(db.pending_block_view(&user("spammer"), now), None);
        assert!(!db.get_block(id).unwrap().is_active(now));
    }

    #[test]
    fn lists_latest_ending_first_with_filters_and_pages() {
        let (_dir, mut db, now) = setup();
        let a = db.create_block(&user("spammer"), &user("alice"), "one", 1, false, now).unwrap();
        let b = db.create_block(&user("troll"), &user("bob"), "two", 96, false, now).unwrap();
        let c = db.create_block(&user("spammer"), &user("bob"), "three", 24, false, now).unwrap();

        let all = db.list_blocks(&BlockFilter::All, 1, 20);
        assert_eq!(all.blocks.iter().map(|(id, _)| *id).collect::<Vec<_>>(), vec![b, c, a]);
        assert_eq!(all.total_pages, 1);

        let on = db.list_blocks(&BlockFilter::On(user("spammer")), 1, 20);
        assert_eq!(on.blocks.iter().map(|(id, _)| *id).collect::<Vec<_>>(), vec![c, a]);
        let by = db.list_blocks(&BlockFilter::By(user("bob")), 1, 20);
        assert_eq!(by.blocks.iter().map(|(id, _)| *id).collect::<Vec<_>>(), vec![b, c]);

        let second = db.list_blocks(&BlockFilter::All, 2, 2);
        assert_eq!(second.total_pages, 2);
        assert_eq!(second.blocks.iter().map(|(id, _)| *id).collect::<Vec<_>>(), vec![a]);
        assert!(db.list_blocks(&BlockFilter::All, 5, 2).blocks.is_empty());
        assert_eq!(db.list_blocks(&BlockFilter::All, 0, 2).number, 1);

        assert_eq!(db.count_active_blocks(&BlockFilter::On(user("spammer")), now + Duration::hours(2)), 1);
    }

    #[test]
    fn blocks_reload_from_store() {
        let (dir, mut db, now) = setup();
        let id = db.create_block(&user("spammer"), &user("alice"), "ads", 12, false, now).unwrap();
        let reloaded = DB::load(Store::new(dir.path())).unwrap();
        assert_eq!(reloaded.get_block(id).unwrap().ends_at, now + Duration::hours(12));
    }
}
