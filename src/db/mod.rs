use std::{collections::HashMap, io};

use crate::{data::{User, UserID, UserBlock, BlockID}, auth::PasswordStore};

use self::store::Store;

pub mod blocks;
pub mod permissions;
pub mod store;

pub use blocks::{BlockError, BlockFilter, BlockPage};

pub struct DB {
    store: Store,
    users: HashMap<UserID, User>,
    blocks: HashMap<BlockID, UserBlock>,

    permissions: HashMap<UserID, Vec<Permission>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Administrator,
    Moderator,
}

impl Permission {
    pub fn code(&self) -> &'static str {
        match self {
            Permission::Administrator => "administrator",
            Permission::Moderator => "moderator",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "administrator" => Some(Permission::Administrator),
            "moderator" => Some(Permission::Moderator),
            _ => None,
        }
    }
}

impl DB {
    pub fn load(store: Store) -> io::Result<Self> {
        let users = store.load_users()?;
        let blocks = store.load_blocks()?;
        let permissions = store.load_permissions()?;
        tracing::info!(users = users.len(), blocks = blocks.len(), "loaded store");
        Ok(Self { store, users, blocks, permissions })
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn get_user(&self, name: &UserID) -> Option<&User> {
        self.users.get(name)
    }

    pub fn user_exists(&self, name: &UserID) -> bool {
        self.users.contains_key(name)
    }

    pub fn create_new_user(&mut self, name: &str, password_store: &PasswordStore) -> io::Result<UserID> {
        let id = UserID(name.to_string());
        let user = User::default();
        self.store.store_user_auth(&id, password_store)?;
        self.store.store_user(&id, &user)?;
        self.users.insert(id.clone(), user);
        tracing::info!(user = %id.0, "created user");
        Ok(id)
    }
}
