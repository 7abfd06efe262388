use std::io;

use crate::{data::UserID, db::Permission};

use super::DB;

impl DB {
    pub fn is_admin(&self, user: &UserID) -> bool {
        self.has_permission(user, |x| matches!(x, Permission::Administrator))
    }

    /// Administrators can do everything a moderator can.
    pub fn is_moderator(&self, user: &UserID) -> bool {
        self.has_permission(user, |_| true)
    }

    pub fn permissions_of(&self, user: &UserID) -> &[Permission] {
        self.permissions.get(user).map(Vec::as_slice).unwrap_or(&[])
    }

    fn has_permission<F>(&self, user: &UserID, check: F) -> bool where F: Fn(&Permission) -> bool {
        self.permissions_of(user).iter().any(check)
    }

    pub fn grant_permission(&mut self, user: &UserID, permission: Permission) -> io::Result<bool> {
        let permissions = self.permissions.entry(user.clone()).or_default();
        if permissions.contains(&permission) {
            return Ok(false);
        }
        permissions.push(permission);
        self.store.store_permissions(&self.permissions)?;
        tracing::info!(user = %user.0, permission = permission.code(), "granted permission");
        Ok(true)
    }

    pub fn revoke_permission(&mut self, user: &UserID, permission: Permission) -> io::Result<bool> {
        let Some(permissions) = self.permissions.get_mut(user) else {
            return Ok(false);
        };
        let Some(p) = permissions.iter().position(|p| p == &permission) else {
            return Ok(false);
        };
        permissions.remove(p);
        if permissions.is_empty() {
            self.permissions.remove(user);
        }
        self.store.store_permissions(&self.permissions)?;
        tracing::info!(user = %user.0, permission = permission.code(), "revoked permission");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use crate::db::{DB, store::Store};

    use super::*;

    #[test]
    fn roles_persist_and_administrators_moderate() {
        let dir = tempfile::tempdir().unwrap();
        let mut db = DB::load(Store::new(dir.path())).unwrap();
        let alice = UserID("alice".to_string());
        let root = UserID("root".to_string());

        assert!(!db.is_moderator(&alice));
        assert!(db.grant_permission(&alice, Permission::Moderator).unwrap());
        assert!(!db.grant_permission(&alice, Permission::Moderator).unwrap());
        assert!(db.grant_permission(&root, Permission::Administrator).unwrap());
        assert!(db.is_moderator(&alice));
        assert!(!db.is_admin(&alice));
        assert!(db.is_moderator(&root));

        let reloaded = DB::load(Store::new(dir.path())).unwrap();
        assert!(reloaded.is_moderator(&alice));
        assert!(reloaded.is_admin(&root));

        assert!(db.revoke_permission(&alice, Permission::Moderator).unwrap());
        assert!(!db.revoke_permission(&alice, Permission::Moderator).unwrap());
        assert!(!db.is_moderator(&alice));
        assert!(db.permissions_of(&alice).is_empty());
    }
}
