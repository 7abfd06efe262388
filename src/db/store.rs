use std::{collections::HashMap, fs::{read_dir, read_to_string, create_dir_all}, io::{self, ErrorKind}, path::{Path, PathBuf}};

use chrono::{DateTime, Utc};
use json::{JsonValue, object};

use crate::{data::{User, UserID, UserBlock, BlockID}, auth::PasswordStore};

use super::Permission;

const USERS_PATH: &str = "users";
const AUTH_PATH: &str = "auth";
const BLOCKS_PATH: &str = "blocks";
const MOD_PATH: &str = "mod";
const PERMISSIONS_FILE: &str = "permissions.json";

/// One JSON file per record below `root`.
pub struct Store {
    root: PathBuf,
}

impl Store {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn dir(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    fn file(&self, dir: &str, name: &str) -> PathBuf {
        self.dir(dir).join(format!("{name}.json"))
    }

    fn write(&self, dir: &str, name: &str, json: JsonValue) -> io::Result<()> {
        create_dir_all(self.dir(dir))?;
        std::fs::write(self.file(dir, name), json.to_string())
    }

    fn load_records<K, V, F>(&self, dir: &str, parse: F) -> io::Result<HashMap<K, V>>
        where K: std::hash::Hash + Eq, F: Fn(&str, &JsonValue) -> Option<(K, V)> {
        let entries = match read_dir(self.dir(dir)) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(HashMap::new()),
            Err(e) => return Err(e),
        };
        let mut records = HashMap::new();
        for entry in entries {
            let path = entry?.path();
            let Some(name) = record_name(&path) else {
                continue;
            };
            let parsed = json::parse(&read_to_string(&path)?).ok()
                .and_then(|json| parse(name, &json));
            match parsed {
                Some((key, value)) => { records.insert(key, value); },
                None => tracing::warn!(path = %path.display(), "skipping malformed record"),
            }
        }
        Ok(records)
    }

    pub fn load_users(&self) -> io::Result<HashMap<UserID, User>> {
        self.load_records(USERS_PATH, |name, json| {
            let created = parse_time(&json["created"])?;
            Some((UserID(name.to_string()), User { created }))
        })
    }

    pub fn load_blocks(&self) -> io::Result<HashMap<BlockID, UserBlock>> {
        self.load_records(BLOCKS_PATH, |name, json| {
            let id = BlockID(name.parse().ok()?);
            let block = UserBlock {
                user: UserID(json["user"].as_str()?.to_string()),
                creator: UserID(json["creator"].as_str()?.to_string()),
                revoker: json["revoker"].as_str().map(|x| UserID(x.to_string())),
                reason: json["reason"].as_str()?.to_string(),
                ends_at: parse_time(&json["ends-at"])?,
                needs_view: json["needs-view"].as_bool().unwrap_or(false),
                created_at: parse_time(&json["created-at"])?,
                updated_at: parse_time(&json["updated-at"])?,
            };
            Some((id, block))
        })
    }

    pub fn load_permissions(&self) -> io::Result<HashMap<UserID, Vec<Permission>>> {
        let text = match read_to_string(self.dir(MOD_PATH).join(PERMISSIONS_FILE)) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(HashMap::new()),
            Err(e) => return Err(e),
        };
        match json::parse(&text) {
            Ok(JsonValue::Object(json)) => Ok(json.iter().map(|(user, permissions)| {
                let permissions = permissions.members()
                    .filter_map(|x| x.as_str().and_then(Permission::from_code))
                    .collect();
                (UserID(user.to_string()), permissions)
            }).collect()),
            _ => {
                tracing::warn!("permissions file is malformed, starting without roles");
                Ok(HashMap::new())
            },
        }
    }

    pub fn store_user(&self, id: &UserID, user: &User) -> io::Result<()> {
        self.write(USERS_PATH, &id.0, object! {
            created: user.created.to_rfc3339(),
        })
    }

    pub fn store_block(&self, id: BlockID, block: &UserBlock) -> io::Result<()> {
        self.write(BLOCKS_PATH, &id.0.to_string(), object! {
            user: block.user.0.as_str(),
            creator: block.creator.0.as_str(),
            revoker: block.revoker.as_ref().map(|x| x.0.as_str()),
            reason: block.reason.as_str(),
            "ends-at": block.ends_at.to_rfc3339(),
            "needs-view": block.needs_view,
            "created-at": block.created_at.to_rfc3339(),
            "updated-at": block.updated_at.to_rfc3339(),
        })
    }

    pub fn store_permissions(&self, permissions: &HashMap<UserID, Vec<Permission>>) -> io::Result<()> {
        let mut obj = JsonValue::new_object();
        for (user, permissions) in permissions {
            obj[user.0.as_str()] = JsonValue::Array(permissions.iter()
                .map(|permission| JsonValue::from(permission.code()))
                .collect());
        }
        create_dir_all(self.dir(MOD_PATH))?;
        std::fs::write(self.dir(MOD_PATH).join(PERMISSIONS_FILE), obj.to_string())
    }

    pub fn store_user_auth(&self, id: &UserID, password_store: &PasswordStore) -> io::Result<()> {
        self.write(AUTH_PATH, &id.0, object! {
            salt: password_store.salt.as_str(),
            hashed: password_store.hashed.as_str(),
        })
    }

    pub fn load_user_auth(&self, id: &UserID) -> io::Result<Option<PasswordStore>> {
        let text = match read_to_string(self.file(AUTH_PATH, &id.0)) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };
        let json = json::parse(&text).map_err(|e| io::Error::new(ErrorKind::InvalidData, e))?;
        match (json["salt"].as_str(), json["hashed"].as_str()) {
            (Some(salt), Some(hashed)) => Ok(Some(PasswordStore {
                salt: salt.to_string(),
                hashed: hashed.to_string(),
            })),
            _ => Err(io::Error::new(ErrorKind::InvalidData, "credentials record lacks salt or hash")),
        }
    }
}

fn record_name(path: &Path) -> Option<&str> {
    if path.extension().and_then(|x| x.to_str()) != Some("json") {
        return None;
    }
    path.file_stem().and_then(|x| x.to_str())
}

fn parse_time(json: &JsonValue) -> Option<DateTime<Utc>> {
    json.as_str().and_then(|x| x.parse::<DateTime<Utc>>().ok())
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Duration};

    use super::*;

    #[test]
    fn blocks_survive_a_reload() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path());
        let created = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let block = UserBlock {
            user: UserID("spammer".to_string()),
            creator: UserID("alice".to_string()),
            revoker: Some(UserID("bob".to_string())),
            reason: "Posting \"ads\"\non every thread".to_string(),
            ends_at: created + Duration::hours(24),
            needs_view: true,
            created_at: created,
            updated_at: created,
        };
        store.store_block(BlockID(7), &block).unwrap();

        let blocks = store.load_blocks().unwrap();
        let loaded = &blocks[&BlockID(7)];
        assert_eq!(loaded.user, block.user);
        assert_eq!(loaded.creator, block.creator);
        assert_eq!(loaded.revoker, block.revoker);
        assert_eq!(loaded.reason, block.reason);
        assert_eq!(loaded.ends_at, block.ends_at);
        assert!(loaded.needs_view);
    }

    #[test]
    fn missing_directories_load_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path().join("nothing-here"));
        assert!(store.load_users().unwrap().is_empty());
        assert!(store.load_blocks().unwrap().is_empty());
        assert!(store.load_permissions().unwrap().is_empty());
        assert!(store.load_user_auth(&UserID("nobody".to_string())).unwrap().is_none());
    }

    #[test]
    fn malformed_records_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path());
        create_dir_all(dir.path().join(BLOCKS_PATH)).unwrap();
        std::fs::write(dir.path().join(BLOCKS_PATH).join("3.json"), "{ not json").unwrap();
        std::fs::write(dir.path().join(BLOCKS_PATH).join("notes.txt"), "ignored").unwrap();
        assert!(store.load_blocks().unwrap().is_empty());
    }

    #[test]
    fn permissions_round_trip_through_codes() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path());
        let permissions = HashMap::from([
            (UserID("alice".to_string()), vec![Permission::Moderator]),
            (UserID("root".to_string()), vec![Permission::Administrator]),
        ]);
        store.store_permissions(&permissions).unwrap();
        assert_eq!(store.load_permissions().unwrap(), permissions);
    }
}
