use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
pub struct User {
    pub created: DateTime<Utc>,
}

impl Default for User {
    fn default() -> Self {
        Self {
            created: Utc::now(),
        }
    }
}
