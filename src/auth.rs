use std::{collections::HashMap, sync::{Mutex, OnceLock}, future::{Ready, ready}, io};

use actix_web::{cookie, FromRequest, HttpRequest, HttpResponse, dev::Payload, ResponseError, http::{StatusCode, header::LOCATION}, HttpResponseBuilder, cookie::{Cookie, SameSite}, web::Data};
use chrono::{DateTime, Utc, Duration};
use regex::Regex;
use sha2::{Sha256, Digest};
use rand::distributions::{Alphanumeric, DistString};

use crate::{db::DB, data::UserID};

pub const SESSION_COOKIE: &str = "session-id";

pub struct Auth {
    sessions: HashMap<SessionID, (UserID, DateTime<Utc>)>,
    max_age: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionID(pub String);

pub struct PasswordStore {
    pub salt: String,
    pub hashed: String,
}

#[derive(thiserror::Error, Debug)]
pub enum LoginError {
    #[error("Wrong credentials")]
    WrongCredentials,
    #[error("Invalid user name. Only alphanumeric characters, '_' & '-' are allowed")]
    InvalidUserName,
    #[error("Could not read credentials: {0}")]
    Store(#[from] io::Error),
}

#[derive(thiserror::Error, Debug)]
pub enum SignupError {
    #[error("User with such name already exists")]
    AlreadyExists,
    #[error("Invalid user name. Only alphanumeric characters, '_' & '-' are allowed")]
    InvalidUserName,
    #[error("Password must not be empty")]
    EmptyPassword,
    #[error("Could not store the new user: {0}")]
    Store(#[from] io::Error),
}

pub fn is_valid_user_name(user_name: &str) -> bool {
    static USER_NAME: OnceLock<Regex> = OnceLock::new();
    USER_NAME.get_or_init(|| Regex::new("^[a-zA-Z0-9_-]+$").expect("user name pattern is valid"))
        .is_match(user_name)
}

fn hash_password(password: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    hasher.update(salt.as_bytes());
    hasher.finalize().iter().map(|b| format!("{b:02x}")).collect()
}

impl Auth {
    pub fn init(max_age: Duration) -> Self {
        Self {
            sessions: HashMap::new(),
            max_age,
        }
    }

    fn secure_password(password: &str) -> PasswordStore {
        let salt = Alphanumeric.sample_string(&mut rand::thread_rng(), 16);
        let hashed = hash_password(password, &salt);
        PasswordStore { salt, hashed }
    }

    fn match_password(db: &DB, user: &UserID, password: &str) -> io::Result<bool> {
        Ok(db.store().load_user_auth(user)?
            .map_or(false, |store| hash_password(password, &store.salt) == store.hashed))
    }

    fn gen_session_id(&self) -> SessionID {
        loop {
            let id = SessionID(Alphanumeric.sample_string(&mut rand::thread_rng(), 128));
            if !self.sessions.contains_key(&id) {
                return id;
            }
        }
    }

    fn create_session(&mut self, user: UserID, now: DateTime<Utc>) -> SessionID {
        self.delete_expired_sessions(now);
        let session_id = self.gen_session_id();
        self.sessions.insert(session_id.clone(), (user, now));
        session_id
    }

    pub fn signup(&mut self, user_name: &str, password: &str, db: &mut DB) -> Result<UserID, SignupError> {
        if !is_valid_user_name(user_name) {
            Err(SignupError::InvalidUserName)
        } else if password.is_empty() {
            Err(SignupError::EmptyPassword)
        } else if db.user_exists(&UserID(user_name.to_string())) {
            Err(SignupError::AlreadyExists)
        } else {
            let password_store = Self::secure_password(password);
            Ok(db.create_new_user(user_name, &password_store)?)
        }
    }

    pub fn login(&mut self, user_name: &str, password: &str, db: &DB) -> Result<(UserID, SessionID), LoginError> {
        if !is_valid_user_name(user_name) {
            return Err(LoginError::InvalidUserName);
        }
        let id = UserID(user_name.to_string());
        if !db.user_exists(&id) || !Self::match_password(db, &id, password)? {
            tracing::info!(user = user_name, "failed login");
            return Err(LoginError::WrongCredentials);
        }
        let session_id = self.create_session(id.clone(), Utc::now());
        Ok((id, session_id))
    }

    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    pub fn logout(&mut self, user: &UserSession) {
        self.sessions.remove(&user.session_id);
    }

    /// Resolves a session and slides its expiry forward.
    pub fn get_user_for_session_id(&mut self, session_id: &SessionID, now: DateTime<Utc>) -> Option<UserID> {
        let max_age = self.max_age;
        match self.sessions.get_mut(session_id) {
            Some((user, last_use)) if now.signed_duration_since(*last_use) <= max_age => {
                *last_use = now;
                Some(user.clone())
            },
            Some(_) => {
                self.sessions.remove(session_id);
                None
            },
            None => None,
        }
    }

    pub fn delete_expired_sessions(&mut self, now: DateTime<Utc>) {
        let max_age = self.max_age;
        self.sessions.retain(|_, (_, last_use)| now.signed_duration_since(*last_use) <= max_age)
    }
}

pub struct UserSession {
    pub user: UserID,
    pub session_id: SessionID,
    max_age: Duration,
}

impl UserSession {
    pub fn keep<'a>(&self, response: &'a mut HttpResponseBuilder) -> &'a mut HttpResponseBuilder {
        response.cookie(build_session_cookie(&self.session_id, self.max_age))
    }
}

/// The cookie lives as long as an idle session does on the server.
pub fn build_session_cookie(session_id: &SessionID, max_age: Duration) -> Cookie<'_> {
    Cookie::build(SESSION_COOKIE, session_id.0.as_str())
        .path("/")
        //.secure(true) <-- only works with https
        .same_site(SameSite::Strict)
        .http_only(true)
        .max_age(cookie::time::Duration::seconds(max_age.num_seconds()))
        .finish()
}

#[derive(thiserror::Error, Debug)]
pub enum SessionRequestError {
    #[error("No Session")]
    NoSession,
}

impl ResponseError for SessionRequestError {
    fn status_code(&self) -> StatusCode {
        StatusCode::SEE_OTHER
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .append_header((LOCATION, "/login"))
            .finish()
    }
}

impl FromRequest for UserSession {
    type Error = SessionRequestError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let session = req.cookie(SESSION_COOKIE)
            .map(|c| SessionID(c.value().to_string()))
            .and_then(|session_id| {
                let auth = req.app_data::<Data<Mutex<Auth>>>()?;
                let mut auth = auth.lock().ok()?;
                let max_age = auth.max_age();
                auth.get_user_for_session_id(&session_id, Utc::now())
                    .map(|user| UserSession { user, session_id, max_age })
            });
        ready(session.ok_or(SessionRequestError::NoSession))
    }
}
