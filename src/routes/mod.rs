use actix_web::{web::ServiceConfig, HttpResponse, http::{StatusCode, header::LOCATION}};

use crate::{auth::UserSession, flash::Flash};

mod auth;
mod blocks;
mod page;
mod resources;
mod roles;

pub use auth::*;
pub use blocks::*;
pub use page::*;
pub use resources::*;
pub use roles::*;

pub fn configure(cfg: &mut ServiceConfig) {
    cfg
        .service(auth_signup)
        .service(auth_login)
        .service(auth_logout)

        .service(page_home)
        .service(page_login)
        .service(page_signup)
        .service(page_user)

        .service(blocks_index)
        .service(block_new)
        .service(block_create)
        .service(block_show)
        .service(block_update)
        .service(block_edit)
        .service(block_revoke_confirm)
        .service(block_revoke)
        .service(blocks_on)
        .service(blocks_by)

        .service(change_moderator_role)

        .service(stylesheet);
}

fn redirect(to: String, flash: Option<Flash>, session: &UserSession) -> HttpResponse {
    let location = flash.map_or_else(|| to.clone(), |f| f.append_to(&to));
    session.keep(HttpResponse::build(StatusCode::SEE_OTHER)
        .append_header((LOCATION, location)))
        .finish()
}

#[cfg(test)]
pub(crate) mod testing {
    use std::{collections::HashMap, sync::Mutex};

    use actix_web::{cookie::Cookie, dev::ServiceResponse, http::header::LOCATION, web::Data};
    use chrono::Duration;
    use envconfig::Envconfig;

    use crate::{auth::{Auth, SESSION_COOKIE}, config::Config, db::{DB, Permission, store::Store}, data::UserID};

    pub struct TestState {
        pub dir: tempfile::TempDir,
        pub db: Data<Mutex<DB>>,
        pub auth: Data<Mutex<Auth>>,
        pub config: Data<Config>,
    }

    impl TestState {
        pub fn new(env: &[(&str, &str)]) -> Self {
            let dir = tempfile::tempdir().unwrap();
            let db = DB::load(Store::new(dir.path())).unwrap();
            let env = env.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect::<HashMap<_, _>>();
            Self {
                dir,
                db: Data::new(Mutex::new(db)),
                auth: Data::new(Mutex::new(Auth::init(Duration::hours(1)))),
                config: Data::new(Config::init_from_hashmap(&env).unwrap()),
            }
        }

        pub fn signup(&self, name: &str, permission: Option<Permission>) -> UserID {
            let mut db = self.db.lock().unwrap();
            let id = self.auth.lock().unwrap().signup(name, "password", &mut db).unwrap();
            if let Some(permission) = permission {
                db.grant_permission(&id, permission).unwrap();
            }
            id
        }

        pub fn cookie(&self, name: &str) -> Cookie<'static> {
            let db = self.db.lock().unwrap();
            let (_, session) = self.auth.lock().unwrap().login(name, "password", &db).unwrap();
            Cookie::new(SESSION_COOKIE, session.0)
        }
    }

    pub fn location(resp: &ServiceResponse) -> String {
        resp.headers().get(LOCATION)
            .and_then(|x| x.to_str().ok())
            .unwrap_or_default()
            .to_string()
    }

    macro_rules! test_app {
        ($state:expr) => {
            actix_web::test::init_service(actix_web::App::new()
                .app_data($state.db.clone())
                .app_data($state.auth.clone())
                .app_data($state.config.clone())
                .configure(crate::routes::configure)
            ).await
        };
    }

    pub(crate) use test_app;
}
