use std::sync::Mutex;

use chrono::Duration;

use crate::{auth::{Auth, UserSession, SessionID, build_session_cookie, SESSION_COOKIE}, config::Config, db::DB, error::{AppError, lock}, flash::Flash, guard::{check_database_readable, check_database_writable}};
use actix_web::{get, post, web::{Form, Data}, cookie::Cookie, HttpResponse, http::{StatusCode, header::LOCATION}};
use serde::Deserialize;

#[derive(Deserialize)]
pub struct Signup {
    user_name: String,
    password: String,
}
#[derive(Deserialize)]
pub struct Login {
    user_name: String,
    password: String,
}

fn back_to(page: &str, flash: Flash) -> HttpResponse {
    HttpResponse::build(StatusCode::SEE_OTHER)
        .append_header((LOCATION, flash.append_to(page)))
        .finish()
}

fn logged_in(session_id: &SessionID, max_age: Duration) -> HttpResponse {
    HttpResponse::build(StatusCode::SEE_OTHER)
        .append_header((LOCATION, "/"))
        .cookie(build_session_cookie(session_id, max_age))
        .finish()
}

#[post("/auth/signup")]
pub async fn auth_signup(auth: Data<Mutex<Auth>>, db: Data<Mutex<DB>>, config: Data<Config>, Form(form): Form<Signup>) -> Result<HttpResponse, AppError> {
    check_database_writable(&config)?;
    let mut db = lock(&db)?;
    let mut auth = lock(&auth)?;
    if let Err(e) = auth.signup(form.user_name.as_str(), form.password.as_str(), &mut db) {
        return Ok(back_to("/signup", Flash::from_signup_error(e)?));
    }
    match auth.login(form.user_name.as_str(), form.password.as_str(), &db) {
        Ok((_, session_id)) => Ok(logged_in(&session_id, auth.max_age())),
        Err(e) => Ok(back_to("/login", Flash::from_login_error(e)?)),
    }
}

#[post("/auth/login")]
pub async fn auth_login(auth: Data<Mutex<Auth>>, db: Data<Mutex<DB>>, config: Data<Config>, Form(form): Form<Login>) -> Result<HttpResponse, AppError> {
    check_database_readable(&config)?;
    let db = lock(&db)?;
    let mut auth = lock(&auth)?;
    match auth.login(form.user_name.as_str(), form.password.as_str(), &db) {
        Ok((_, session_id)) => Ok(logged_in(&session_id, auth.max_age())),
        Err(e) => Ok(back_to("/login", Flash::from_login_error(e)?)),
    }
}

#[get("/auth/logout")]
pub async fn auth_logout(auth: Data<Mutex<Auth>>, user: UserSession) -> Result<HttpResponse, AppError> {
    lock(&auth)?.logout(&user);
    let mut cookie = Cookie::new(SESSION_COOKIE, "");
    cookie.make_removal();
    Ok(HttpResponse::build(StatusCode::SEE_OTHER)
        .append_header((LOCATION, "/"))
        .cookie(cookie)
        .finish())
}

#[cfg(test)]
mod tests {
    use actix_web::{test, http::StatusCode};

    use crate::{data::UserID, routes::testing::{TestState, location, test_app}};

    #[actix_web::test]
    async fn signup_sets_session_and_login_checks_password() {
        let state = TestState::new(&[]);
        let app = test_app!(state);

        let req = test::TestRequest::post().uri("/auth/signup")
            .set_form([("user_name", "carol"), ("password", "secret")])
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert!(resp.response().cookies().any(|c| c.name() == "session-id"));

        let req = test::TestRequest::post().uri("/auth/signup")
            .set_form([("user_name", "carol"), ("password", "again")])
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(location(&resp), "/signup?error=already_exists");

        let req = test::TestRequest::post().uri("/auth/login")
            .set_form([("user_name", "carol"), ("password", "wrong")])
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(location(&resp), "/login?error=wrong_credentials");
    }

    #[actix_web::test]
    async fn session_cookie_lasts_as_long_as_idle_limit() {
        let state = TestState::new(&[]);
        let app = test_app!(state);
        let req = test::TestRequest::post().uri("/auth/signup")
            .set_form([("user_name", "carol"), ("password", "secret")])
            .to_request();
        let resp = test::call_service(&app, req).await;
        let cookie = resp.response().cookies().find(|c| c.name() == "session-id").unwrap();
        assert_eq!(cookie.max_age(), Some(actix_web::cookie::time::Duration::hours(1)));
    }

    #[actix_web::test]
    async fn signup_is_refused_unless_database_is_online() {
        for status in ["offline", "readonly"] {
            let state = TestState::new(&[("DATABASE_STATUS", status)]);
            let app = test_app!(state);
            let req = test::TestRequest::post().uri("/auth/signup")
                .set_form([("user_name", "carol"), ("password", "secret")])
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
            assert!(!state.db.lock().unwrap().user_exists(&UserID("carol".to_string())));
            assert!(!state.dir.path().join("users").join("carol.json").exists());
        }

        let state = TestState::new(&[("DATABASE_STATUS", "offline")]);
        state.signup("carol", None);
        let app = test_app!(state);
        let req = test::TestRequest::post().uri("/auth/login")
            .set_form([("user_name", "carol"), ("password", "password")])
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[actix_web::test]
    async fn logout_ends_session() {
        let state = TestState::new(&[]);
        state.signup("carol", None);
        let app = test_app!(state);
        let cookie = state.cookie("carol");

        let req = test::TestRequest::get().uri("/auth/logout").cookie(cookie.clone()).to_request();
        test::call_service(&app, req).await;
        let req = test::TestRequest::get().uri("/auth/logout").cookie(cookie).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(location(&resp), "/login");
    }
}
