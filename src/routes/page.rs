use std::sync::Mutex;
use actix_web::{get, HttpResponse, web::{Data, Path, Query}};
use chrono::Utc;
use crate::{
    db::{DB, BlockFilter},
    config::Config,
    render::{render_page, render_flash, format_date_time, escape, template},
    auth::UserSession,
    error::{AppError, lock},
    flash::FlashQuery,
    guard::{check_database_readable, lookup_this_user, require_block_seen},
};

#[get("/")]
pub async fn page_home(db: Data<Mutex<DB>>, config: Data<Config>, user: Option<UserSession>, flash: Query<FlashQuery>) -> Result<HttpResponse, AppError> {
    check_database_readable(&config)?;
    let db = lock(&db)?;
    require_block_seen(&db, user.as_ref(), Utc::now())?;
    Ok(render_page(&db, user.as_ref(), "Home", render_flash(flash.flash(), ""), || {
        template::ROOT.to_string()
    }))
}

#[get("/user/{display_name}")]
pub async fn page_user(db: Data<Mutex<DB>>, config: Data<Config>, current_user: Option<UserSession>, display_name: Path<String>, flash: Query<FlashQuery>) -> Result<HttpResponse, AppError> {
    check_database_readable(&config)?;
    let db = lock(&db)?;
    let now = Utc::now();
    require_block_seen(&db, current_user.as_ref(), now)?;
    let user_id = lookup_this_user(&db, &display_name)?;
    let Some(user) = db.get_user(&user_id) else {
        return Err(AppError::UserNotFound(user_id.0));
    };
    let viewer = current_user.as_ref().map(|x| &x.user);
    let viewer_is_moderator = viewer.map_or(false, |x| db.is_moderator(x));
    let viewer_is_admin = viewer.map_or(false, |x| db.is_admin(x));
    Ok(render_page(&db, current_user.as_ref(), &user_id.0, render_flash(flash.flash(), &user_id.0), || {
        let name = escape(&user_id.0);
        let roles = db.permissions_of(&user_id).iter()
            .map(|x| x.code())
            .collect::<Vec<_>>()
            .join(", ");
        let block_this_user = if viewer_is_moderator && viewer != Some(&user_id) {
            template::BLOCK_THIS_USER.replace("{{user-name}}", name.as_str())
        } else { "".to_string() };
        let role_tools = if viewer_is_admin {
            let is_moderator = db.is_moderator(&user_id);
            template::ROLE_TOOLS
                .replace("{{user-name}}", name.as_str())
                .replace("{{action}}", if is_moderator { "revoke" } else { "grant" })
                .replace("{{label}}", if is_moderator { "Remove moderator role" } else { "Make moderator" })
        } else { "".to_string() };
        template::USER
            .replace("{{roles}}", roles.as_str())
            .replace("{{created}}", format_date_time(&user.created, now).as_str())
            .replace("{{active-blocks-on}}", db.count_active_blocks(&BlockFilter::On(user_id.clone()), now).to_string().as_str())
            .replace("{{block-this-user}}", block_this_user.as_str())
            .replace("{{role-tools}}", role_tools.as_str())
            .replace("{{user-name}}", name.as_str())
    }))
}

#[get("/login")]
pub async fn page_login(db: Data<Mutex<DB>>, config: Data<Config>, user: Option<UserSession>, flash: Query<FlashQuery>) -> Result<HttpResponse, AppError> {
    check_database_readable(&config)?;
    let db = lock(&db)?;
    require_block_seen(&db, user.as_ref(), Utc::now())?;
    Ok(render_page(&db, user.as_ref(), "Log in", render_flash(flash.flash(), ""), || {
        template::LOGIN.to_string()
    }))
}

#[get("/signup")]
pub async fn page_signup(db: Data<Mutex<DB>>, config: Data<Config>, user: Option<UserSession>, flash: Query<FlashQuery>) -> Result<HttpResponse, AppError> {
    check_database_readable(&config)?;
    let db = lock(&db)?;
    require_block_seen(&db, user.as_ref(), Utc::now())?;
    Ok(render_page(&db, user.as_ref(), "Sign up", render_flash(flash.flash(), ""), || {
        template::SIGNUP.to_string()
    }))
}
