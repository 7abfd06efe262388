use std::sync::Mutex;

use actix_web::{get, post, HttpResponse, web::{Data, Form, Path, Query}};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::{
    auth::UserSession,
    config::{Config, DatabaseStatus},
    data::BlockID,
    db::{DB, BlockError, BlockFilter},
    error::{AppError, lock},
    flash::{Flash, FlashQuery},
    guard::{check_database_readable, check_database_writable, require_moderator, lookup_this_user, lookup_user_block, parse_block_id, require_valid_params, require_block_seen, require_block_seen_unless_viewing, require_user},
    render::{render_page, render_flash, render_block_table, render_pager, render_block_list, render_block_details, render_block_form, template, escape, block_status, BlockForm, Columns, Viewer},
};

use super::redirect;

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    page: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct BlockParams {
    #[serde(default)]
    reason: String,
    #[serde(default)]
    user_block_period: String,
    needs_view: Option<String>,
}

impl BlockParams {
    fn needs_view(&self) -> bool {
        matches!(self.needs_view.as_deref(), Some("1" | "true" | "on" | "yes"))
    }
}

#[derive(Debug, Deserialize)]
pub struct RevokeParams {
    confirm: Option<String>,
}

fn viewer<'a>(db: &DB, user: Option<&'a UserSession>) -> Viewer<'a> {
    let user = user.map(|x| &x.user);
    Viewer { user, is_moderator: user.map_or(false, |x| db.is_moderator(x)) }
}

/// Model validation failures go back to the form they came from.
fn block_failure(e: BlockError, back: &str) -> AppError {
    match Flash::from_block_error(&e) {
        Some(flash) => AppError::redirect(back, flash),
        None => match e {
            BlockError::NotFound(id) => AppError::BlockNotFound(id),
            BlockError::Store(e) => AppError::Store(e),
            _ => AppError::NotFound,
        },
    }
}

struct Listing<'a> {
    title: String,
    filter: BlockFilter,
    columns: Columns,
    base_url: String,
    empty_message: String,
    page: usize,
    flash: &'a FlashQuery,
}

fn render_listing(db: &DB, config: &Config, user: Option<&UserSession>, listing: Listing, now: DateTime<Utc>) -> HttpResponse {
    let page = db.list_blocks(&listing.filter, listing.page, config.blocks_per_page);
    let viewer = viewer(db, user);
    render_page(db, user, &listing.title, render_flash(listing.flash.flash(), ""), || {
        let table = render_block_table(&page, &viewer, listing.columns, now, &listing.empty_message);
        render_block_list(&listing.title, table, render_pager(&page, &listing.base_url))
    })
}

#[get("/user_blocks")]
pub async fn blocks_index(db: Data<Mutex<DB>>, config: Data<Config>, user: Option<UserSession>, query: Query<PageQuery>, flash: Query<FlashQuery>) -> Result<HttpResponse, AppError> {
    check_database_readable(&config)?;
    let db = lock(&db)?;
    let now = Utc::now();
    require_block_seen(&db, user.as_ref(), now)?;
    Ok(render_listing(&db, &config, user.as_ref(), Listing {
        title: "All blocks".to_string(),
        filter: BlockFilter::All,
        columns: Columns { user: true, creator: true },
        base_url: "/user_blocks".to_string(),
        empty_message: "There are no blocks yet.".to_string(),
        page: query.page.unwrap_or(1),
        flash: &flash,
    }, now))
}

#[get("/user/{display_name}/blocks")]
pub async fn blocks_on(db: Data<Mutex<DB>>, config: Data<Config>, user: Option<UserSession>, display_name: Path<String>, query: Query<PageQuery>, flash: Query<FlashQuery>) -> Result<HttpResponse, AppError> {
    check_database_readable(&config)?;
    let db = lock(&db)?;
    let now = Utc::now();
    require_block_seen(&db, user.as_ref(), now)?;
    let this_user = lookup_this_user(&db, &display_name)?;
    Ok(render_listing(&db, &config, user.as_ref(), Listing {
        title: format!("Blocks on {}", this_user.0),
        base_url: format!("/user/{}/blocks", this_user.0),
        empty_message: format!("{} has not been blocked yet.", this_user.0),
        filter: BlockFilter::On(this_user),
        columns: Columns { user: false, creator: true },
        page: query.page.unwrap_or(1),
        flash: &flash,
    }, now))
}

#[get("/user/{display_name}/blocks_by")]
pub async fn blocks_by(db: Data<Mutex<DB>>, config: Data<Config>, user: Option<UserSession>, display_name: Path<String>, query: Query<PageQuery>, flash: Query<FlashQuery>) -> Result<HttpResponse, AppError> {
    check_database_readable(&config)?;
    let db = lock(&db)?;
    let now = Utc::now();
    require_block_seen(&db, user.as_ref(), now)?;
    let this_user = lookup_this_user(&db, &display_name)?;
    Ok(render_listing(&db, &config, user.as_ref(), Listing {
        title: format!("Blocks by {}", this_user.0),
        base_url: format!("/user/{}/blocks_by", this_user.0),
        empty_message: format!("{} has not made any blocks yet.", this_user.0),
        filter: BlockFilter::By(this_user),
        columns: Columns { user: true, creator: false },
        page: query.page.unwrap_or(1),
        flash: &flash,
    }, now))
}

#[get("/user_blocks/{id}")]
pub async fn block_show(db: Data<Mutex<DB>>, config: Data<Config>, user: Option<UserSession>, id: Path<String>, flash: Query<FlashQuery>) -> Result<HttpResponse, AppError> {
    check_database_readable(&config)?;
    let id = parse_block_id(&id)?;
    let mut db = lock(&db)?;
    let now = Utc::now();
    require_block_seen_unless_viewing(&db, user.as_ref(), id, now)?;
    lookup_user_block(&db, id)?;
    if let Some(session) = &user {
        if config.database_status == DatabaseStatus::Online {
            db.acknowledge_block(id, &session.user).map_err(|e| block_failure(e, "/user_blocks"))?;
        }
    }
    let block = lookup_user_block(&db, id)?;
    let viewer = viewer(&db, user.as_ref());
    let title = format!("Block on {}", block.user.0);
    Ok(render_page(&db, user.as_ref(), &title, render_flash(flash.flash(), &block.user.0), || {
        render_block_details(id, block, &viewer, now)
    }))
}

#[get("/blocks/new/{display_name}")]
pub async fn block_new(db: Data<Mutex<DB>>, config: Data<Config>, user: Option<UserSession>, display_name: Path<String>, flash: Query<FlashQuery>) -> Result<HttpResponse, AppError> {
    check_database_readable(&config)?;
    let user = require_user(user)?;
    let db = lock(&db)?;
    require_block_seen(&db, Some(&user), Utc::now())?;
    let this_user = lookup_this_user(&db, &display_name)?;
    let title = format!("Creating block on {}", this_user.0);
    Ok(render_page(&db, Some(&user), &title, render_flash(flash.flash(), &this_user.0), || {
        let form = render_block_form(&BlockForm {
            action: format!("/blocks/new/{}", this_user.0),
            reason: "",
            period: None,
            needs_view: false,
            submit: "Create block",
        }, &config.block_periods);
        template::BLOCK_NEW
            .replace("{{user-name}}", escape(&this_user.0).as_str())
            .replace("{{form}}", form.as_str())
    }))
}

#[post("/blocks/new/{display_name}")]
pub async fn block_create(db: Data<Mutex<DB>>, config: Data<Config>, user: Option<UserSession>, display_name: Path<String>, Form(params): Form<BlockParams>) -> Result<HttpResponse, AppError> {
    check_database_writable(&config)?;
    let user = require_user(user)?;
    let mut db = lock(&db)?;
    require_moderator(&db, &user.user)?;
    let this_user = lookup_this_user(&db, &display_name)?;
    let back = format!("/blocks/new/{}", this_user.0);
    let now = Utc::now();
    let period = require_valid_params(&config.block_periods, &params.user_block_period, None, now)
        .map_err(|flash| AppError::redirect(back.as_str(), flash))?;
    let id = db.create_block(&this_user, &user.user, &params.reason, period, params.needs_view(), now)
        .map_err(|e| block_failure(e, &back))?;
    Ok(redirect(format!("/user_blocks/{id}"), Some(Flash::BlockCreated), &user))
}

#[get("/user_blocks/{id}/edit")]
pub async fn block_edit(db: Data<Mutex<DB>>, config: Data<Config>, user: Option<UserSession>, id: Path<String>, flash: Query<FlashQuery>) -> Result<HttpResponse, AppError> {
    check_database_readable(&config)?;
    let user = require_user(user)?;
    let id = parse_block_id(&id)?;
    let db = lock(&db)?;
    let now = Utc::now();
    require_block_seen(&db, Some(&user), now)?;
    let block = lookup_user_block(&db, id)?;
    let title = format!("Editing block on {}", block.user.0);
    Ok(render_page(&db, Some(&user), &title, render_flash(flash.flash(), &block.user.0), || {
        let form = render_block_form(&BlockForm {
            action: format!("/user_blocks/{id}"),
            reason: &block.reason,
            period: Some(block.hours_remaining(now)),
            needs_view: block.needs_view,
            submit: "Update block",
        }, &config.block_periods);
        template::BLOCK_EDIT
            .replace("{{user-name}}", escape(&block.user.0).as_str())
            .replace("{{block-id}}", id.to_string().as_str())
            .replace("{{form}}", form.as_str())
    }))
}

#[post("/user_blocks/{id}")]
pub async fn block_update(db: Data<Mutex<DB>>, config: Data<Config>, user: Option<UserSession>, id: Path<String>, Form(params): Form<BlockParams>) -> Result<HttpResponse, AppError> {
    check_database_writable(&config)?;
    let user = require_user(user)?;
    let id = parse_block_id(&id)?;
    let mut db = lock(&db)?;
    require_moderator(&db, &user.user)?;
    let block = lookup_user_block(&db, id)?;
    let back = format!("/user_blocks/{id}/edit");
    let now = Utc::now();
    let period = require_valid_params(&config.block_periods, &params.user_block_period, Some(block), now)
        .map_err(|flash| AppError::redirect(back.as_str(), flash))?;
    db.update_block(id, &user.user, &params.reason, period, params.needs_view(), now)
        .map_err(|e| block_failure(e, &back))?;
    Ok(redirect(format!("/user_blocks/{id}"), Some(Flash::BlockUpdated), &user))
}

fn render_revoke_page(db: &DB, user: &UserSession, id: BlockID) -> Result<HttpResponse, AppError> {
    let block = lookup_user_block(db, id)?;
    let now = Utc::now();
    let title = format!("Revoking block on {}", block.user.0);
    Ok(render_page(db, Some(user), &title, "".to_string(), || {
        template::BLOCK_REVOKE
            .replace("{{user-name}}", escape(&block.user.0).as_str())
            .replace("{{creator-name}}", escape(&block.creator.0).as_str())
            .replace("{{block-id}}", id.to_string().as_str())
            .replace("{{status}}", block_status(block, now).as_str())
    }))
}

#[get("/user_blocks/{id}/revoke")]
pub async fn block_revoke_confirm(db: Data<Mutex<DB>>, config: Data<Config>, user: Option<UserSession>, id: Path<String>) -> Result<HttpResponse, AppError> {
    check_database_writable(&config)?;
    let user = require_user(user)?;
    let id = parse_block_id(&id)?;
    let db = lock(&db)?;
    require_block_seen(&db, Some(&user), Utc::now())?;
    require_moderator(&db, &user.user)?;
    render_revoke_page(&db, &user, id)
}

#[post("/user_blocks/{id}/revoke")]
pub async fn block_revoke(db: Data<Mutex<DB>>, config: Data<Config>, user: Option<UserSession>, id: Path<String>, Form(params): Form<RevokeParams>) -> Result<HttpResponse, AppError> {
    check_database_writable(&config)?;
    let user = require_user(user)?;
    let id = parse_block_id(&id)?;
    let mut db = lock(&db)?;
    require_moderator(&db, &user.user)?;
    lookup_user_block(&db, id)?;
    if params.confirm.is_none() {
        return render_revoke_page(&db, &user, id);
    }
    db.revoke_block(id, &user.user, Utc::now())
        .map_err(|e| block_failure(e, &format!("/user_blocks/{id}")))?;
    Ok(redirect(format!("/user_blocks/{id}"), Some(Flash::BlockRevoked), &user))
}
