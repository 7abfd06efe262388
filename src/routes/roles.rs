use std::sync::Mutex;

use actix_web::{post, HttpResponse, web::{Data, Path}};

use crate::{auth::UserSession, config::Config, db::{DB, Permission}, error::{AppError, lock}, flash::Flash, guard::{check_database_writable, lookup_this_user, require_administrator, require_user}};

use super::redirect;

#[post("/user/{display_name}/roles/moderator/{action}")]
pub async fn change_moderator_role(db: Data<Mutex<DB>>, config: Data<Config>, user: Option<UserSession>, path: Path<(String, String)>) -> Result<HttpResponse, AppError> {
    check_database_writable(&config)?;
    let user = require_user(user)?;
    let (display_name, action) = path.into_inner();
    let mut db = lock(&db)?;
    let back = format!("/user/{display_name}");
    let this_user = lookup_this_user(&db, &display_name)?;
    require_administrator(&db, &user.user, &back)?;
    let flash = match action.as_str() {
        "grant" => {
            db.grant_permission(&this_user, Permission::Moderator)?;
            Flash::ModeratorGranted
        },
        "revoke" => {
            db.revoke_permission(&this_user, Permission::Moderator)?;
            Flash::ModeratorRevoked
        },
        _ => return Err(AppError::NotFound),
    };
    Ok(redirect(back, Some(flash), &user))
}
