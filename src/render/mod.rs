use actix_web::{HttpResponse, http::{header::ContentType, StatusCode}};

use crate::{db::DB, auth::UserSession, flash::Flash};

pub use self::blocks::*;
pub use self::format::*;

mod blocks;
mod format;

pub mod template {
    pub const INDEX: &str = include_str!("../../assets/index.html");
    pub const LOGGED_IN: &str = include_str!("../../assets/element/top-bar/logged-in.html");
    pub const LOGGED_OUT: &str = include_str!("../../assets/element/top-bar/logged-out.html");
    pub const FLASH: &str = include_str!("../../assets/element/flash.html");
    pub const ROOT: &str = include_str!("../../assets/page/root.html");
    pub const MESSAGE: &str = include_str!("../../assets/page/message.html");
    pub const USER: &str = include_str!("../../assets/page/user.html");
    pub const BLOCK_THIS_USER: &str = include_str!("../../assets/element/block-this-user.html");
    pub const ROLE_TOOLS: &str = include_str!("../../assets/element/role-tools.html");
    pub const LOGIN: &str = include_str!("../../assets/page/login.html");
    pub const SIGNUP: &str = include_str!("../../assets/page/signup.html");

    pub const BLOCK_LIST: &str = include_str!("../../assets/page/blocks/list.html");
    pub const BLOCK_SHOW: &str = include_str!("../../assets/page/blocks/show.html");
    pub const BLOCK_NEW: &str = include_str!("../../assets/page/blocks/new.html");
    pub const BLOCK_EDIT: &str = include_str!("../../assets/page/blocks/edit.html");
    pub const BLOCK_REVOKE: &str = include_str!("../../assets/page/blocks/revoke.html");
    pub const BLOCK_TABLE: &str = include_str!("../../assets/element/blocks/table.html");
    pub const BLOCK_ROW: &str = include_str!("../../assets/element/blocks/row.html");
    pub const BLOCK_EMPTY: &str = include_str!("../../assets/element/blocks/empty.html");
    pub const BLOCK_FORM: &str = include_str!("../../assets/element/blocks/form.html");
}

pub fn escape(text: &str) -> String {
    html_escape::encode_text(text).to_string()
}

/// `name` fills the `{name}` slot some messages carry.
pub fn render_flash(flash: Option<Flash>, name: &str) -> String {
    match flash {
        Some(flash) => template::FLASH
            .replace("{{kind}}", if flash.is_error() { "error" } else { "notice" })
            .replace("{{message}}", escape(&flash.message().replace("{name}", name)).as_str()),
        None => "".to_string(),
    }
}

fn fill_layout(title: &str, session_area: &str, moderator_tools: &str, flash: &str, content: &str) -> String {
    template::INDEX
        .replace("{{title}}", escape(title).as_str())
        .replace("{{session-area}}", session_area)
        .replace("{{moderator-tools}}", moderator_tools)
        .replace("{{flash}}", flash)
        .replace("{{content}}", content)
}

pub fn render_page<R>(db: &DB, user_session: Option<&UserSession>, title: &str, flash: String, render_content: R) -> HttpResponse
    where R: FnOnce() -> String {
    let user = user_session.map(|x| &x.user);
    let moderator_tools = match user {
        Some(user) if db.is_moderator(user) =>
            format!("<a href=\"/user/{}/blocks_by\">My blocks</a>", user.0),
        _ => "".to_string(),
    };
    let session_area = match user {
        Some(user) => template::LOGGED_IN.replace("{{current-user-name}}", user.0.as_str()),
        None => template::LOGGED_OUT.to_string(),
    };
    let html = fill_layout(title, &session_area, &moderator_tools, &flash, &render_content());
    let mut builder = HttpResponse::build(StatusCode::OK);
    builder.content_type(ContentType::html());
    if let Some(session) = user_session {
        session.keep(&mut builder);
    }
    builder.body(html)
}

/// Layout without any session state, for error pages.
pub fn render_bare(status: StatusCode, title: &str, message: &str) -> HttpResponse {
    let content = template::MESSAGE
        .replace("{{title}}", escape(title).as_str())
        .replace("{{message}}", escape(message).as_str());
    HttpResponse::build(status)
        .content_type(ContentType::html())
        .body(fill_layout(title, template::LOGGED_OUT, "", "", &content))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flash_messages_are_escaped_and_named() {
        let html = render_flash(Some(Flash::BlockCreated), "<b>bob</b>");
        assert!(html.contains("flash-notice"));
        assert!(html.contains("Created a block on user &lt;b&gt;bob&lt;/b&gt;."));
        assert!(render_flash(Some(Flash::BlockPeriod), "").contains("flash-error"));
        assert_eq!(render_flash(None, "bob"), "");
    }
}
