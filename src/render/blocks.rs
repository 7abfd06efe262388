use std::{collections::HashSet, sync::OnceLock};

use ammonia::Builder;
use chrono::{DateTime, Utc};
use regex::Regex;

use crate::{data::{UserID, UserBlock, BlockID, BlockPeriods}, db::BlockPage};

use super::{template, escape, format_distance, format_period, format_date_time};

/// What the person looking at a block may do with it.
pub struct Viewer<'a> {
    pub user: Option<&'a UserID>,
    pub is_moderator: bool,
}

impl Viewer<'_> {
    fn can_edit(&self, block: &UserBlock) -> bool {
        self.user == Some(&block.creator)
    }

    fn can_revoke(&self, block: &UserBlock, now: DateTime<Utc>) -> bool {
        self.is_moderator && block.is_active(now)
    }
}

pub fn render_reason(reason: &str) -> String {
    static LINE_BREAK: OnceLock<Regex> = OnceLock::new();
    let cleaned = Builder::new()
        .tags(HashSet::from(["b", "i", "em", "q", "u", "var"]))
        .clean_content_tags(HashSet::from(["script", "style", "iframe"]))
        .clean(reason)
        .to_string();
    LINE_BREAK.get_or_init(|| Regex::new(" *\r?\n *").expect("line break pattern is valid"))
        .replace_all(cleaned.as_str(), "<br>")
        .to_string()
}

pub fn block_status(block: &UserBlock, now: DateTime<Utc>) -> String {
    let distance = format_distance(block.ends_at.signed_duration_since(now));
    if block.is_active(now) {
        match (block.needs_view, block.ends_at > now) {
            (true, true) => format!("Ends in {distance}, once the user has seen it."),
            (true, false) => "Active until the user logs in.".to_string(),
            _ => format!("Ends in {distance}."),
        }
    } else {
        match &block.revoker {
            Some(revoker) => format!("Revoked by {} {distance} ago.", escape(&revoker.0)),
            None => format!("Ended {distance} ago."),
        }
    }
}

fn user_link(user: &UserID) -> String {
    let name = escape(&user.0);
    format!("<a href=\"/user/{name}\">{name}</a>")
}

fn edit_link(id: BlockID, viewer: &Viewer, block: &UserBlock) -> String {
    if viewer.can_edit(block) {
        format!("<a href=\"/user_blocks/{id}/edit\">Edit</a>")
    } else {
        "".to_string()
    }
}

fn revoke_link(id: BlockID, viewer: &Viewer, block: &UserBlock, now: DateTime<Utc>) -> String {
    if viewer.can_revoke(block, now) {
        format!("<a href=\"/user_blocks/{id}/revoke\">Revoke!</a>")
    } else {
        "".to_string()
    }
}

/// Which of the user columns a listing shows; listings scoped to one user drop that column.
#[derive(Debug, Clone, Copy)]
pub struct Columns {
    pub user: bool,
    pub creator: bool,
}

pub fn render_block_table(page: &BlockPage, viewer: &Viewer, columns: Columns, now: DateTime<Utc>, empty_message: &str) -> String {
    if page.blocks.is_empty() {
        return template::BLOCK_EMPTY.replace("{{message}}", escape(empty_message).as_str());
    }
    let rows = page.blocks.iter().map(|(id, block)| {
        template::BLOCK_ROW
            .replace("{{status-class}}", if block.is_active(now) { "active" } else { "inactive" })
            .replace("{{user-cell}}", &if columns.user { format!("<td>{}</td>", user_link(&block.user)) } else { "".to_string() })
            .replace("{{creator-cell}}", &if columns.creator { format!("<td>{}</td>", user_link(&block.creator)) } else { "".to_string() })
            .replace("{{status}}", block_status(block, now).as_str())
            .replace("{{revoker}}", &block.revoker.as_ref().map_or_else(String::new, user_link))
            .replace("{{block-id}}", id.to_string().as_str())
            .replace("{{edit-link}}", edit_link(*id, viewer, block).as_str())
            .replace("{{revoke-link}}", revoke_link(*id, viewer, block, now).as_str())
            .replace("{{reason}}", render_reason(&block.reason).as_str())
    }).collect::<Vec<_>>().join("");
    template::BLOCK_TABLE
        .replace("{{user-column}}", if columns.user { "<th>Blocked user</th>" } else { "" })
        .replace("{{creator-column}}", if columns.creator { "<th>Creator</th>" } else { "" })
        .replace("{{rows}}", rows.as_str())
}

pub fn render_pager(page: &BlockPage, base_url: &str) -> String {
    if page.total_pages <= 1 && page.number <= 1 {
        return "".to_string();
    }
    let mut links = vec![];
    if page.number > 1 {
        links.push(format!("<a href=\"{base_url}?page={}\">Previous</a>", page.number - 1));
    }
    links.push(format!("<span>Page {} of {}</span>", page.number, page.total_pages));
    if page.number < page.total_pages {
        links.push(format!("<a href=\"{base_url}?page={}\">Next</a>", page.number + 1));
    }
    format!("<nav class=\"pager\">{}</nav>", links.join(""))
}

pub fn render_block_list(heading: &str, table: String, pager: String) -> String {
    template::BLOCK_LIST
        .replace("{{heading}}", escape(heading).as_str())
        .replace("{{pager}}", pager.as_str())
        .replace("{{table}}", table.as_str())
}

pub fn render_block_details(id: BlockID, block: &UserBlock, viewer: &Viewer, now: DateTime<Utc>) -> String {
    template::BLOCK_SHOW
        .replace("{{user-name}}", escape(&block.user.0).as_str())
        .replace("{{creator-name}}", escape(&block.creator.0).as_str())
        .replace("{{created}}", format_date_time(&block.created_at, now).as_str())
        .replace("{{status}}", block_status(block, now).as_str())
        .replace("{{edit-link}}", edit_link(id, viewer, block).as_str())
        .replace("{{revoke-link}}", revoke_link(id, viewer, block, now).as_str())
        .replace("{{reason}}", render_reason(&block.reason).as_str())
}

pub struct BlockForm<'a> {
    pub action: String,
    pub reason: &'a str,
    /// Hours; preselected when it matches one of the allowed periods.
    pub period: Option<i64>,
    pub needs_view: bool,
    pub submit: &'a str,
}

pub fn render_block_form(form: &BlockForm, periods: &BlockPeriods) -> String {
    let options = periods.iter().map(|hours| {
        let selected = if form.period == Some(i64::from(hours)) { " selected" } else { "" };
        format!("<option value=\"{hours}\"{selected}>{}</option>", format_period(hours))
    }).collect::<Vec<_>>().join("");
    template::BLOCK_FORM
        .replace("{{action}}", form.action.as_str())
        .replace("{{period-options}}", options.as_str())
        .replace("{{needs-view-checked}}", if form.needs_view { "checked" } else { "" })
        .replace("{{submit}}", form.submit)
        .replace("{{reason}}", escape(form.reason).as_str())
}
