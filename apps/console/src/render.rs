//! Plain-text rendering of a page of the directory.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use console_core::PageView;
use shared::domain::User;

const HEADERS: [&str; 8] = [
    "ID",
    "NAME",
    "EMAIL",
    "USERNAME",
    "ROLE",
    "STATUS",
    "JOINED",
    "LAST ACTIVE",
];

pub fn relative_time(now: DateTime<Utc>, then: DateTime<Utc>) -> String {
    let secs = (now - then).num_seconds().max(0);
    let mins = secs / 60;
    let hours = mins / 60;
    let days = hours / 24;

    if secs < 60 {
        format!("{secs} seconds ago")
    } else if mins < 60 {
        format!("{mins} minutes ago")
    } else if hours < 24 {
        format!("{hours} hours ago")
    } else if days < 7 {
        format!("{days} days ago")
    } else if days < 30 {
        format!("{} weeks ago", days / 7)
    } else {
        format!("{} months ago", days / 30)
    }
}

pub fn format_joined(date: DateTime<Utc>) -> String {
    date.format("%b %d, %Y").to_string()
}

fn row(user: &User, now: DateTime<Utc>) -> [String; 8] {
    [
        user.id.to_string(),
        user.name.clone(),
        user.email.clone(),
        user.username.clone(),
        user.role.to_string(),
        user.status.to_string(),
        format_joined(user.joined_date),
        relative_time(now, user.last_active),
    ]
}

pub fn render_page(view: &PageView<'_>, now: DateTime<Utc>) -> String {
    let rows: Vec<[String; 8]> = view.users.iter().map(|user| row(user, now)).collect();

    let mut widths = HEADERS.map(str::len);
    for cells in &rows {
        for (width, cell) in widths.iter_mut().zip(cells) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    push_line(&mut out, &HEADERS.map(String::from), &widths);
    if rows.is_empty() {
        out.push_str("No users found.\n");
    }
    for cells in &rows {
        push_line(&mut out, cells, &widths);
    }

    let pages = view
        .window()
        .map(|page| {
            if page == view.page {
                format!("[{page}]")
            } else {
                page.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" ");
    let _ = writeln!(
        out,
        "\nRows per page: {} | Showing {} results | Page {}/{}  {}{pages}{}",
        view.page_size(),
        view.total_count,
        view.page,
        view.total_pages,
        if view.has_previous() { "‹ " } else { "" },
        if view.has_next() { " ›" } else { "" },
    );
    out
}

fn push_line(out: &mut String, cells: &[String; 8], widths: &[usize; 8]) {
    let line = cells
        .iter()
        .zip(widths)
        .map(|(cell, &width)| format!("{cell:<width$}"))
        .collect::<Vec<_>>()
        .join("  ");
    out.push_str(line.trim_end());
    out.push('\n');
}

#[cfg(test)]
#[path = "tests/render_tests.rs"]
mod tests;
