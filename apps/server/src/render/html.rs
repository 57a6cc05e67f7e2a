//! Server-rendered HTML pages.
//!
//! Plain string building with every dynamic value passed through
//! [`escape`]. Pages share one layout with inline CSS.

use std::fmt::Write as _;

use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use techstore_core::{AccessLevel, CoreError, ValidationError};
use techstore_db::DbError;

use super::TableReport;
use crate::error::ApiError;
use crate::session::Session;

const STYLE: &str = r#"
body { font-family: Helvetica, Arial, sans-serif; margin: 0; color: #222; background: #f5f6f8; }
header { background: #1f3a5f; color: #fff; padding: 12px 24px; display: flex; justify-content: space-between; }
header a { color: #fff; }
main { padding: 24px; max-width: 1100px; margin: auto; }
table { border-collapse: collapse; width: 100%; background: #fff; }
th, td { border: 1px solid #ccd; padding: 6px 10px; text-align: left; }
th { background: #e4e8f0; }
.muted { color: #667; }
.error { color: #a11; font-weight: bold; }
.card { background: #fff; padding: 16px; margin-bottom: 16px; border: 1px solid #ccd; }
form.inline { display: inline-block; margin-right: 16px; }
"#;

/// Escapes text for element content and quoted attribute values.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

/// Wraps `body` in the shared page layout.
pub fn layout(title: &str, session: Option<&Session>, body: &str) -> String {
    let nav = match session {
        Some(s) => format!(
            r#"<span>{} &middot; {}</span><span><a href="/menu">Menu</a> &middot; <form method="post" action="/logout" class="inline"><button type="submit">Log out</button></form></span>"#,
            escape(&s.display_name),
            escape(&s.level.to_string())
        ),
        None => "<span>TechStore</span>".to_string(),
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{title} - TechStore</title>
<style>{STYLE}</style>
</head>
<body>
<header>{nav}</header>
<main>
{body}
</main>
</body>
</html>
"#,
        title = escape(title),
    )
}

pub fn login_page(error: Option<&str>, username: &str) -> String {
    let error = error
        .map(|e| format!(r#"<p class="error">{}</p>"#, escape(e)))
        .unwrap_or_default();

    let body = format!(
        r#"<div class="card">
<h1>TechStore</h1>
{error}
<form method="post" action="/login">
<p><label>Username<br><input name="username" value="{username}" autofocus required></label></p>
<p><label>Password<br><input name="password" type="password" required></label></p>
<p><button type="submit">Log in</button></p>
</form>
</div>"#,
        username = escape(username),
    );

    layout("Log in", None, &body)
}

/// Sections offered on the main menu, with the level each one needs.
const MENU: &[(&str, &str, AccessLevel)] = &[
    ("/reports", "Reports", AccessLevel::Level3),
    ("/api/products/available", "Products in stock (JSON)", AccessLevel::Level3),
    ("/api/clients", "Clients (JSON)", AccessLevel::Level3),
    ("/api/sales", "Sales (JSON)", AccessLevel::Level3),
    ("/api/credits/pending", "Pending credits (JSON)", AccessLevel::Level3),
    ("/api/users", "Users (JSON)", AccessLevel::Level1),
    ("/reports/session-log", "Session log", AccessLevel::Level1),
];

pub fn menu_page(session: &Session) -> String {
    let mut items = String::new();
    for (href, label, level) in MENU {
        if session.level.at_least(*level) {
            let _ = writeln!(items, r#"<li><a href="{href}">{}</a></li>"#, escape(label));
        }
    }

    let abilities = if session.level.can_register_sales() {
        "You can register sales, payments and edit the catalog."
    } else {
        "Read-only access."
    };

    let body = format!(
        r#"<h1>Welcome, {name}</h1>
<p class="muted">{level}. {abilities}</p>
<ul>
{items}</ul>"#,
        name = escape(&session.display_name),
        level = escape(&session.level.to_string()),
    );

    layout("Menu", Some(session), &body)
}

pub fn reports_page(session: &Session) -> String {
    let mut body = String::from("<h1>Reports</h1>\n");

    body.push_str(
        r#"<div class="card"><h2>Daily sales</h2>
<form class="inline" method="get" action="/reports/daily-sales">
From <input type="date" name="from"> To <input type="date" name="to">
<button>HTML</button></form>
<form class="inline" method="get" action="/reports/daily-sales.pdf">
From <input type="date" name="from"> To <input type="date" name="to">
<button>PDF</button></form></div>
<div class="card"><h2>Outstanding credits</h2>
<a href="/reports/outstanding-credits">HTML</a> &middot; <a href="/reports/outstanding-credits.pdf">PDF</a></div>
<div class="card"><h2>Invoice</h2>
<form class="inline" method="get" action="/reports/invoice">
Sale # <input type="number" name="sale_id" min="1" required> <button>PDF</button></form></div>
<div class="card"><h2>Monthly sales</h2>
<form class="inline" method="get" action="/reports/monthly-sales">
Month <input type="number" name="month" min="1" max="12" required>
Year <input type="number" name="year" min="2000" max="2100" required> <button>PDF</button></form></div>
<div class="card"><h2>VAT by quarter</h2>
<form class="inline" method="get" action="/reports/vat-quarter">
Quarter <input type="number" name="quarter" min="1" max="4" required>
Year <input type="number" name="year" min="2000" max="2100" required> <button>PDF</button></form></div>
<div class="card"><h2>Credit vs cash sales</h2>
<form class="inline" method="get" action="/reports/sales-by-type">
From <input type="date" name="from"> To <input type="date" name="to"> <button>PDF</button></form></div>
<div class="card"><h2>Inventory</h2>
<a href="/reports/inventory-by-category">Inventory by category (PDF)</a> &middot;
<a href="/reports/overdue-clients">Clients in arrears (PDF)</a></div>
"#,
    );

    if session.level.can_view_session_log() {
        body.push_str(
            r#"<div class="card"><h2>Session log</h2>
<form class="inline" method="get" action="/reports/session-log">
Rows <input type="number" name="limit" min="1" max="500"> <button>HTML</button></form>
<a href="/reports/session-log.pdf">PDF</a></div>
"#,
        );
    }

    layout("Reports", Some(session), &body)
}

/// Renders a table report as a full page.
pub fn table_page(report: &TableReport, session: &Session, pdf_href: Option<&str>) -> String {
    let mut body = format!("<h1>{}</h1>\n", escape(&report.title));
    if let Some(subtitle) = &report.subtitle {
        let _ = writeln!(body, "<h3>{}</h3>", escape(subtitle));
    }
    let _ = writeln!(body, r#"<p class="muted">{}</p>"#, escape(&report.generated_label()));

    if report.is_empty() {
        body.push_str("<p>No data.</p>\n");
    } else {
        body.push_str("<table>\n<tr>");
        for header in &report.headers {
            let _ = write!(body, "<th>{}</th>", escape(header));
        }
        body.push_str("</tr>\n");
        for row in &report.rows {
            body.push_str("<tr>");
            for cell in row {
                let _ = write!(body, "<td>{}</td>", escape(cell));
            }
            body.push_str("</tr>\n");
        }
        body.push_str("</table>\n");
    }

    if let Some(footer) = &report.footer {
        let _ = writeln!(body, "<p><strong>{}</strong></p>", escape(footer));
    }
    if let Some(href) = pdf_href {
        let _ = writeln!(body, r#"<p><a href="{}">Download PDF</a></p>"#, escape(href));
    }
    body.push_str(r#"<p><a href="/reports">Back to reports</a></p>"#);

    layout(&report.title, Some(session), &body)
}

/// Error shown as an HTML page instead of JSON.
#[derive(Debug)]
pub struct HtmlError(pub ApiError);

impl IntoResponse for HtmlError {
    fn into_response(self) -> Response {
        let status = self.0.status();
        if status.is_server_error() {
            tracing::error!(code = ?self.0.code, message = %self.0.message, "Page failed");
        }

        let title = if status == StatusCode::FORBIDDEN {
            "Access denied"
        } else {
            "Something went wrong"
        };
        let body = format!(
            r#"<h1>{}</h1><p class="error">{}</p><p><a href="/menu">Back to menu</a></p>"#,
            escape(title),
            escape(&self.0.message)
        );

        (status, Html(layout(title, None, &body))).into_response()
    }
}

impl From<ApiError> for HtmlError {
    fn from(err: ApiError) -> Self {
        HtmlError(err)
    }
}

impl From<DbError> for HtmlError {
    fn from(err: DbError) -> Self {
        HtmlError(err.into())
    }
}

impl From<CoreError> for HtmlError {
    fn from(err: CoreError) -> Self {
        HtmlError(err.into())
    }
}

impl From<ValidationError> for HtmlError {
    fn from(err: ValidationError) -> Self {
        HtmlError(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(level: AccessLevel) -> Session {
        Session::new(1, "vera", "Vera <Staff>", 1, level)
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape(r#"<a href="x">&'"#), "&lt;a href=&quot;x&quot;&gt;&amp;&#39;");
        assert_eq!(escape("plain"), "plain");
    }

    #[test]
    fn test_menu_hides_admin_sections() {
        let page = menu_page(&session(AccessLevel::Level3));
        assert!(page.contains("Vera &lt;Staff&gt;"));
        assert!(page.contains("/reports"));
        assert!(!page.contains("/api/users"));
        assert!(page.contains("Read-only access."));

        let page = menu_page(&session(AccessLevel::Level1));
        assert!(page.contains("/api/users"));
        assert!(page.contains("/reports/session-log"));
    }

    #[test]
    fn test_table_page_escapes_cells() {
        let mut report = TableReport::new("Clients", ["Name"]);
        report.push_row(vec!["<script>".into()]);
        let page = table_page(&report, &session(AccessLevel::Level2), Some("/x.pdf"));

        assert!(page.contains("<td>&lt;script&gt;</td>"));
        assert!(!page.contains("<td><script>"));
        assert!(page.contains("Download PDF"));
    }

    #[test]
    fn test_login_page_shows_error() {
        let page = login_page(Some("Invalid credentials"), "olga");
        assert!(page.contains("Invalid credentials"));
        assert!(page.contains(r#"value="olga""#));
    }
}
