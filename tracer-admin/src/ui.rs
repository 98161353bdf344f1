//! Shared HTML layout for the server-rendered pages

use crate::api::{Banner, CurrentUser};
use axum::response::Html;
use tracer_common::Permission;

const STYLE: &str = r#"
    * { box-sizing: border-box; }
    body { font-family: 'Segoe UI', Tahoma, sans-serif; margin: 0; background: #f4f6f9; color: #222; }
    nav { background: #0d3b66; padding: 12px 20px; display: flex; gap: 16px; align-items: center; }
    nav a { color: #fff; text-decoration: none; }
    nav .spacer { flex: 1; }
    main { padding: 24px; max-width: 1100px; margin: 0 auto; }
    .card { background: #fff; border-radius: 6px; padding: 16px; margin-bottom: 16px; box-shadow: 0 1px 3px rgba(0,0,0,.1); }
    .stats { display: flex; gap: 16px; flex-wrap: wrap; }
    .stat { flex: 1; min-width: 160px; }
    .stat .value { font-size: 28px; font-weight: bold; color: #0d3b66; }
    table { width: 100%; border-collapse: collapse; }
    th, td { padding: 6px 8px; border-bottom: 1px solid #ddd; text-align: left; }
    .alert { padding: 10px 14px; border-radius: 4px; margin-bottom: 16px; }
    .alert.error { background: #fde2e1; color: #8a1c1c; }
    .alert.info { background: #e1f3e4; color: #1c6b2b; }
    form.inline { display: inline; }
    label { display: block; margin: 6px 0 2px; }
"#;

/// Escape text for HTML element and attribute content
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn alert(message: &str, is_error: bool) -> String {
    let class = if is_error { "error" } else { "info" };
    format!(r#"<div class="alert {}">{}</div>"#, class, escape(message))
}

/// Alerts for the `?msg=` / `?error=` query banner
pub fn banners(banner: &Banner) -> String {
    let mut out = String::new();
    if let Some(msg) = &banner.msg {
        out.push_str(&alert(msg, false));
    }
    if let Some(error) = &banner.error {
        out.push_str(&alert(error, true));
    }
    out
}

fn nav(user: &CurrentUser) -> String {
    let mut links = vec![r#"<a href="/dashboard">Dashboard</a>"#.to_string()];
    let entries = [
        (Permission::Riwayat, "/riwayat", "Riwayat"),
        (Permission::Upload, "/upload", "Upload"),
        (Permission::Pembobotan, "/pembobotan", "Pembobotan"),
        (Permission::ManageAdmin, "/admin", "Kelola Admin"),
        (Permission::Profile, "/profile", "Profil"),
    ];
    for (permission, href, label) in entries {
        if user.can(permission) {
            links.push(format!(r#"<a href="{}">{}</a>"#, href, label));
        }
    }
    format!(
        r#"<nav>{}<span class="spacer"></span><span style="color:#cfe">{} ({})</span><a href="/logout">Logout</a></nav>"#,
        links.join(""),
        escape(&user.username),
        user.role
    )
}

/// Full page with navigation when signed in
pub fn page(title: &str, user: Option<&CurrentUser>, body: &str) -> Html<String> {
    Html(format!(
        r#"<!DOCTYPE html>
<html lang="id">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title} - Tracer Study</title>
    <style>{STYLE}</style>
</head>
<body>
{nav}
<main>
<h1>{title}</h1>
{body}
</main>
</body>
</html>"#,
        title = escape(title),
        nav = user.map(nav).unwrap_or_default(),
    ))
}
