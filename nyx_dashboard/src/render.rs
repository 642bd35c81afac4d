use std::fmt::Write;

use nyx_core::apis::format_count;
use nyx_core::stats::BotStats;

const STYLE: &str = "body{font-family:sans-serif;background:#1e1f22;color:#dbdee1;margin:0;padding:2rem}\
h1{color:#a78bfa}.grid{display:grid;grid-template-columns:repeat(auto-fit,minmax(12rem,1fr));gap:1rem}\
.card{background:#2b2d31;border-radius:8px;padding:1rem}.value{font-size:2rem;font-weight:bold}\
.offline{color:#f23f43}footer{margin-top:2rem;opacity:.6}";

/// Escapes text for use inside html elements and attributes.
#[must_use]
pub fn escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

fn page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <meta http-equiv=\"refresh\" content=\"30\">\n<title>{title}</title>\n\
         <style>{STYLE}</style>\n</head>\n<body>\n{body}\n</body>\n</html>\n"
    )
}

#[must_use]
pub fn stats_page(stats: &BotStats) -> String {
    let cards = [
        ("Servers", format_count(stats.guilds as u64)),
        ("Users", format_count(stats.users as u64)),
        ("Commands run", format_count(stats.commands_run)),
        ("Configured servers", format_count(stats.cached_guilds as u64)),
        ("Uptime", stats.uptime()),
    ];

    let mut body = String::from("<h1>Nyx</h1>\n<div class=\"grid\">\n");
    for (label, value) in cards {
        let _ = writeln!(
            body,
            "<div class=\"card\"><div>{label}</div><div class=\"value\">{value}</div></div>"
        );
    }
    body.push_str("</div>\n");
    let _ = write!(body, "<footer>Version {}</footer>", escape(&stats.version));

    page("Nyx dashboard", &body)
}

#[must_use]
pub fn offline_page() -> String {
    page(
        "Nyx dashboard",
        "<h1>Nyx</h1>\n<p class=\"offline\">The bot is offline or unreachable. This page retries every 30 seconds.</p>",
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats() -> BotStats {
        BotStats {
            guilds: 1200,
            users: 1_234_567,
            commands_run: 42,
            cached_guilds: 800,
            uptime_secs: 90_061,
            version: "0.4.0<script>".to_owned(),
        }
    }

    #[test]
    fn escapes_markup() {
        assert_eq!(escape("<a href=\"x\">&'"), "&lt;a href=&quot;x&quot;&gt;&amp;&#39;");
        assert_eq!(escape("plain"), "plain");
    }

    #[test]
    fn renders_stats() {
        let html = stats_page(&stats());
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("1,200"));
        assert!(html.contains("1,234,567"));
        assert!(html.contains(">42<"));
        assert!(html.contains("1d 1h 1m"));
        assert!(html.contains("0.4.0&lt;script&gt;"));
        assert!(!html.contains("<script>"));
        assert!(!html.contains("class=\"offline\""));
    }

    #[test]
    fn renders_offline() {
        let html = offline_page();
        assert!(html.contains("class=\"offline\""));
        assert!(html.contains("unreachable"));
    }
}
