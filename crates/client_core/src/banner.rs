use std::time::Duration;

use crate::settings::BannerCopy;

pub const BANNER_ID: &str = "cookie-banner";
pub const ACCEPT_ID: &str = "cb-accept";
pub const DECLINE_ID: &str = "cb-decline";
pub const VISIBLE_CLASS: &str = "visible";

/// Stylesheet for the banner. Off-screen until [`VISIBLE_CLASS`] is applied.
pub fn banner_css(transition: Duration) -> String {
    let ms = transition.as_millis();
    format!(
        r#"
#{BANNER_ID} {{
    position: fixed;
    bottom: 20px;
    left: 20px;
    right: 20px;
    max-width: 600px;
    margin: 0 auto;
    background: rgba(17, 25, 40, 0.85);
    backdrop-filter: blur(16px);
    -webkit-backdrop-filter: blur(16px);
    border: 1px solid rgba(255, 255, 255, 0.1);
    border-radius: 16px;
    padding: 20px;
    display: flex;
    flex-direction: column;
    gap: 16px;
    z-index: 9999;
    box-shadow: 0 20px 50px rgba(0, 0, 0, 0.5);
    transform: translateY(150%);
    transition: transform {ms}ms cubic-bezier(0.19, 1, 0.22, 1);
    font-family: 'Plus Jakarta Sans', system-ui, sans-serif;
}}

#{BANNER_ID}.{VISIBLE_CLASS} {{
    transform: translateY(0);
}}

.cb-content {{
    color: #e2e8f0;
    font-size: 0.9rem;
    line-height: 1.5;
}}

.cb-title {{
    font-weight: 600;
    color: white;
    margin-bottom: 4px;
    font-size: 1rem;
}}

.cb-note {{
    font-size: 0.8rem;
    margin-top: 4px;
    opacity: 0.7;
}}

.cb-actions {{
    display: flex;
    gap: 12px;
    justify-content: flex-end;
}}

.cb-btn {{
    padding: 8px 20px;
    border-radius: 99px;
    font-size: 0.875rem;
    font-weight: 600;
    cursor: pointer;
    transition: all 0.2s ease;
}}

.cb-btn-accept {{
    background-color: #FFB000;
    color: #003A87;
    border: none;
}}

.cb-btn-accept:hover {{
    background-color: #e69f00;
    transform: translateY(-1px);
}}

.cb-btn-decline {{
    background-color: transparent;
    color: #94a3b8;
    border: 1px solid rgba(255, 255, 255, 0.1);
}}

.cb-btn-decline:hover {{
    background-color: rgba(255, 255, 255, 0.05);
    color: white;
}}

@media (min-width: 640px) {{
    #{BANNER_ID} {{
        flex-direction: row;
        align-items: center;
        justify-content: space-between;
    }}
    .cb-actions {{
        flex-shrink: 0;
    }}
}}
"#
    )
}

/// Inner markup of the banner element: the copy plus the two action buttons.
pub fn banner_markup(copy: &BannerCopy) -> String {
    let note = if copy.note.is_empty() {
        String::new()
    } else {
        format!(
            r#"<div class="cb-content cb-note">{}</div>"#,
            escape_html(&copy.note)
        )
    };

    format!(
        r#"<div class="cb-text"><div class="cb-title">{title}</div><div class="cb-content">{body}</div>{note}</div><div class="cb-actions"><button id="{DECLINE_ID}" class="cb-btn cb-btn-decline">{decline}</button><button id="{ACCEPT_ID}" class="cb-btn cb-btn-accept">{accept}</button></div>"#,
        title = escape_html(&copy.title),
        body = copy.body_html,
        decline = escape_html(&copy.decline_label),
        accept = escape_html(&copy.accept_label),
    )
}

pub fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
