//! Guarded dashboard shell.
//!
//! The navigation and action elements are declared once with the
//! capabilities that unlock them; every render runs them through a
//! [`Guard`] against the current session snapshot.

use axum::{
    extract::State,
    response::{Html, IntoResponse, Redirect, Response},
};
use cms_core::{
    Capability, Guard, GuardBehavior, GuardOutcome, Guardable, Requirement, SessionState,
};
use std::sync::Arc;

use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Link { href: &'static str },
    Button { action: &'static str },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Element {
    pub label: &'static str,
    pub kind: ElementKind,
}

impl Guardable for Element {
    // Links have no disabled state.
    fn supports_disabled(&self) -> bool {
        matches!(self.kind, ElementKind::Button { .. })
    }
}

/// An element together with its guard settings.
#[derive(Debug, Clone)]
pub struct GuardedElement {
    pub element: Element,
    pub requirement: Requirement,
    pub behavior: GuardBehavior,
}

impl GuardedElement {
    fn link(label: &'static str, href: &'static str, requirement: impl Into<Requirement>) -> Self {
        Self {
            element: Element {
                label,
                kind: ElementKind::Link { href },
            },
            requirement: requirement.into(),
            behavior: GuardBehavior::Hide,
        }
    }

    fn button(
        label: &'static str,
        action: &'static str,
        requirement: impl Into<Requirement>,
        behavior: GuardBehavior,
    ) -> Self {
        Self {
            element: Element {
                label,
                kind: ElementKind::Button { action },
            },
            requirement: requirement.into(),
            behavior,
        }
    }

    pub fn evaluate(&self, state: &SessionState) -> GuardOutcome<Element> {
        Guard::new(self.requirement.clone())
            .behavior(self.behavior)
            .evaluate_state(self.element, state)
    }
}

pub fn navigation() -> Vec<GuardedElement> {
    vec![
        GuardedElement::link(
            "Overview",
            "/",
            [Capability::ContentView, Capability::AnalyticsView],
        ),
        GuardedElement::link("Users", "/users", Capability::UsersView),
        GuardedElement::link("Roles", "/roles", Capability::RolesView),
        GuardedElement::link("Content", "/content", Capability::ContentView),
        GuardedElement::link("Media", "/media", Capability::MediaView),
        GuardedElement::link("SEO", "/seo", Capability::SeoManage),
        GuardedElement::link("Analytics", "/analytics", Capability::AnalyticsView),
        GuardedElement::link("Audit log", "/audit", Capability::AuditView),
        GuardedElement::link("Settings", "/settings", Capability::SettingsEdit),
    ]
}

pub fn actions() -> Vec<GuardedElement> {
    vec![
        GuardedElement::button(
            "New user",
            "users.create",
            Capability::UsersCreate,
            GuardBehavior::Lock,
        ),
        GuardedElement::button(
            "New role",
            "roles.create",
            Capability::RolesCreate,
            GuardBehavior::Lock,
        ),
        GuardedElement::button(
            "Upload media",
            "media.upload",
            Capability::MediaUpload,
            GuardBehavior::Disable,
        ),
        GuardedElement::button(
            "Edit settings",
            "settings.edit",
            Capability::SettingsEdit,
            GuardBehavior::Disable,
        ),
    ]
}

fn escape(text: &str) -> String {
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

fn render_element(element: &Element, restriction: Option<&str>) -> String {
    let label = escape(element.label);
    match (element.kind, restriction) {
        (ElementKind::Link { href }, _) => format!("<a href=\"{}\">{}</a>", escape(href), label),
        (ElementKind::Button { action }, None) => format!(
            "<button type=\"button\" data-action=\"{}\">{}</button>",
            escape(action),
            label
        ),
        (ElementKind::Button { action }, Some(title)) => format!(
            "<button type=\"button\" data-action=\"{}\" disabled title=\"{}\">{}</button>",
            escape(action),
            escape(title),
            label
        ),
    }
}

/// Renders a guard outcome. A hidden element without fallback renders as an
/// empty string.
pub fn render_outcome(outcome: &GuardOutcome<Element>) -> String {
    match outcome {
        GuardOutcome::Render(element) => render_element(element, None),
        GuardOutcome::Fallback(Some(fallback)) => render_element(fallback, None),
        GuardOutcome::Fallback(None) => String::new(),
        GuardOutcome::Disabled { element, title } => render_element(element, Some(title)),
        GuardOutcome::Locked { element, title } => format!(
            "<span class=\"guard-locked\">{}<span class=\"lock-indicator\" aria-hidden=\"true\">&#128274;</span></span>",
            render_element(element, Some(title))
        ),
    }
}

fn render_items(items: &[GuardedElement], state: &SessionState) -> Vec<String> {
    items
        .iter()
        .map(|item| render_outcome(&item.evaluate(state)))
        .filter(|html| !html.is_empty())
        .collect()
}

pub fn render_dashboard(state: &SessionState, login_path: &str) -> String {
    let role = state
        .session()
        .and_then(|s| s.role_name.as_deref())
        .unwrap_or("");

    let nav: String = render_items(&navigation(), state)
        .into_iter()
        .map(|html| format!("<li>{}</li>", html))
        .collect();
    let actions = render_items(&actions(), state).join("\n");

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8" />
    <title>CMS Admin</title>
    <style>
        .guard-locked {{ position: relative; opacity: 0.6; }}
        .lock-indicator {{ margin-left: 4px; }}
    </style>
</head>
<body>
    <header><h1>CMS Admin</h1><span id="role">{role}</span></header>
    <nav><ul>{nav}</ul></nav>
    <section id="actions">
{actions}
    </section>
    <form method="post" action="/logout"><button type="submit">Log out</button></form>
    <script>
        const revocations = new EventSource("/events");
        revocations.addEventListener("revoked", (event) => {{
            const notice = JSON.parse(event.data);
            window.location.assign(notice.redirect || "{login}");
        }});
    </script>
</body>
</html>"#,
        role = escape(role),
        nav = nav,
        actions = actions,
        login = escape(login_path),
    )
}

pub async fn index_handler(State(state): State<Arc<AppState>>) -> Response {
    let snapshot = state.session.snapshot();
    if snapshot.is_signed_out() {
        return Redirect::to(state.login_path()).into_response();
    }
    Html(render_dashboard(&snapshot, state.login_path())).into_response()
}

pub async fn login_handler() -> Html<&'static str> {
    Html(
        r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="UTF-8" /><title>CMS Admin - Sign in</title></head>
<body>
<h1>Signed out</h1>
<p>Your session has ended. Store a new API token, then reload the dashboard:</p>
<pre><code>cms_cli login --token &lt;token&gt;</code></pre>
<p>The server must share the CLI's <code>credentials_path</code>, or be restarted with <code>CMS_API_TOKEN</code> set.</p>
<p><a href="/">Back to the dashboard</a></p>
</body>
</html>"#,
    )
}
