//! Page handlers. Every page shares the layout with navigation and footer.

use axum::extract::State;
use axum::http::Uri;
use axum::response::Html;
use curavyom_common::activity::DEFAULT_ROSTER;
use curavyom_common::confidence::canned_radar;
use curavyom_common::dashboard::DashboardData;
use curavyom_common::entities::WELCOME_TEXT;
use curavyom_common::{CuravyomError, Result};
use minijinja::context;

use crate::state::SharedState;

pub async fn home(State(state): State<SharedState>) -> Result<Html<String>> {
    state.templates.render("home.html", context! { title => "Agentic Drug Repurposing", active => "home" })
}

pub async fn features(State(state): State<SharedState>) -> Result<Html<String>> {
    state.templates.render("features.html", context! { title => "Features", active => "features" })
}

pub async fn architecture(State(state): State<SharedState>) -> Result<Html<String>> {
    state.templates.render(
        "architecture.html",
        context! { title => "Architecture", active => "architecture", roster => DEFAULT_ROSTER },
    )
}

pub async fn use_case(State(state): State<SharedState>) -> Result<Html<String>> {
    state.templates.render("use_case.html", context! { title => "Use Case", active => "use-case" })
}

pub async fn dashboard(State(state): State<SharedState>) -> Result<Html<String>> {
    let data = DashboardData::canned();
    let total_trials = data.total_trials();
    state.templates.render(
        "dashboard.html",
        context! { title => "Live Dashboard", active => "dashboard", data, total_trials },
    )
}

pub async fn demo(State(state): State<SharedState>) -> Result<Html<String>> {
    state.templates.render(
        "demo.html",
        context! {
            title => "Interactive Demo",
            active => "demo",
            welcome => WELCOME_TEXT,
            roster => DEFAULT_ROSTER,
            radar => canned_radar(),
        },
    )
}

pub async fn about(State(state): State<SharedState>) -> Result<Html<String>> {
    state.templates.render("about.html", context! { title => "About", active => "about" })
}

pub async fn contact(State(state): State<SharedState>) -> Result<Html<String>> {
    state.templates.render("contact.html", context! { title => "Contact", active => "contact" })
}

pub async fn report(State(state): State<SharedState>) -> Result<Html<String>> {
    let data = DashboardData::canned();
    state.templates.render(
        "report.html",
        context! { title => "Intelligence Report", active => "report", indications => data.indications },
    )
}

pub async fn privacy(State(state): State<SharedState>) -> Result<Html<String>> {
    state.templates.render("privacy.html", context! { title => "Privacy Policy", active => "privacy" })
}

pub async fn terms(State(state): State<SharedState>) -> Result<Html<String>> {
    state.templates.render("terms.html", context! { title => "Terms of Service", active => "terms" })
}

pub async fn not_found(uri: Uri) -> CuravyomError {
    CuravyomError::NotFound(uri.path().to_string())
}
