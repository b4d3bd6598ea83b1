//! Page templates, compiled into the binary.

use axum::response::Html;
use curavyom_common::CuravyomError;
use minijinja::Environment;
use serde::Serialize;

const SOURCES: &[(&str, &str)] = &[
    ("layout.html",       include_str!("../templates/layout.html")),
    ("nav.html",          include_str!("../templates/nav.html")),
    ("footer.html",       include_str!("../templates/footer.html")),
    ("home.html",         include_str!("../templates/home.html")),
    ("features.html",     include_str!("../templates/features.html")),
    ("architecture.html", include_str!("../templates/architecture.html")),
    ("use_case.html",     include_str!("../templates/use_case.html")),
    ("dashboard.html",    include_str!("../templates/dashboard.html")),
    ("demo.html",         include_str!("../templates/demo.html")),
    ("about.html",        include_str!("../templates/about.html")),
    ("contact.html",      include_str!("../templates/contact.html")),
    ("report.html",       include_str!("../templates/report.html")),
    ("privacy.html",      include_str!("../templates/privacy.html")),
    ("terms.html",        include_str!("../templates/terms.html")),
];

pub struct Templates {
    env: Environment<'static>,
}

impl Templates {
    pub fn new() -> Result<Self, CuravyomError> {
        let mut env = Environment::new();
        for (name, source) in SOURCES {
            env.add_template(name, source)
                .map_err(|e| CuravyomError::Template(format!("{name}: {e}")))?;
        }
        Ok(Self { env })
    }

    pub fn render<S: Serialize>(&self, name: &str, ctx: S) -> Result<Html<String>, CuravyomError> {
        let template = self
            .env
            .get_template(name)
            .map_err(|_| CuravyomError::NotFound(name.to_string()))?;
        template
            .render(ctx)
            .map(Html)
            .map_err(|e| CuravyomError::Template(format!("{name}: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use minijinja::context;

    #[test]
    fn test_all_templates_compile() {
        assert!(Templates::new().is_ok());
    }

    #[test]
    fn test_unknown_template_is_not_found() {
        let templates = Templates::new().unwrap();
        let err = templates.render("missing.html", context! {}).unwrap_err();
        assert!(matches!(err, CuravyomError::NotFound(_)));
    }

    #[test]
    fn test_nav_marks_active_page() {
        let templates = Templates::new().unwrap();
        let Html(html) = templates
            .render("privacy.html", context! { title => "Privacy Policy", active => "privacy" })
            .unwrap();
        assert!(html.contains("<title>Privacy Policy · CuraVyom AI</title>"));
        assert!(html.contains(r#"href="/features""#));
        assert!(html.contains("newsletter-form"));
    }
}
