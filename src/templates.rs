//! Template loading and rendering using Tera.
//!
//! Digest emails are rendered from templates. Files in a configured
//! templates directory override the embedded defaults by name.

use crate::error::{Error, Result};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;
use tera::{Context, Tera};

/// Embedded default templates for fallback when files don't exist.
static EMBEDDED_TEMPLATES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert("digest/subject.tera", include_str!("../templates/digest/subject.tera"));
    m.insert("digest/email.tera", include_str!("../templates/digest/email.tera"));
    m
});

/// Global template engine with caching.
static TERA: Lazy<RwLock<Option<Tera>>> = Lazy::new(|| RwLock::new(None));

/// Initialize the template engine.
///
/// Loads every `*.tera` file under `templates_dir` when it exists, then adds
/// any embedded template the directory did not provide.
///
/// # Errors
///
/// Returns an error if the directory contains invalid templates.
pub fn init_templates(templates_dir: Option<&Path>) -> Result<()> {
    let mut tera = Tera::default();

    if let Some(dir) = templates_dir.filter(|dir| dir.exists()) {
        let glob_pattern = format!("{}/**/*.tera", dir.display());
        tera = Tera::new(&glob_pattern).map_err(|e| {
            Error::Template(format!("Failed to load templates from {}: {e}", dir.display()))
        })?;
        tracing::debug!(dir = %dir.display(), "loaded template overrides");
    }

    for (name, content) in EMBEDDED_TEMPLATES.iter() {
        if tera.get_template(name).is_err() {
            tera.add_raw_template(name, content)
                .map_err(|e| Error::Template(format!("Embedded template {name} is invalid: {e}")))?;
        }
    }

    *TERA.write().map_err(|e| Error::Template(e.to_string()))? = Some(tera);

    Ok(())
}

/// Render a template with the given context.
///
/// Falls back to the embedded templates if [`init_templates`] was never called.
///
/// # Errors
///
/// Returns an error if the template doesn't exist or rendering fails.
pub fn render(name: &str, context: &Context) -> Result<String> {
    let needs_init = TERA.read().map_err(|e| Error::Template(e.to_string()))?.is_none();

    if needs_init {
        init_templates(None)?;
    }

    let guard = TERA.read().map_err(|e| Error::Template(e.to_string()))?;
    let tera = guard.as_ref().ok_or_else(|| Error::Template("Templates not initialized".into()))?;
    let rendered = tera
        .render(name, context)
        .map_err(|e| Error::Template(format!("Failed to render template {name}: {e}")))?;
    drop(guard);

    Ok(rendered)
}

/// Reset the template cache, forcing re-initialization on next use.
///
/// # Errors
///
/// Returns an error if the write lock cannot be acquired.
pub fn reset_cache() -> Result<()> {
    *TERA.write().map_err(|e| Error::Template(e.to_string()))? = None;
    Ok(())
}

/// Get the list of all embedded template names.
#[must_use]
pub fn embedded_template_names() -> Vec<&'static str> {
    EMBEDDED_TEMPLATES.keys().copied().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn sample_context() -> Context {
        let mut ctx = Context::new();
        ctx.insert("username", "bruce_wayne");
        ctx.insert("first_name", "Bruce");
        ctx.insert("date", "2024-03-05");
        ctx.insert("hour", &8_u8);
        ctx.insert("open_count", &1_usize);
        ctx.insert("completed_count", &1_usize);
        ctx.insert(
            "groups",
            &json!([
                {"label": "Pending", "tasks": [{"priority": 1, "title": "PATROL", "completed": false}]},
                {"label": "In progress", "tasks": []},
                {"label": "Completed", "tasks": [{"priority": 2, "title": "REST", "completed": true}]}
            ]),
        );
        ctx
    }

    #[test]
    #[serial_test::serial]
    fn test_all_embedded_templates_render() {
        reset_cache().unwrap();
        init_templates(Some(Path::new("/nonexistent"))).unwrap();

        for name in embedded_template_names() {
            render(name, &sample_context()).unwrap();
        }
    }

    #[test]
    #[serial_test::serial]
    fn test_email_body_lists_groups() {
        reset_cache().unwrap();

        let body = render("digest/email.tera", &sample_context()).unwrap();
        assert!(body.contains("Hello Bruce,"));
        assert!(body.contains("Pending (1)"));
        assert!(body.contains("1. PATROL"));
        assert!(body.contains("In progress (0)"));
        assert!(body.contains("(none)"));
        assert!(body.contains("2. REST [done]"));
        assert!(body.contains("8:00"));
    }

    #[test]
    #[serial_test::serial]
    fn test_filesystem_templates_override_embedded() {
        reset_cache().unwrap();

        let dir = TempDir::new().unwrap();
        let template_dir = dir.path().join("digest");
        fs::create_dir_all(&template_dir).unwrap();
        fs::write(template_dir.join("subject.tera"), "CUSTOM: {{ username }}").unwrap();

        init_templates(Some(dir.path())).unwrap();

        let subject = render("digest/subject.tera", &sample_context()).unwrap();
        assert_eq!(subject, "CUSTOM: bruce_wayne");
        // Templates the directory lacks still come from the embedded set
        assert!(render("digest/email.tera", &sample_context()).is_ok());

        reset_cache().unwrap();
    }

    #[test]
    #[serial_test::serial]
    fn test_render_missing_template_fails() {
        reset_cache().unwrap();
        init_templates(None).unwrap();

        let result = render("nonexistent/template.tera", &Context::new());
        assert!(result.is_err());
    }

    #[test]
    #[serial_test::serial]
    fn test_init_with_invalid_templates_fails() {
        reset_cache().unwrap();

        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("invalid.tera"), "{% if foo %}unclosed if tag without endif")
            .unwrap();

        let err = init_templates(Some(dir.path())).unwrap_err().to_string();
        assert!(err.contains("Failed to load templates"), "Error was: {err}");
    }

    #[test]
    fn test_embedded_template_count() {
        assert_eq!(embedded_template_names().len(), 2);
    }
}
