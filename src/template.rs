//! Template interpolation for extraction configs
//!
//! Handles `{{ variable }}` interpolation in configuration values.
//! Three namespaces are available:
//!
//! - `env.NAME` - process environment (secrets, endpoints)
//! - `run.date`, `run.stamp`, `run.timestamp` - values fixed at run start
//! - bare names (e.g. `name`) - extra variables set by the caller

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Regex for matching template variables: {{ variable.path }}
static TEMPLATE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([a-zA-Z_][a-zA-Z0-9_]*(?:\.[a-zA-Z_][a-zA-Z0-9_]*)*)\s*\}\}")
        .expect("template regex is valid")
});

/// Context for template interpolation
#[derive(Debug, Clone, Default)]
pub struct TemplateContext {
    /// Environment variables visible as `env.*`
    env: HashMap<String, String>,
    /// Run values visible as `run.*`
    run: HashMap<String, String>,
    /// Top-level variables
    vars: HashMap<String, String>,
}

impl TemplateContext {
    /// Create a new empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a context that sees the current process environment
    pub fn from_process_env() -> Self {
        Self {
            env: std::env::vars().collect(),
            ..Default::default()
        }
    }

    /// Create a context with an explicit environment
    pub fn with_env(env: HashMap<String, String>) -> Self {
        Self {
            env,
            ..Default::default()
        }
    }

    /// Set the `run.*` values derived from the run start time
    pub fn set_run_time(&mut self, started_at: DateTime<Utc>) -> &mut Self {
        self.run
            .insert("date".into(), started_at.format("%Y-%m-%d").to_string());
        self.run
            .insert("stamp".into(), started_at.format("%Y%m%d_%H%M%S").to_string());
        self.run.insert(
            "timestamp".into(),
            started_at.format("%Y-%m-%dT%H:%M:%S.000Z").to_string(),
        );
        self
    }

    /// Set a top-level variable
    pub fn set_var(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.vars.insert(key.into(), value.into());
        self
    }

    /// Get a value by path (e.g., "env.API_KEY")
    pub fn get(&self, path: &str) -> Option<&str> {
        match path.split_once('.') {
            Some(("env", name)) => self.env.get(name).map(String::as_str),
            Some(("run", name)) => self.run.get(name).map(String::as_str),
            Some(_) => None,
            None => self.vars.get(path).map(String::as_str),
        }
    }
}

/// Render a template string with the given context
///
/// All undefined variables are reported together in one error.
pub fn render(template: &str, ctx: &TemplateContext) -> Result<String> {
    let mut result = template.to_string();
    let mut errors = Vec::new();

    for cap in TEMPLATE_REGEX.captures_iter(template) {
        let (Some(full_match), Some(var_path)) = (cap.get(0), cap.get(1)) else {
            continue;
        };

        match ctx.get(var_path.as_str()) {
            Some(value) => {
                result = result.replace(full_match.as_str(), value);
            }
            None => {
                errors.push(var_path.as_str().to_string());
            }
        }
    }

    if errors.is_empty() {
        Ok(result)
    } else {
        Err(Error::undefined_var(errors.join(", ")))
    }
}

/// Render an optional template, leaving `None` untouched
pub fn render_opt(template: Option<&str>, ctx: &TemplateContext) -> Result<Option<String>> {
    template.map(|t| render(t, ctx)).transpose()
}

/// Render all string values in a JSON value (object keys are left alone)
pub fn render_value(value: &Value, ctx: &TemplateContext) -> Result<Value> {
    match value {
        Value::String(s) if has_templates(s) => Ok(Value::String(render(s, ctx)?)),
        Value::Object(map) => {
            let mut new_map = serde_json::Map::new();
            for (k, v) in map {
                new_map.insert(k.clone(), render_value(v, ctx)?);
            }
            Ok(Value::Object(new_map))
        }
        Value::Array(arr) => {
            let new_arr: Result<Vec<Value>> = arr.iter().map(|v| render_value(v, ctx)).collect();
            Ok(Value::Array(new_arr?))
        }
        _ => Ok(value.clone()),
    }
}

/// Check if a string contains template variables
pub fn has_templates(s: &str) -> bool {
    TEMPLATE_REGEX.is_match(s)
}

/// Extract all variable names from a template
pub fn extract_variables(template: &str) -> Vec<String> {
    TEMPLATE_REGEX
        .captures_iter(template)
        .filter_map(|cap| cap.get(1).map(|m| m.as_str().to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn env(pairs: &[(&str, &str)]) -> TemplateContext {
        TemplateContext::with_env(
            pairs
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
        )
    }

    #[test]
    fn test_env_substitution() {
        let ctx = env(&[("HRMS_API_KEY", "k-123")]);
        assert_eq!(render("{{ env.HRMS_API_KEY }}", &ctx).unwrap(), "k-123");
    }

    #[test]
    fn test_run_values() {
        let mut ctx = TemplateContext::new();
        ctx.set_run_time(Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap());

        let key = render(
            "master/HRMS_{{ run.date }}.parquet|{{ run.stamp }}|{{ run.timestamp }}",
            &ctx,
        )
        .unwrap();
        assert_eq!(
            key,
            "master/HRMS_2024-03-09.parquet|20240309_070501|2024-03-09T07:05:01.000Z"
        );
    }

    #[test]
    fn test_top_level_var() {
        let mut ctx = TemplateContext::new();
        ctx.set_var("name", "employee_master");
        assert_eq!(
            render("logs/{{ name }}.log", &ctx).unwrap(),
            "logs/employee_master.log"
        );
    }

    #[test]
    fn test_undefined_variables_are_all_reported() {
        let ctx = TemplateContext::new();
        let err = render("{{ env.MISSING }}/{{ run.date }}", &ctx).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("env.MISSING"));
        assert!(msg.contains("run.date"));
    }

    #[test]
    fn test_unknown_namespace_is_undefined() {
        let ctx = env(&[("A", "1")]);
        assert!(render("{{ config.A }}", &ctx).is_err());
    }

    #[test]
    fn test_whitespace_in_template() {
        let ctx = env(&[("KEY", "value")]);
        assert_eq!(render("{{env.KEY}}", &ctx).unwrap(), "value");
        assert_eq!(render("{{  env.KEY  }}", &ctx).unwrap(), "value");
    }

    #[test]
    fn test_render_opt() {
        let ctx = env(&[("KEY", "value")]);
        assert_eq!(render_opt(None, &ctx).unwrap(), None);
        assert_eq!(
            render_opt(Some("{{ env.KEY }}"), &ctx).unwrap(),
            Some("value".to_string())
        );
    }

    #[test]
    fn test_render_value_nested_payload() {
        let ctx = env(&[("COMPANY", "ACME")]);
        let payload = serde_json::json!({
            "EmployeeMaster": {"Company": "{{ env.COMPANY }}", "Full": true},
            "tags": ["{{ env.COMPANY }}", 1]
        });

        let rendered = render_value(&payload, &ctx).unwrap();
        assert_eq!(
            rendered,
            serde_json::json!({
                "EmployeeMaster": {"Company": "ACME", "Full": true},
                "tags": ["ACME", 1]
            })
        );
    }

    #[test]
    fn test_has_templates_and_extract() {
        assert!(has_templates("prefix {{ env.X }} suffix"));
        assert!(!has_templates("{ not a template }"));
        assert_eq!(
            extract_variables("{{ env.A }} and {{ run.date }}"),
            vec!["env.A", "run.date"]
        );
    }
}
