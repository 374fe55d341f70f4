//! Tera-backed [`TemplateEngine`].

use regex::Regex;
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;
use tera::{Context as TeraContext, Tera};

use super::{
    EngineOptions, ReleaseInfo, RenderValues, RenderedOutputs, TemplateEngine, TemplateError,
    available_paths, find_similar_variables,
};
use crate::chart::Chart;
use crate::constants::MAX_UNDEFINED_RECOVERY_PASSES;
use crate::core::BoxError;
use crate::values::{Values, deep_merge};

static MISSING_VARIABLE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Variable `([^`]+)` not found").expect("missing variable pattern is valid")
});

/// Default template engine built on Tera.
///
/// A fresh `Tera` instance is built per chart and render, so the engine holds
/// no state and is trivially shareable.
///
/// # Filters
///
/// Besides Tera's built-ins:
/// - `required(msg="...")` fails on null or empty input (tolerated in lint mode)
/// - `to_yaml` serializes a value as YAML
/// - `indent(width=N)` / `nindent(width=N)` indent every line, `nindent` adding a leading newline
///
/// # Undefined Variables
///
/// In strict mode an undefined variable fails the render. Otherwise it renders
/// empty: the engine injects a null at the missing path and retries.
#[derive(Debug, Clone, Copy, Default)]
pub struct TeraEngine;

impl TemplateEngine for TeraEngine {
    fn render(
        &self,
        chart: &Chart,
        values: &RenderValues,
        options: EngineOptions,
    ) -> Result<RenderedOutputs, BoxError> {
        let mut outputs = RenderedOutputs::new();
        render_chart(chart, &values.values, &values.release, options, &mut outputs)?;
        tracing::debug!("Rendered {} outputs for chart {}", outputs.len(), chart.name());
        Ok(outputs)
    }
}

fn render_chart(
    chart: &Chart,
    scope: &Values,
    release: &ReleaseInfo,
    options: EngineOptions,
    outputs: &mut RenderedOutputs,
) -> Result<(), TemplateError> {
    let mut tera = Tera::default();
    tera.autoescape_on(Vec::new());
    tera.register_filter("required", required_filter(options.lint_mode));
    tera.register_filter("to_yaml", to_yaml_filter);
    tera.register_filter("indent", indent_filter);
    tera.register_filter("nindent", nindent_filter);
    tera.add_raw_templates(chart.templates.iter().map(|t| (t.name.as_str(), t.data.as_str())))
        .map_err(|e| TemplateError::Syntax {
            chart: chart.full_path.clone(),
            message: format_tera_error(&e),
        })?;

    let release_value = serde_json::to_value(release).map_err(|e| TemplateError::Render {
        template: chart.full_path.clone(),
        message: e.to_string(),
    })?;

    let mut root = Map::new();
    root.insert("Values".into(), Value::Object(scope.clone()));
    root.insert("Release".into(), release_value);
    root.insert("Chart".into(), chart_context(chart));

    for template in chart.templates.iter().filter(|t| !is_partial(&t.name)) {
        let output_name = format!("{}/{}", chart.full_path, template.name);
        let mut context = root.clone();
        let mut template_info = Map::new();
        template_info.insert("Name".into(), Value::String(output_name.clone()));
        template_info.insert("BasePath".into(), Value::String(format!("{}/templates", chart.full_path)));
        context.insert("Template".into(), Value::Object(template_info));

        let rendered = render_template(&tera, &template.name, &output_name, context, options)?;
        outputs.insert(output_name, rendered);
    }

    for sub in &chart.dependencies {
        let sub_scope = subchart_scope(scope, sub);
        render_chart(sub, &sub_scope, release, options, outputs)?;
    }

    Ok(())
}

/// Values seen by a sub-chart: its defaults, then `parent[<name>]`, with the parent's globals.
fn subchart_scope(parent: &Values, sub: &Chart) -> Values {
    let mut scope = deep_merge(sub.values.clone(), parent.get(sub.name()).and_then(Value::as_object));

    if let Some(parent_global) = parent.get("global").and_then(Value::as_object) {
        let own_global = match scope.remove("global") {
            Some(Value::Object(map)) => map,
            _ => Values::new(),
        };
        scope.insert("global".into(), Value::Object(deep_merge(own_global, Some(parent_global))));
    }

    scope
}

fn chart_context(chart: &Chart) -> Value {
    let metadata = &chart.metadata;
    let mut info = Map::new();
    info.insert("Name".into(), Value::String(metadata.name.clone()));
    info.insert("Version".into(), Value::String(metadata.version.clone()));
    info.insert(
        "AppVersion".into(),
        metadata.app_version.clone().map(Value::String).unwrap_or(Value::Null),
    );
    info.insert(
        "Description".into(),
        metadata.description.clone().map(Value::String).unwrap_or(Value::Null),
    );
    Value::Object(info)
}

fn is_partial(name: &str) -> bool {
    name.rsplit('/').next().is_some_and(|file| file.starts_with('_'))
}

fn render_template(
    tera: &Tera,
    name: &str,
    output_name: &str,
    mut context: Map<String, Value>,
    options: EngineOptions,
) -> Result<String, TemplateError> {
    let mut injected = HashSet::new();

    for _ in 0..=MAX_UNDEFINED_RECOVERY_PASSES {
        let tera_context =
            TeraContext::from_value(Value::Object(context.clone())).map_err(|e| {
                TemplateError::Render {
                    template: output_name.to_string(),
                    message: format_tera_error(&e),
                }
            })?;

        let error = match tera.render(name, &tera_context) {
            Ok(rendered) => return Ok(rendered),
            Err(e) => e,
        };

        let Some(variable) = missing_variable(&error) else {
            return Err(TemplateError::Render {
                template: output_name.to_string(),
                message: format_tera_error(&error),
            });
        };

        if !options.strict && injected.insert(variable.clone()) && inject_null(&mut context, &variable) {
            tracing::debug!("Rendering undefined variable {} in {} as empty", variable, output_name);
            continue;
        }

        let mut paths = Vec::new();
        available_paths(&context, "", 4, &mut paths);
        return Err(TemplateError::VariableNotFound {
            template: output_name.to_string(),
            suggestions: find_similar_variables(&variable, &paths),
            variable,
        });
    }

    Err(TemplateError::Render {
        template: output_name.to_string(),
        message: format!(
            "more than {MAX_UNDEFINED_RECOVERY_PASSES} undefined variables; re-run in strict mode to see them"
        ),
    })
}

/// Extract the variable name from a "Variable `foo` not found" anywhere in the chain.
fn missing_variable(error: &tera::Error) -> Option<String> {
    use std::error::Error;

    let mut current: Option<&dyn Error> = Some(error);
    while let Some(err) = current {
        if let Some(caps) = MISSING_VARIABLE_REGEX.captures(&err.to_string()) {
            return caps.get(1).map(|m| m.as_str().to_string());
        }
        current = err.source();
    }
    None
}

/// Insert a null at a dotted path so the next pass sees the variable as defined.
///
/// Returns `false` when the path cannot be represented (indexing, or a
/// non-map value in the way), in which case retrying cannot help.
fn inject_null(context: &mut Map<String, Value>, path: &str) -> bool {
    let segments: Vec<&str> = path.split('.').collect();
    let is_identifier =
        |s: &&str| !s.is_empty() && s.chars().all(|c| c.is_alphanumeric() || c == '_');
    if !segments.iter().all(is_identifier) {
        return false;
    }
    let Some((last, parents)) = segments.split_last() else {
        return false;
    };

    let mut current = context;
    for segment in parents {
        let entry = current.entry(segment.to_string()).or_insert(Value::Null);
        if entry.is_null() {
            *entry = Value::Object(Map::new());
        }
        match entry {
            Value::Object(map) => current = map,
            _ => return false,
        }
    }

    if current.contains_key(*last) {
        return false;
    }
    current.insert((*last).to_string(), Value::Null);
    true
}

/// Flatten a Tera error chain into one message.
fn format_tera_error(error: &tera::Error) -> String {
    use std::error::Error;

    let mut messages = Vec::new();
    let mut current: Option<&dyn Error> = Some(error);
    while let Some(err) = current {
        let message = err.to_string();
        let message = message.trim();
        if !message.is_empty() && !messages.iter().any(|m: &String| m == message) {
            messages.push(message.to_string());
        }
        current = err.source();
    }

    if messages.is_empty() {
        "unknown template error".to_string()
    } else {
        messages.join(": ")
    }
}

fn required_filter(lint_mode: bool) -> impl tera::Filter + 'static {
    move |value: &Value, args: &HashMap<String, Value>| -> tera::Result<Value> {
        let missing = match value {
            Value::Null => true,
            Value::String(s) => s.is_empty(),
            _ => false,
        };
        if !missing {
            return Ok(value.clone());
        }

        let message = args.get("msg").and_then(Value::as_str).unwrap_or("a required value is missing");
        if lint_mode {
            tracing::warn!("Ignoring missing required value in lint mode: {}", message);
            return Ok(Value::String(String::new()));
        }
        Err(tera::Error::msg(message))
    }
}

fn to_yaml_filter(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
    let yaml = serde_yaml::to_string(value).map_err(|e| tera::Error::msg(format!("to_yaml: {e}")))?;
    Ok(Value::String(yaml.trim_end().to_string()))
}

fn indent_lines(value: &Value, args: &HashMap<String, Value>) -> tera::Result<String> {
    let text = match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    };
    let width = args.get("width").and_then(Value::as_u64).unwrap_or(0);
    let pad = " ".repeat(usize::try_from(width).map_err(|e| tera::Error::msg(e.to_string()))?);
    Ok(text.lines().map(|line| format!("{pad}{line}")).collect::<Vec<_>>().join("\n"))
}

fn indent_filter(value: &Value, args: &HashMap<String, Value>) -> tera::Result<Value> {
    indent_lines(value, args).map(Value::String)
}

fn nindent_filter(value: &Value, args: &HashMap<String, Value>) -> tera::Result<Value> {
    indent_lines(value, args).map(|s| Value::String(format!("\n{s}")))
}
