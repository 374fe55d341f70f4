//! The `render` command.
//!
//! Renders every configured source (config file first, then `--chart`) and
//! writes the aggregate to stdout, either as multi-document YAML or as a JSON
//! array. `--values` files and `--set` overrides apply to every source, on top
//! of each source's own values.
//!
//! ```bash
//! chart-render render --chart ./charts/app --release app \
//!     --values prod.yaml --set replicaCount=3 --set image.tag=1.2.0
//! ```

use anyhow::{Context, Result, bail};
use clap::{Args, ValueEnum};
use serde_json::Value;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use super::SourceArgs;
use crate::config::{RenderConfig, read_values_file};
use crate::core::{Object, RenderContext};
use crate::renderer::Renderer;
use crate::values::{Values, deep_merge, set_path};

/// Output encoding for rendered objects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Multi-document YAML separated by `---`
    #[default]
    Yaml,
    /// A single JSON array
    Json,
}

/// Render charts and print the resulting objects.
#[derive(Args, Debug)]
pub struct RenderCommand {
    #[command(flatten)]
    pub source: SourceArgs,

    /// YAML values file applied to every source (repeatable, later files win)
    #[arg(short = 'f', long = "values")]
    pub values: Vec<PathBuf>,

    /// Set a value as `key.path=value` (repeatable, applied after --values)
    #[arg(long)]
    pub set: Vec<String>,

    /// Namespace exposed to templates as `Release.Namespace`
    #[arg(short, long)]
    pub namespace: Option<String>,

    /// Output encoding
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Yaml)]
    pub output: OutputFormat,

    /// Annotate objects with the chart and file they came from
    #[arg(long)]
    pub source_annotations: bool,

    /// Fail on undefined template variables
    #[arg(long)]
    pub strict: bool,

    /// Tolerate `required` failures, as when linting
    #[arg(long)]
    pub lint: bool,

    /// Abort rendering after this many seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,
}

impl RenderCommand {
    /// Run the command against `config`.
    ///
    /// # Errors
    ///
    /// Fails when no source is configured, when an override cannot be read, or
    /// when any source fails to render.
    pub async fn execute(self, config: &RenderConfig) -> Result<()> {
        let objects = self.render(config).await?;

        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        write_objects(&objects, self.output, &mut out)?;
        out.flush()?;
        Ok(())
    }

    /// Render without printing.
    ///
    /// # Errors
    ///
    /// See [`RenderCommand::execute`].
    pub async fn render(&self, config: &RenderConfig) -> Result<Vec<Object>> {
        let mut sources = config.sources().await?;
        sources.extend(self.source.source());
        if sources.is_empty() {
            bail!(
                "No sources to render: pass --chart and --release, or add [[sources]] to the config file"
            );
        }

        let mut settings = config.settings();
        if let Some(namespace) = &self.namespace {
            settings = settings.with_namespace(namespace.clone());
        }

        let options = config
            .options_builder()
            .settings(settings)
            .source_annotations(self.source_annotations || config.options.source_annotations)
            .strict(self.strict || config.options.strict)
            .lint_mode(self.lint || config.options.lint_mode)
            .build();

        let renderer = Renderer::new(sources, options)?;
        let overrides = self.override_values().await?;

        let ctx = match self.timeout_secs {
            Some(secs) => RenderContext::with_timeout(Duration::from_secs(secs)),
            None => RenderContext::new(),
        };

        let interrupt = ctx.clone();
        let watcher = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupted, cancelling render");
                interrupt.cancel();
            }
        });

        let result = renderer.process(&ctx, &overrides).await;
        watcher.abort();

        let objects = result?;
        tracing::debug!("Rendered {} objects", objects.len());
        Ok(objects)
    }

    async fn override_values(&self) -> Result<Values> {
        let mut merged = Values::new();
        for path in &self.values {
            let file_values = read_values_file(path).await?;
            merged = deep_merge(merged, Some(&file_values));
        }

        for assignment in &self.set {
            let (path, value) = parse_set(assignment)?;
            if !set_path(&mut merged, path, value) {
                bail!("Cannot set {path}: a parent key holds a non-mapping value");
            }
        }

        Ok(merged)
    }
}

/// Split `key.path=value`, parsing the value as a YAML scalar.
///
/// `true`, `3` and `null` keep their types; anything unparseable stays a string.
fn parse_set(assignment: &str) -> Result<(&str, Value)> {
    let (path, raw) = assignment
        .split_once('=')
        .with_context(|| format!("Invalid --set {assignment:?}: expected key.path=value"))?;

    let path = path.trim();
    if path.is_empty() {
        bail!("Invalid --set {assignment:?}: empty key");
    }

    let value = match serde_yaml::from_str::<Value>(raw) {
        Ok(value @ (Value::Bool(_) | Value::Number(_) | Value::Null)) if !raw.is_empty() => value,
        _ => Value::String(raw.to_string()),
    };

    Ok((path, value))
}

/// Encode `objects` in `format`.
fn write_objects(objects: &[Object], format: OutputFormat, out: &mut impl Write) -> Result<()> {
    match format {
        OutputFormat::Yaml => {
            for object in objects {
                writeln!(out, "---")?;
                out.write_all(serde_yaml::to_string(object)?.as_bytes())?;
            }
        }
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, objects)?;
            writeln!(out)?;
        }
    }
    Ok(())
}
