//! Error handling for the chart renderer
//!
//! This module provides the error taxonomy shared by every component and the
//! user-facing presentation used by the CLI. The system is designed around two
//! principles:
//! 1. **Strongly-typed errors** ([`RenderError`]) so callers can tell validation,
//!    load, render and cancellation failures apart
//! 2. **Source attribution**: every error leaving [`crate::renderer::Renderer::process`]
//!    names the chart and release that failed
//!
//! # Error Categories
//!
//! - **Validation** ([`RenderError::ChartEmpty`], [`RenderError::ReleaseNameEmpty`],
//!   [`RenderError::ReleaseNameTooLong`], [`RenderError::ReleaseNameInvalidFormat`]):
//!   fatal at construction, no renderer is produced
//! - **Load** ([`RenderError::Locate`], [`RenderError::Load`], [`RenderError::Credentials`]):
//!   fatal for one `process` call, retried on the next one
//! - **Render** ([`RenderError::Values`], [`RenderError::Dependencies`],
//!   [`RenderError::Render`], [`RenderError::Decode`])
//! - **Post-processing** ([`RenderError::Filter`], [`RenderError::Transform`])
//! - **Cancellation** ([`RenderError::Cancelled`]), recognisable anywhere in a chain via
//!   [`RenderError::is_cancelled`]
//!
//! Collaborator failures travel as [`BoxError`], so user-supplied providers can
//! return any error type, including `anyhow::Error` via `.into()`.

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// Boxed error returned by pluggable collaborators and user callbacks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Result alias used across the library.
pub type Result<T, E = RenderError> = std::result::Result<T, E>;

/// Why a [`crate::core::RenderContext`] stopped accepting work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelCause {
    /// The context was cancelled explicitly.
    Cancelled,
    /// The context deadline passed.
    DeadlineExceeded,
}

impl fmt::Display for CancelCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cancelled => write!(f, "context canceled"),
            Self::DeadlineExceeded => write!(f, "context deadline exceeded"),
        }
    }
}

impl std::error::Error for CancelCause {}

/// The error type for every chart renderer operation.
///
/// Variants carry the chart reference (and release name where one applies) so a
/// failure can be attributed without inspecting renderer state. The underlying
/// cause is always reachable through [`std::error::Error::source`].
#[derive(Error, Debug)]
pub enum RenderError {
    /// The chart reference is empty or whitespace-only.
    #[error("chart cannot be empty or whitespace-only")]
    ChartEmpty,

    /// The release name is empty or whitespace-only.
    #[error("release name cannot be empty or whitespace-only")]
    ReleaseNameEmpty,

    /// The release name is longer than Kubernetes label constraints allow.
    #[error("release name exceeds maximum length: must not exceed {max} characters (got {actual})")]
    ReleaseNameTooLong {
        /// Maximum accepted length
        max: usize,
        /// Length of the rejected name
        actual: usize,
    },

    /// The release name contains characters outside `[a-z0-9-]` or starts/ends with `-`.
    #[error(
        "release name must consist of lowercase alphanumeric characters or '-', \
         and must start and end with an alphanumeric character (got {name:?})"
    )]
    ReleaseNameInvalidFormat {
        /// The rejected name
        name: String,
    },

    /// Work was skipped because the context was cancelled or timed out.
    #[error("context cancelled {stage}")]
    Cancelled {
        /// Checkpoint at which cancellation was observed
        stage: &'static str,
        /// Cancellation or deadline
        #[source]
        cause: CancelCause,
    },

    /// The chart reference could not be resolved to a local path.
    #[error("unable to locate chart (repo: {repo}, name: {chart}, version: {version})")]
    Locate {
        /// Repository URL, possibly empty
        repo: String,
        /// Chart reference
        chart: String,
        /// Version constraint, possibly empty
        version: String,
        /// Locator failure
        #[source]
        source: BoxError,
    },

    /// The located chart could not be loaded.
    #[error("failed to load chart (repo: {repo}, name: {chart}, version: {version})")]
    Load {
        /// Repository URL, possibly empty
        repo: String,
        /// Chart reference
        chart: String,
        /// Version constraint, possibly empty
        version: String,
        /// Loader failure
        #[source]
        source: BoxError,
    },

    /// The credentials provider failed.
    #[error("failed to get credentials for chart {chart:?} (version: {version})")]
    Credentials {
        /// Chart reference
        chart: String,
        /// Version constraint, possibly empty
        version: String,
        /// Provider failure
        #[source]
        source: BoxError,
    },

    /// The values provider failed.
    #[error("failed to get values for chart {chart:?} (release {release:?})")]
    Values {
        /// Chart reference
        chart: String,
        /// Release name
        release: String,
        /// Provider failure
        #[source]
        source: BoxError,
    },

    /// Dependency processing rejected the chart.
    #[error("failed to process dependencies for chart {chart:?} (release {release:?})")]
    Dependencies {
        /// Chart reference
        chart: String,
        /// Release name
        release: String,
        /// Processor failure
        #[source]
        source: BoxError,
    },

    /// The template engine failed.
    #[error("failed to render chart {chart:?} (release {release:?})")]
    Render {
        /// Chart reference
        chart: String,
        /// Release name
        release: String,
        /// Engine failure
        #[source]
        source: BoxError,
    },

    /// A rendered output or CRD file is not valid structured YAML.
    #[error("failed to decode {file}")]
    Decode {
        /// Output or CRD file name
        file: String,
        /// Decoder failure
        #[source]
        source: BoxError,
    },

    /// A filter failed while deciding whether to keep an object.
    #[error("filter failed on {kind} {name:?}")]
    Filter {
        /// Kind of the object being filtered
        kind: String,
        /// Name of the object being filtered
        name: String,
        /// Filter failure
        #[source]
        source: BoxError,
    },

    /// A transformer failed while rewriting an object.
    #[error("transformer failed on {kind} {name:?}")]
    Transform {
        /// Kind of the object being transformed
        kind: String,
        /// Name of the object being transformed
        name: String,
        /// Transformer failure
        #[source]
        source: BoxError,
    },

    /// Rendering one configured source failed.
    #[error("error rendering helm chart {chart} (release: {release})")]
    Source {
        /// Chart reference of the failing source
        chart: String,
        /// Release name of the failing source
        release: String,
        /// Underlying failure
        #[source]
        source: Box<RenderError>,
    },

    /// Filters or transformers failed on one source's objects.
    #[error("error applying filters/transformers to helm chart {chart} (release: {release})")]
    Pipeline {
        /// Chart reference of the failing source
        chart: String,
        /// Release name of the failing source
        release: String,
        /// Underlying failure
        #[source]
        source: Box<RenderError>,
    },

    /// Configuration could not be read or is inconsistent.
    #[error("configuration error: {message}")]
    Config {
        /// Description of the problem
        message: String,
    },

    /// Filesystem access failed.
    #[error("I/O error on {path}")]
    Io {
        /// Path being accessed
        path: String,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },
}

impl RenderError {
    /// Returns the cancellation cause if this error, or anything it wraps,
    /// stems from a cancelled or expired context.
    #[must_use]
    pub fn cancel_cause(&self) -> Option<CancelCause> {
        let mut current: Option<&(dyn std::error::Error + 'static)> = Some(self);
        while let Some(err) = current {
            if let Some(cause) = err.downcast_ref::<CancelCause>() {
                return Some(*cause);
            }
            current = err.source();
        }
        None
    }

    /// Whether this error chain contains a cancellation.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel_cause().is_some()
    }

    /// Whether this is a construction-time validation failure.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::ChartEmpty
                | Self::ReleaseNameEmpty
                | Self::ReleaseNameTooLong { .. }
                | Self::ReleaseNameInvalidFormat { .. }
        )
    }

    /// The innermost [`RenderError`] in the chain, skipping source/pipeline wrappers.
    #[must_use]
    pub fn root(&self) -> &RenderError {
        match self {
            Self::Source { source, .. } | Self::Pipeline { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Error wrapper with user-friendly suggestions for CLI display
///
/// Combines a fully rendered error chain with optional details and a suggested
/// remedy. Displayed in color on terminals through [`ErrorContext::display`].
#[derive(Debug)]
pub struct ErrorContext {
    /// The error chain, outermost first
    pub message: String,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new context from an already formatted error message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add details explaining the error.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print the error to stderr: error in red, details in yellow, suggestion in green.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.message);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error into an [`ErrorContext`] with an actionable suggestion.
///
/// Recognises [`RenderError`] anywhere in the chain and picks a suggestion from
/// its innermost variant; everything else is shown as-is.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    let context = ErrorContext::new(format!("{error:#}"));

    let Some(render_error) = error.chain().find_map(|e| e.downcast_ref::<RenderError>()) else {
        return context;
    };

    match render_error.root() {
        RenderError::ChartEmpty => {
            context.with_suggestion("Set `chart` to a local path, repo/chart name or oci:// reference")
        }
        RenderError::ReleaseNameEmpty
        | RenderError::ReleaseNameTooLong { .. }
        | RenderError::ReleaseNameInvalidFormat { .. } => context
            .with_suggestion("Use a release name like `my-app`: lowercase letters, digits and '-'")
            .with_details("Release names are used in Kubernetes labels and are limited to 53 characters"),
        RenderError::Locate { .. } => context
            .with_suggestion("Check the chart path, or pull remote charts into the repository cache first")
            .with_details("Remote registries (oci://, https://) are not fetched by this tool"),
        RenderError::Load { .. } => {
            context.with_suggestion("Check that Chart.yaml and values.yaml are valid YAML")
        }
        RenderError::Render { .. } => context.with_suggestion(
            "Re-run with --lint to tolerate missing required values, or fix the template",
        ),
        RenderError::Decode { .. } => {
            context.with_suggestion("Templates must render to YAML mappings (one object per document)")
        }
        RenderError::Cancelled { .. } => {
            context.with_suggestion("Increase --timeout-secs or remove it")
        }
        _ => context,
    }
}
