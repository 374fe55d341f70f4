//! Global constants used throughout the chart renderer.
//!
//! This module contains validation limits, cache defaults, and the
//! annotation keys written onto rendered objects. Defining them
//! centrally keeps magic values discoverable.

use std::time::Duration;

/// Renderer type identifier reported by [`crate::renderer::Renderer::name`]
/// and written into source-tracking annotations.
pub const RENDERER_TYPE: &str = "helm";

/// Maximum allowed length for a release name.
///
/// Release names end up in Kubernetes label values, which are limited to
/// 63 characters; Helm reserves room for suffixes and caps names at 53.
pub const MAX_RELEASE_NAME_LENGTH: usize = 53;

/// Pattern a release name must match.
///
/// Lowercase alphanumerics, hyphens allowed only in the middle.
pub const RELEASE_NAME_PATTERN: &str = r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?$";

/// Default time-to-live for cached render results (5 minutes).
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

/// Annotation recording which renderer produced an object.
pub const ANNOTATION_SOURCE_TYPE: &str = "manifests.k8s-manifests-lib/source.type";

/// Annotation recording the chart reference an object was rendered from.
pub const ANNOTATION_SOURCE_PATH: &str = "manifests.k8s-manifests-lib/source.path";

/// Annotation recording the template or CRD file an object came from.
pub const ANNOTATION_SOURCE_FILE: &str = "manifests.k8s-manifests-lib/source.file";

/// Namespace used when neither settings nor the environment name one.
pub const DEFAULT_NAMESPACE: &str = "default";

/// Release service reported to templates as `Release.Service`.
pub const RELEASE_SERVICE: &str = "Helm";

/// Upper bound on undefined-variable recovery passes in non-strict rendering.
///
/// Each pass injects one missing variable as null; a template referencing
/// more distinct undefined paths than this fails instead of looping.
pub const MAX_UNDEFINED_RECOVERY_PASSES: usize = 64;

/// Default configuration file read by the CLI.
pub const DEFAULT_CONFIG_FILE: &str = "render.toml";
