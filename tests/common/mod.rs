//! Shared helpers for the integration suite.

#![allow(dead_code)]

use std::path::PathBuf;

use chart_render::core::Object;
use chart_render::renderer::Source;

/// Absolute path of the checked-in `simple-app` chart.
pub fn fixture_chart() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/charts/simple-app")
}

/// Chart reference string for the fixture chart.
pub fn fixture_ref() -> String {
    fixture_chart().display().to_string()
}

/// A source rendering the fixture chart as `release`.
pub fn fixture_source(release: &str) -> Source {
    Source::new(fixture_ref(), release)
}

/// Kinds of `objects`, in order.
pub fn kinds(objects: &[Object]) -> Vec<&str> {
    objects.iter().map(Object::kind).collect()
}

/// The first object of `kind`.
pub fn find<'a>(objects: &'a [Object], kind: &str) -> &'a Object {
    objects
        .iter()
        .find(|o| o.kind() == kind)
        .unwrap_or_else(|| panic!("no {kind} in {:?}", kinds(objects)))
}
