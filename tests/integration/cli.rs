use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use tempfile::TempDir;

use crate::common::fixture_ref;

fn chart_render(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("chart-render").unwrap();
    cmd.current_dir(dir.path()).env_remove("RUST_LOG").env_remove("HELM_NAMESPACE");
    cmd
}

#[test]
fn test_render_chart_as_yaml() {
    let dir = TempDir::new().unwrap();

    chart_render(&dir)
        .args(["render", "--chart", &fixture_ref(), "--release", "web"])
        .assert()
        .success()
        .stdout(predicate::str::contains("kind: CustomResourceDefinition"))
        .stdout(predicate::str::contains("kind: Deployment"))
        .stdout(predicate::str::contains("name: web-simple-app"))
        .stdout(predicate::str::contains("is installed as release").not());
}

#[test]
fn test_render_json_with_overrides() {
    let dir = TempDir::new().unwrap();
    let values = dir.path().join("prod.yaml");
    std::fs::write(&values, "replicaCount: 2\nimage:\n  tag: \"1.26\"\n").unwrap();

    let output = chart_render(&dir)
        .args(["render", "--chart", &fixture_ref(), "--release", "web", "--output", "json"])
        .args(["--values", values.to_str().unwrap(), "--set", "replicaCount=4"])
        .args(["--namespace", "apps", "--source-annotations"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let objects: Vec<Value> = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(objects.len(), 3);

    let deployment = objects.iter().find(|o| o["kind"] == "Deployment").unwrap();
    assert_eq!(deployment["spec"]["replicas"], 4);
    assert_eq!(deployment["metadata"]["namespace"], "apps");
    assert_eq!(
        deployment["spec"]["template"]["spec"]["containers"][0]["image"],
        "nginx:1.26"
    );
    assert_eq!(
        deployment["metadata"]["annotations"]["manifests.k8s-manifests-lib/source.type"],
        "helm"
    );
}

#[test]
fn test_render_from_config_file() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("render.toml"),
        format!(
            "[settings]\nnamespace = \"ops\"\n\n[[sources]]\nchart = {:?}\nrelease = \"cfg\"\n\n[sources.values]\nreplicaCount = 3\n",
            fixture_ref()
        ),
    )
    .unwrap();

    let output = chart_render(&dir).args(["render", "-o", "json"]).output().unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let objects: Vec<Value> = serde_json::from_slice(&output.stdout).unwrap();
    let deployment = objects.iter().find(|o| o["kind"] == "Deployment").unwrap();
    assert_eq!(deployment["metadata"]["name"], "cfg-simple-app");
    assert_eq!(deployment["metadata"]["namespace"], "ops");
    assert_eq!(deployment["spec"]["replicas"], 3);
}

#[test]
fn test_render_missing_chart_fails() {
    let dir = TempDir::new().unwrap();

    chart_render(&dir)
        .args(["render", "--chart", "./no-such-chart", "--release", "web"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("error rendering helm chart ./no-such-chart"))
        .stderr(predicate::str::contains("suggestion"));
}

#[test]
fn test_render_without_sources_fails() {
    let dir = TempDir::new().unwrap();

    chart_render(&dir)
        .arg("render")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No sources to render"));
}

#[test]
fn test_validate_reports_invalid_release() {
    let dir = TempDir::new().unwrap();

    chart_render(&dir)
        .args(["validate", "--chart", "./app", "--release", "Not_Valid"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("✗"))
        .stderr(predicate::str::contains("1 of 1 sources are invalid"));
}

#[test]
fn test_validate_accepts_valid_sources() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("render.toml"),
        "[[sources]]\nchart = \"./missing-but-never-loaded\"\nrelease = \"app\"\n",
    )
    .unwrap();

    chart_render(&dir)
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("1 sources valid"));
}

#[test]
fn test_render_with_huge_timeout() {
    let dir = TempDir::new().unwrap();

    chart_render(&dir)
        .args(["render", "--chart", &fixture_ref(), "--release", "web"])
        .args(["--timeout-secs", &u64::MAX.to_string()])
        .assert()
        .success()
        .stdout(predicate::str::contains("kind: Deployment"));
}
