//! End-to-end tests for the `mirror-hook resolve` command.
//!
//! `resolve` never runs git, so these tests only need a registry file.

#[allow(dead_code)]
mod common;
use common::prelude::*;

#[test]
fn test_resolve_help() {
    let mut cmd = cargo_bin_cmd!("mirror-hook");
    cmd.arg("resolve")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--registry"))
        .stdout(predicate::str::contains("--project-id"))
        .stdout(predicate::str::contains("--repository-id"))
        .stdout(predicate::str::contains("--base-dir"));
}

#[test]
fn test_resolve_lists_git_repositories_with_masked_credentials() {
    let fixture = TestFixture::new().with_registry(registries::ACME);

    fixture
        .command("resolve")
        .arg("--project-id")
        .arg("acme")
        .arg("--credentials")
        .arg("bot:s3cret")
        .arg("--base-dir")
        .arg("/srv/mirrors")
        .assert()
        .success()
        .stdout(predicate::eq(
            "acme/main\thttps://***@github.com/acme/acme.git\t/srv/mirrors/acme/acme.git\n\
             acme/docs\thttps://***@github.com/acme/docs.git\t/srv/mirrors/acme/docs.git\n",
        ))
        .stderr(predicate::str::contains("s3cret").not());
}

#[test]
fn test_resolve_uses_payload_repository_name() {
    let fixture = TestFixture::new()
        .with_registry(registries::ACME)
        .with_file("push.json", payloads::ACME_PUSH);

    fixture
        .command("resolve")
        .arg("--payload")
        .arg(fixture.path().join("push.json"))
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "acme/main\thttps://github.com/acme/acme.git\thttps://github.com/acme/acme.git",
        ))
        .stdout(predicate::str::contains("legacy").not());
}

#[test]
fn test_resolve_reads_payload_from_stdin() {
    let fixture = TestFixture::new().with_registry(registries::ACME);

    fixture
        .command("resolve")
        .arg("--payload")
        .arg("-")
        .write_stdin(payloads::ACME_PUSH)
        .assert()
        .success()
        .stdout(predicate::str::contains("acme/docs"));
}

#[test]
fn test_resolve_project_id_is_case_insensitive() {
    let fixture = TestFixture::new().with_registry(registries::ACME);

    fixture
        .command("resolve")
        .arg("--project-id")
        .arg("ACME")
        .assert()
        .success()
        .stdout(predicate::str::contains("acme/main"));
}

#[test]
fn test_resolve_repository_selector() {
    let fixture = TestFixture::new().with_registry(registries::ACME);

    fixture
        .command("resolve")
        .arg("--project-id")
        .arg("acme")
        .arg("--repository-id")
        .arg("docs")
        .assert()
        .success()
        .stdout(predicate::str::contains("acme/docs"))
        .stdout(predicate::str::contains("acme/main").not());
}

#[test]
fn test_resolve_unknown_selector_falls_back_to_all() {
    let fixture = TestFixture::new().with_registry(registries::ACME);

    fixture
        .command("resolve")
        .arg("--project-id")
        .arg("acme")
        .arg("--repository-id")
        .arg("nope")
        .assert()
        .success()
        .stdout(predicate::str::contains("acme/main"))
        .stdout(predicate::str::contains("acme/docs"));
}

#[test]
fn test_resolve_unknown_project_fails() {
    let fixture = TestFixture::new()
        .with_registry(registries::ACME)
        .with_file("push.json", payloads::UNKNOWN_PUSH);

    fixture
        .command("resolve")
        .arg("--payload")
        .arg(fixture.path().join("push.json"))
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "No project found with identifier 'nobody'",
        ));
}

#[test]
fn test_resolve_without_project_identifier_fails() {
    let fixture = TestFixture::new()
        .with_registry(registries::ACME)
        .with_file("push.json", payloads::NO_REPOSITORY);

    fixture
        .command("resolve")
        .arg("--payload")
        .arg(fixture.path().join("push.json"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Project identifier not specified"));
}

#[test]
fn test_resolve_project_without_git_repository_fails() {
    let fixture = TestFixture::new().with_registry(registries::NO_GIT);

    fixture
        .command("resolve")
        .arg("--project-id")
        .arg("attic")
        .assert()
        .failure()
        .stderr(predicate::str::contains("has no git repository"));
}

#[test]
fn test_resolve_invalid_registry_fails() {
    let fixture = TestFixture::new().with_registry(registries::INVALID);

    fixture
        .command("resolve")
        .arg("--project-id")
        .arg("acme")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid registry"));
}

#[test]
fn test_resolve_invalid_payload_fails() {
    let fixture = TestFixture::new()
        .with_registry(registries::ACME)
        .with_file("push.json", "{not json");

    fixture
        .command("resolve")
        .arg("--payload")
        .arg(fixture.path().join("push.json"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid payload"));
}

#[test]
fn test_resolve_missing_registry_fails() {
    let fixture = TestFixture::new();

    fixture
        .command("resolve")
        .arg("--project-id")
        .arg("acme")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read registry"));
}
