//! Integration tests for `stageflush flush`.

use std::time::Duration;

use predicates::prelude::*;
use stageflush_lib::lock::{FileLocks, NamedLock};

use crate::common::TestEnv;

#[test]
fn flush_positional_basenames() {
  let env = TestEnv::new();

  env
    .stageflush_cmd()
    .args(["flush", "app", "web"])
    .assert()
    .success()
    .stdout(predicate::str::contains("app: 2 container(s), 2 image(s) removed"))
    .stdout(predicate::str::contains("web: 2 container(s), 2 image(s) removed"))
    .stdout(predicate::str::contains("Flush complete!"));

  let calls = env.docker_calls();
  assert_eq!(calls.len(), 8, "calls: {:?}", calls);
  assert!(calls[0].starts_with("ps -a -q --no-trunc -f label=stageflush -f label=stageflush.basename=app"));
  assert_eq!(calls[1], "rm -f app-c1 app-c2");
  assert!(calls[2].starts_with("images --format"));
  assert_eq!(calls[3], "rmi stageflush-stage-app:one stageflush-stage-app:two");
  assert!(calls[4].ends_with("label=stageflush.basename=web"));
}

#[test]
fn flush_project_file_dedupes_basenames() {
  let env = TestEnv::new();
  env.write_project(
    r#"{ "images": [
      { "name": "backend", "basename": "app" },
      { "name": "worker", "basename": "app" }
    ] }"#,
  );

  env
    .stageflush_cmd()
    .arg("flush")
    .assert()
    .success()
    .stdout(predicate::str::contains("Namespaces: 1"));

  let calls = env.docker_calls();
  assert_eq!(calls.iter().filter(|c| c.starts_with("ps ")).count(), 1);
}

#[test]
fn flush_explicit_project_file_and_basenames() {
  let env = TestEnv::new();
  let project = env.root_path().join("other.json");
  std::fs::write(&project, r#"{ "images": [ { "basename": "api" } ] }"#).unwrap();

  env
    .stageflush_cmd()
    .args(["flush", "app", "-c"])
    .arg(&project)
    .assert()
    .success();

  let namespaces: Vec<String> = env
    .docker_calls()
    .into_iter()
    .filter(|c| c.starts_with("ps "))
    .collect();
  assert_eq!(namespaces.len(), 2);
  assert!(namespaces[0].ends_with("label=stageflush.basename=api"));
  assert!(namespaces[1].ends_with("label=stageflush.basename=app"));
}

#[test]
fn flush_without_config_fails() {
  let env = TestEnv::new();

  env
    .stageflush_cmd()
    .arg("flush")
    .assert()
    .failure()
    .stderr(predicate::str::contains("stageflush.json"));

  assert!(env.docker_calls().is_empty());
}

#[test]
fn flush_invalid_project_file_fails() {
  let env = TestEnv::new();
  env.write_project("{ not json");

  env.stageflush_cmd().arg("flush").assert().failure();
  assert!(env.docker_calls().is_empty());
}

#[test]
fn flush_rejects_empty_basename() {
  let env = TestEnv::new();

  env
    .stageflush_cmd()
    .args(["flush", "app", ""])
    .assert()
    .failure()
    .stderr(predicate::str::contains("must not be empty"));

  assert!(env.docker_calls().is_empty());
  assert!(!env.lock_dir().join(".images.lock").exists());
}

#[test]
fn flush_rejects_project_basename_escaping_its_namespace() {
  let env = TestEnv::new();
  env.write_project(r#"{ "images": [ { "basename": "app" }, { "basename": "app web" } ] }"#);

  env
    .stageflush_cmd()
    .arg("flush")
    .assert()
    .failure()
    .stderr(predicate::str::contains("image #1"));

  assert!(env.docker_calls().is_empty());
}

#[test]
fn flush_without_home_uses_given_lock_dir() {
  let env = TestEnv::new();

  env
    .stageflush_cmd()
    .env_remove("HOME")
    .env_remove("XDG_CACHE_HOME")
    .env_remove("STAGEFLUSH_LOCK_DIR")
    .args(["flush", "app", "--lock-dir"])
    .arg(env.lock_dir())
    .assert()
    .success();

  assert!(env.lock_dir().join("app.images.lock").exists());
}

#[test]
fn flush_without_any_lock_dir_fails_cleanly() {
  let env = TestEnv::new();

  env
    .stageflush_cmd()
    .env_remove("HOME")
    .env_remove("XDG_CACHE_HOME")
    .env_remove("STAGEFLUSH_LOCK_DIR")
    .args(["flush", "app"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("cannot determine the lock directory"))
    .stderr(predicate::str::contains("panicked").not());

  assert!(env.docker_calls().is_empty());
}

#[test]
fn flush_json_output() {
  let env = TestEnv::new();

  let output = env
    .stageflush_cmd()
    .args(["-o", "json", "flush", "app"])
    .output()
    .unwrap();
  assert!(output.status.success());

  let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  let namespaces = report["namespaces"].as_array().unwrap();
  assert_eq!(namespaces.len(), 1);
  assert_eq!(namespaces[0]["basename"], "app");
  assert_eq!(namespaces[0]["flushed"], true);
  assert_eq!(namespaces[0]["containers"].as_array().unwrap().len(), 2);
  assert_eq!(namespaces[0]["images"].as_array().unwrap().len(), 2);
}

#[test]
fn flush_json_output_stays_parseable_when_verbose() {
  let env = TestEnv::new();

  let output = env
    .stageflush_cmd()
    .args(["-v", "-o", "json", "flush", "app"])
    .output()
    .unwrap();
  assert!(output.status.success());
  serde_json::from_slice::<serde_json::Value>(&output.stdout).unwrap();
}

#[test]
fn flush_dry_run_removes_nothing() {
  let env = TestEnv::new();

  env
    .stageflush_cmd()
    .args(["flush", "--dry-run", "app"])
    .assert()
    .success()
    .stdout(predicate::str::contains("would be removed"))
    .stdout(predicate::str::contains("Dry run - no changes made"));

  let calls = env.docker_calls();
  assert!(calls.iter().any(|c| c.starts_with("ps ")));
  assert!(calls.iter().any(|c| c.starts_with("images ")));
  assert!(!calls.iter().any(|c| c.starts_with("rm ") || c.starts_with("rmi ")));
}

#[test]
fn flush_failure_reports_namespace_and_continues() {
  let env = TestEnv::new();
  env.fail_subcommand("rmi");

  env
    .stageflush_cmd()
    .args(["flush", "web", "app"])
    .assert()
    .failure()
    .stdout(predicate::str::contains("web: failed to remove images of web"))
    .stdout(predicate::str::contains("app: failed to remove images of app"))
    .stderr(predicate::str::contains("flush failed for 2 namespace(s): web, app"));

  // Containers were still torn down in both namespaces.
  let calls = env.docker_calls();
  assert!(calls.contains(&"rm -f web-c1 web-c2".to_string()));
  assert!(calls.contains(&"rm -f app-c1 app-c2".to_string()));
}

#[test]
fn flush_container_failure_skips_images() {
  let env = TestEnv::new();
  env.fail_subcommand("rm");

  env
    .stageflush_cmd()
    .args(["flush", "app"])
    .assert()
    .failure()
    .stdout(predicate::str::contains("failed to flush containers of app"));

  assert!(!env.docker_calls().iter().any(|c| c.starts_with("images ")));
}

#[test]
fn flush_verbose_streams_removal_output() {
  let env = TestEnv::new();

  env
    .stageflush_cmd()
    .args(["--verbose", "flush", "app"])
    .assert()
    .success()
    .stdout(predicate::str::contains("app-c1"));
}

#[test]
fn flush_quiet_captures_removal_output() {
  let env = TestEnv::new();

  env
    .stageflush_cmd()
    .args(["flush", "app"])
    .assert()
    .success()
    .stdout(predicate::str::contains("app-c1").not());
}

#[test]
fn flush_passes_docker_config() {
  let env = TestEnv::new();
  let docker_config = env.root_path().join("docker-config");
  std::fs::create_dir(&docker_config).unwrap();

  // The fake docker only sees DOCKER_CONFIG if the child environment carries it.
  let probe = env.root_path().join("docker_config.out");
  let script = std::fs::read_to_string(env.docker_path()).unwrap().replacen(
    "sub=\"$1\"",
    &format!("echo \"$DOCKER_CONFIG\" > '{}'\nsub=\"$1\"", probe.display()),
    1,
  );
  std::fs::write(env.docker_path(), script).unwrap();

  env
    .stageflush_cmd()
    .args(["flush", "app", "--docker-config"])
    .arg(&docker_config)
    .assert()
    .success();

  let seen = std::fs::read_to_string(probe).unwrap();
  assert_eq!(seen.trim(), docker_config.display().to_string());
}

#[test]
fn flush_times_out_on_held_lock() {
  let env = TestEnv::new();
  let rt = tokio::runtime::Runtime::new().unwrap();
  let locks = FileLocks::new(env.lock_dir());
  let guard = rt.block_on(locks.acquire("app.images")).unwrap();

  env
    .stageflush_cmd()
    .args(["flush", "app", "--lock-timeout", "200ms"])
    .timeout(Duration::from_secs(30))
    .assert()
    .failure()
    .stdout(predicate::str::contains("timed out"));

  assert!(env.docker_calls().is_empty());

  drop(guard);
  env.stageflush_cmd().args(["flush", "app"]).assert().success();
}

#[test]
fn flush_lock_timeout_from_env() {
  let env = TestEnv::new();
  let rt = tokio::runtime::Runtime::new().unwrap();
  let locks = FileLocks::new(env.lock_dir());
  let _guard = rt.block_on(locks.acquire("app.images")).unwrap();

  env
    .stageflush_cmd()
    .env("STAGEFLUSH_LOCK_TIMEOUT", "1")
    .args(["flush", "app"])
    .timeout(Duration::from_secs(30))
    .assert()
    .failure();
}
