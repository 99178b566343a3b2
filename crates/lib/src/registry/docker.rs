//! Registries backed by the docker CLI.

use std::collections::HashSet;
use std::path::PathBuf;

use tracing::{debug, info};

use crate::consts::{APP_NAME, BASENAME_LABEL, CONTAINER_LABEL, REMOVE_CHUNK_SIZE};
use crate::registry::{ContainerId, ContainerRegistry, ImageQuery, ImageRegistry, RegistryError};
use crate::shellout::{ExecResult, Invocation, Shellout};

#[derive(Debug, Clone)]
pub struct DockerOptions {
  /// Program used for docker commands.
  pub binary: String,

  /// Passed to every docker command as `DOCKER_CONFIG`.
  pub config_dir: Option<PathBuf>,

  /// Enumerate but do not remove anything.
  pub dry_run: bool,
}

impl Default for DockerOptions {
  fn default() -> Self {
    Self {
      binary: "docker".to_string(),
      config_dir: None,
      dry_run: false,
    }
  }
}

/// Containers and images managed through `docker`.
#[derive(Debug, Clone)]
pub struct Docker {
  shellout: Shellout,
  options: DockerOptions,
}

/// Repository holding the stage images of a namespace.
pub fn stage_repository(basename: &str) -> String {
  format!("{}-stage-{}", APP_NAME, basename)
}

impl Docker {
  pub fn new(shellout: Shellout, options: DockerOptions) -> Self {
    Self { shellout, options }
  }

  pub fn options(&self) -> &DockerOptions {
    &self.options
  }

  fn invocation<I, S>(&self, args: I) -> Invocation
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    let invocation = Invocation::new(&self.options.binary).args(args);
    match &self.options.config_dir {
      Some(dir) => invocation.env("DOCKER_CONFIG", dir.to_string_lossy()),
      None => invocation,
    }
  }

  async fn run(&self, action: &'static str, invocation: Invocation) -> Result<ExecResult, RegistryError> {
    self
      .shellout
      .shellout_checked(invocation)
      .await
      .map_err(|source| RegistryError::Command { action, source })
  }

  /// Run `docker <command> <handles...>` in bounded chunks.
  async fn remove_in_chunks(
    &self,
    action: &'static str,
    command: &[&str],
    handles: &[String],
  ) -> Result<(), RegistryError> {
    if handles.is_empty() {
      return Ok(());
    }

    if self.options.dry_run {
      info!(count = handles.len(), handles = ?handles, "dry run, skipping {}", action);
      return Ok(());
    }

    for chunk in handles.chunks(REMOVE_CHUNK_SIZE) {
      let invocation = self
        .invocation(command.iter().copied())
        .args(chunk.iter().cloned())
        .log_verbose(true);
      self.run(action, invocation).await?;
    }

    Ok(())
  }
}

impl ContainerRegistry for Docker {
  async fn list_containers(&self, basename: &str) -> Result<Vec<ContainerId>, RegistryError> {
    let invocation = self.invocation([
      "ps".to_string(),
      "-a".to_string(),
      "-q".to_string(),
      "--no-trunc".to_string(),
      "-f".to_string(),
      format!("label={}", CONTAINER_LABEL),
      "-f".to_string(),
      format!("label={}={}", BASENAME_LABEL, basename),
    ]);
    let result = self.run("listing containers", invocation).await?;

    let ids: Vec<ContainerId> = unique(result.stdout_lines()).into_iter().map(ContainerId).collect();
    debug!(basename, count = ids.len(), "listed containers");
    Ok(ids)
  }

  async fn remove_containers(&self, ids: &[ContainerId]) -> Result<(), RegistryError> {
    let handles: Vec<String> = ids.iter().map(|id| id.0.clone()).collect();
    self.remove_in_chunks("removing containers", &["rm", "-f"], &handles).await
  }
}

impl ImageRegistry for Docker {
  fn images_query(&self, basename: &str) -> ImageQuery {
    ImageQuery {
      repository: stage_repository(basename),
    }
  }

  async fn remove_images(&self, query: &ImageQuery) -> Result<Vec<String>, RegistryError> {
    let invocation = self.invocation(["images", "--format", "{{.Repository}}:{{.Tag}}", query.repository.as_str()]);
    let result = self.run("listing images", invocation).await?;

    // Untagged images have no reference to remove them by.
    let images = unique(result.stdout_lines().filter(|image| !image.contains("<none>")));
    debug!(query = %query, count = images.len(), "listed images");

    self.remove_in_chunks("removing images", &["rmi"], &images).await?;
    Ok(images)
  }
}

/// Deduplicate while keeping first-seen order.
fn unique<'a>(items: impl Iterator<Item = &'a str>) -> Vec<String> {
  let mut seen = HashSet::new();
  items
    .filter(|item| seen.insert(*item))
    .map(str::to_string)
    .collect()
}
