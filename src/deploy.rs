//! Deployment pipeline execution

use async_trait::async_trait;
use std::time::Duration;
use tokio::process::Command;
use tracing::{error, info};

use crate::TargetConfig;
use crate::error::{DeployError, Result};

/// Executes the deployment pipeline for a resolved target.
///
/// A trait so handlers can be tested against a recording fake instead of
/// spawning real subprocesses.
#[async_trait]
pub trait Deployer: Send + Sync {
    async fn deploy(&self, target: &TargetConfig) -> Result<()>;
}

/// One step of a deployment: an argv plus the directory to run it in.
/// `cwd = None` means the process's own working directory.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub argv: Vec<String>,
    pub cwd: Option<String>,
}

impl Step {
    fn in_dir(argv: Vec<String>, cwd: &str) -> Self {
        Self {
            argv,
            cwd: Some(cwd.to_string()),
        }
    }

    /// The command line as shown in logs and failure responses.
    pub fn rendered(&self) -> String {
        self.argv.join(" ")
    }
}

/// The full ordered pipeline for a target: `git pull` in the target's
/// working directory, each build step in order (same directory), then the
/// supervisor restart from the default working directory.
pub fn deployment_steps(target: &TargetConfig, supervisor_bin: &str) -> Vec<Step> {
    let mut steps = vec![Step::in_dir(
        vec!["git".to_string(), "pull".to_string()],
        &target.path,
    )];
    for argv in &target.build {
        steps.push(Step::in_dir(argv.clone(), &target.path));
    }
    steps.push(Step {
        argv: vec![
            supervisor_bin.to_string(),
            "restart".to_string(),
            target.name.clone(),
        ],
        cwd: None,
    });
    steps
}

/// Runs deployment steps as real subprocesses.
pub struct CommandDeployer {
    supervisor_bin: String,
    step_timeout: Duration,
}

impl CommandDeployer {
    pub fn new(supervisor_bin: String, step_timeout: Duration) -> Self {
        Self {
            supervisor_bin,
            step_timeout,
        }
    }

    /// Runs the steps strictly in order. Each step is awaited and its exit
    /// status checked before the next one is spawned; the first failure
    /// aborts the rest of the pipeline.
    async fn run_steps(&self, steps: &[Step]) -> Result<()> {
        for step in steps {
            self.run_step(step).await?;
        }
        Ok(())
    }

    async fn run_step(&self, step: &Step) -> Result<()> {
        let command = step.rendered();
        info!(
            "Running (cwd = '{}'): {}",
            step.cwd.as_deref().unwrap_or("."),
            command
        );

        let mut cmd = Command::new(&step.argv[0]);
        cmd.args(&step.argv[1..]);
        if let Some(cwd) = &step.cwd {
            cmd.current_dir(cwd);
        }
        // On timeout the output future is dropped; the child must die with it
        cmd.kill_on_drop(true);

        let output = tokio::time::timeout(self.step_timeout, cmd.output())
            .await
            .map_err(|_| DeployError::CommandTimedOut {
                command: command.clone(),
                timeout_secs: self.step_timeout.as_secs(),
            })?
            .map_err(|e| DeployError::CommandSpawn {
                command: command.clone(),
                source: e,
            })?;

        if !output.stdout.is_empty() {
            info!("stdout: {}", String::from_utf8_lossy(&output.stdout));
        }
        if !output.stderr.is_empty() {
            error!("stderr: {}", String::from_utf8_lossy(&output.stderr));
        }

        if output.status.success() {
            Ok(())
        } else {
            let err = DeployError::CommandFailed {
                command,
                exit_code: output.status.code(),
            };
            error!("{}", err);
            Err(err)
        }
    }
}

#[async_trait]
impl Deployer for CommandDeployer {
    async fn deploy(&self, target: &TargetConfig) -> Result<()> {
        self.run_steps(&deployment_steps(target, &self.supervisor_bin))
            .await
    }
}
