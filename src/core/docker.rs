//! Docker Compose integration
//!
//! Lifecycle commands for the stack, all run from the repository root.

use std::path::PathBuf;
use tracing::info;

use crate::core::command::{Cmd, CommandError, CommandRunner};
use crate::utils::{DOCKER_SOCKET, WATCHTOWER_IMAGE};

pub struct DockerManager<R> {
    runner: R,
    project_root: PathBuf,
}

impl<R: CommandRunner> DockerManager<R> {
    pub fn new(runner: R, project_root: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            project_root: project_root.into(),
        }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// `docker compose` invocation rooted at the project directory
    pub fn compose(&self) -> Cmd {
        Cmd::docker().arg("compose").current_dir(&self.project_root)
    }

    /// Execute docker compose command
    pub fn compose_command(&self, args: &[&str]) -> Result<Option<String>, CommandError> {
        self.runner.run(&self.compose().args(args.iter().copied()))
    }

    /// Bring up all services, or just `service`
    pub fn deploy(&self, service: Option<&str>) -> Result<(), CommandError> {
        match service {
            Some(service) => {
                info!("Bringing up service: {}", service);
                self.compose_command(&["up", "-d", service])?;
            }
            None => {
                info!("Bringing up all services");
                self.compose_command(&["up", "-d"])?;
            }
        }
        Ok(())
    }

    /// Stop all services
    pub fn stop_all(&self) -> Result<(), CommandError> {
        self.compose_command(&["down"])?;
        Ok(())
    }

    /// Stop all services, tolerating a stack that is already down or was never up
    pub fn stop_all_lenient(&self) -> Result<(), CommandError> {
        self.runner.run(&self.compose().arg("down").ignore_failure())?;
        Ok(())
    }

    /// Start all services
    pub fn start_all(&self) -> Result<(), CommandError> {
        self.compose_command(&["up", "-d"])?;
        Ok(())
    }

    /// Pull latest images
    pub fn pull_images(&self) -> Result<(), CommandError> {
        self.compose_command(&["pull"])?;
        Ok(())
    }

    /// Rebuild images and recreate every container
    pub fn rebuild(&self) -> Result<(), CommandError> {
        self.compose_command(&["up", "-d", "--build", "--force-recreate"])?;
        Ok(())
    }

    pub fn status(&self) -> Result<(), CommandError> {
        self.compose_command(&["ps"])?;
        Ok(())
    }

    /// Show logs for one service or all of them; `tail == 0` shows everything
    pub fn logs(&self, service: Option<&str>, follow: bool, tail: usize) -> Result<(), CommandError> {
        let mut args = vec!["logs".to_string()];
        if follow {
            args.push("-f".to_string());
        }
        if tail > 0 {
            args.push("--tail".to_string());
            args.push(tail.to_string());
        }
        if let Some(service) = service {
            args.push(service.to_string());
        }

        self.runner.run(&self.compose().args(args))?;
        Ok(())
    }

    /// One-shot, monitor-only watchtower run listing containers with newer images
    pub fn check_updates(&self) -> Result<(), CommandError> {
        let cmd = Cmd::docker().args([
            "run".to_string(),
            "--rm".to_string(),
            "-v".to_string(),
            format!("{0}:{0}", DOCKER_SOCKET),
            WATCHTOWER_IMAGE.to_string(),
            "--run-once".to_string(),
            "--monitor-only".to_string(),
        ]);
        self.runner.run(&cmd)?;
        Ok(())
    }

    /// Remove stopped containers, dangling images and unused networks
    pub fn prune_system(&self) -> Result<(), CommandError> {
        self.runner.run(&Cmd::docker().args(["system", "prune", "-f"]))?;
        Ok(())
    }

    /// Validate the service definition without starting anything
    pub fn dry_run(&self) -> Result<(), CommandError> {
        self.compose_command(&["up", "--dry-run"])?;
        Ok(())
    }

    /// Fully resolved (variable-substituted) service definition as YAML
    pub fn resolved_config(&self) -> Result<String, CommandError> {
        let output = self.runner.run(&self.compose().arg("config").capture())?;
        Ok(output.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::command::MockCommandRunner;
    use std::path::Path;

    fn expect_args(mock: &mut MockCommandRunner, expected: &'static [&'static str]) {
        mock.expect_run()
            .withf(move |cmd| {
                cmd.program() == "docker"
                    && cmd.get_args() == expected
                    && cmd.dir() == Some(Path::new("/srv/stack"))
            })
            .times(1)
            .returning(|_| Ok(None));
    }

    #[test]
    fn test_logs_builds_follow_and_tail_flags() {
        let mut mock = MockCommandRunner::new();
        expect_args(&mut mock, &["compose", "logs", "-f", "--tail", "100", "nginx"]);
        expect_args(&mut mock, &["compose", "logs"]);

        let docker = DockerManager::new(mock, "/srv/stack");
        docker.logs(Some("nginx"), true, 100).unwrap();
        docker.logs(None, false, 0).unwrap();
    }

    #[test]
    fn test_deploy_single_service() {
        let mut mock = MockCommandRunner::new();
        expect_args(&mut mock, &["compose", "up", "-d", "teamspeak"]);

        DockerManager::new(mock, "/srv/stack").deploy(Some("teamspeak")).unwrap();
    }

    #[test]
    fn test_lenient_stop_is_marked_ignorable() {
        let mut mock = MockCommandRunner::new();
        mock.expect_run()
            .withf(|cmd| cmd.args_start_with(&["compose", "down"]) && cmd.is_ignorable())
            .times(1)
            .returning(|_| Ok(None));

        DockerManager::new(mock, "/srv/stack").stop_all_lenient().unwrap();
    }

    #[test]
    fn test_resolved_config_is_captured() {
        let mut mock = MockCommandRunner::new();
        mock.expect_run()
            .withf(|cmd| cmd.args_start_with(&["compose", "config"]) && cmd.is_captured())
            .times(1)
            .returning(|_| Ok(Some("volumes:\n  acme: {}\n".to_string())));

        let config = DockerManager::new(mock, "/srv/stack").resolved_config().unwrap();
        assert!(config.contains("acme"));
    }

    #[test]
    fn test_prune_forces_without_prompt() {
        let mut mock = MockCommandRunner::new();
        mock.expect_run()
            .withf(|cmd| cmd.get_args() == ["system", "prune", "-f"] && !cmd.is_ignorable())
            .times(1)
            .returning(|_| Ok(None));

        DockerManager::new(mock, "/srv/stack").prune_system().unwrap();
    }

    #[test]
    fn test_start_failure_propagates() {
        let mut mock = MockCommandRunner::new();
        mock.expect_run().returning(|cmd| cmd.failure(Some(1), "port is already allocated"));

        let err = DockerManager::new(mock, "/srv/stack").start_all().unwrap_err();
        assert!(err.to_string().contains("port is already allocated"));
    }
}
