//! Management of the sidecar child process.

use std::{
    path::{Path, PathBuf},
    process::Stdio,
};

use {
    tokio::{
        io::{AsyncBufReadExt, BufReader},
        process::{Child, Command},
    },
    tracing::{debug, info, warn},
};

use crate::{
    connection::DEFAULT_SIDECAR_PORT,
    error::{Error, Result},
};

/// Settings for spawning the sidecar process.
#[derive(Debug, Clone)]
pub struct SidecarSettings {
    /// Directory containing the sidecar code (package.json, dist/).
    pub dir: PathBuf,
    /// Port for the sidecar WebSocket server.
    pub port: u16,
    /// Directory where the sidecar keeps session credentials. Keys only —
    /// messages are never persisted.
    pub auth_dir: PathBuf,
}

impl Default for SidecarSettings {
    fn default() -> Self {
        Self {
            dir: PathBuf::new(),
            port: DEFAULT_SIDECAR_PORT,
            auth_dir: PathBuf::from("warelay-auth"),
        }
    }
}

/// Handle to a running sidecar process.
pub struct SidecarProcess {
    child: Child,
    port: u16,
}

impl SidecarProcess {
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Check if the process is still running.
    pub fn is_running(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    /// Gracefully stop the sidecar: SIGTERM, then kill after a grace period.
    pub async fn stop(&mut self) -> Result<()> {
        info!("stopping sidecar process");

        #[cfg(unix)]
        {
            use nix::{
                sys::signal::{Signal, kill},
                unistd::Pid,
            };

            if let Some(pid) = self.child.id() {
                let _ = kill(Pid::from_raw(pid as i32), Signal::SIGTERM);
            }
        }

        #[cfg(not(unix))]
        {
            let _ = self.child.kill().await;
        }

        match tokio::time::timeout(std::time::Duration::from_secs(5), self.child.wait()).await {
            Ok(Ok(status)) => info!(?status, "sidecar process exited"),
            Ok(Err(error)) => warn!(error = %error, "error waiting for sidecar process"),
            Err(_) => {
                warn!("sidecar process did not exit gracefully, killing");
                let _ = self.child.kill().await;
            },
        }

        Ok(())
    }
}

/// Find the sidecar directory.
///
/// Searches in order: the explicit path if given, the `WARELAY_SIDECAR_DIR`
/// environment variable, paths relative to the executable, then conventional
/// development paths relative to the working directory.
pub fn find_sidecar_dir(explicit_path: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit_path {
        if path.join("package.json").exists() {
            return Ok(path.to_path_buf());
        }
        return Err(Error::Sidecar(format!(
            "sidecar directory missing or has no package.json: {}",
            path.display()
        )));
    }

    if let Ok(dir) = std::env::var("WARELAY_SIDECAR_DIR") {
        let path = PathBuf::from(&dir);
        if path.join("package.json").exists() {
            return Ok(path);
        }
        warn!(path = %dir, "WARELAY_SIDECAR_DIR set but package.json not found");
    }

    if let Ok(exe_path) = std::env::current_exe()
        && let Some(exe_dir) = exe_path.parent()
    {
        for rel_path in ["../sidecar/baileys", "../../sidecar/baileys"] {
            let candidate = exe_dir.join(rel_path);
            if candidate.join("package.json").exists() {
                return Ok(candidate);
            }
        }
    }

    for rel_path in ["sidecar/baileys", "../sidecar/baileys"] {
        let path = PathBuf::from(rel_path);
        if path.join("package.json").exists() {
            return Ok(path.canonicalize().unwrap_or(path));
        }
    }

    Err(Error::Sidecar(
        "sidecar not found; set WARELAY_SIDECAR_DIR or ensure sidecar/baileys exists".into(),
    ))
}

/// Spawn the sidecar process and verify it survived its first moments.
pub async fn start_sidecar(settings: &SidecarSettings) -> Result<SidecarProcess> {
    let dir = &settings.dir;

    if !dir.join("package.json").exists() {
        return Err(Error::Sidecar(format!(
            "sidecar not found at {}",
            dir.display()
        )));
    }
    if !dir.join("dist/index.js").exists() {
        return Err(Error::Sidecar(format!(
            "sidecar at {} is not built; run `npm install && npm run build` there first",
            dir.display()
        )));
    }

    info!(path = %dir.display(), port = settings.port, "starting sidecar process");

    let mut child = Command::new("node")
        .arg("dist/index.js")
        .current_dir(dir)
        .env("WARELAY_SIDECAR_PORT", settings.port.to_string())
        .env("WARELAY_AUTH_DIR", &settings.auth_dir)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()?;

    if let Some(stdout) = child.stdout.take() {
        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                info!(target: "sidecar", "{}", line);
            }
        });
    }
    if let Some(stderr) = child.stderr.take() {
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                warn!(target: "sidecar", "{}", line);
            }
        });
    }

    // Give the process a moment to fail on startup errors.
    tokio::time::sleep(std::time::Duration::from_millis(500)).await;
    match child.try_wait() {
        Ok(Some(status)) => {
            return Err(Error::Sidecar(format!(
                "sidecar process exited immediately with status {status}"
            )));
        },
        Ok(None) => debug!("sidecar process running"),
        Err(error) => return Err(error.into()),
    }

    Ok(SidecarProcess {
        child,
        port: settings.port,
    })
}
