//! External decryption utility - capability layer
//!
//! Removes the password from a downloaded PDF in place by running `qpdf`.

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, error};

use crate::error::{AppError, DecryptError};

/// Rewrites an encrypted document in place, unencrypted
#[async_trait]
pub trait Decryptor: Send + Sync {
    /// Fails fatally when the utility cannot run on this host
    async fn ensure_available(&self) -> Result<(), AppError>;

    async fn decrypt(&self, path: &Path, password: &str) -> Result<(), DecryptError>;
}

/// [`Decryptor`] backed by the `qpdf` command line tool
#[derive(Debug, Clone)]
pub struct QpdfDecryptor {
    program: String,
}

impl QpdfDecryptor {
    pub fn new() -> Self {
        Self::with_program("qpdf")
    }

    /// Use another executable with qpdf's command line
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for QpdfDecryptor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Decryptor for QpdfDecryptor {
    async fn ensure_available(&self) -> Result<(), AppError> {
        let output = Command::new(&self.program)
            .arg("--version")
            .stdin(Stdio::null())
            .output()
            .await;

        let reason = match output {
            Ok(o) if o.status.success() => {
                debug!(
                    "{} available: {}",
                    self.program,
                    String::from_utf8_lossy(&o.stdout).lines().next().unwrap_or_default()
                );
                return Ok(());
            }
            Ok(o) => format!("`{} --version` exited with {}", self.program, o.status),
            Err(e) => e.to_string(),
        };

        error!(
            "`{}` does not exist.\nPossible reasons:\n  1. Not installed (try running `apt install qpdf` or `brew install qpdf`)\n  2. Not in PATH",
            self.program
        );
        Err(AppError::DecryptorUnavailable {
            program: self.program.clone(),
            reason,
        })
    }

    async fn decrypt(&self, path: &Path, password: &str) -> Result<(), DecryptError> {
        let mut child = Command::new(&self.program)
            // Password comes from stdin so it never shows up in `ps`
            .arg("--password-file=-")
            .arg("--replace-input")
            .arg("--decrypt")
            .arg(path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| DecryptError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            let written = async {
                stdin.write_all(password.as_bytes()).await?;
                stdin.shutdown().await
            }
            .await;
            // Closing stdin tells qpdf the password is complete
            drop(stdin);
            if let Err(source) = written {
                // A tool that exits without reading stdin breaks the pipe;
                // its exit code below is the more useful signal.
                if source.kind() != std::io::ErrorKind::BrokenPipe {
                    return Err(DecryptError::Stdin {
                        program: self.program.clone(),
                        source,
                    });
                }
            }
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|source| DecryptError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        for line in String::from_utf8_lossy(&output.stdout).lines() {
            debug!("[{}] {}", self.program, line);
        }
        for line in String::from_utf8_lossy(&output.stderr).lines() {
            debug!("[{} stderr] {}", self.program, line);
        }

        if output.status.success() {
            Ok(())
        } else {
            error!("{} exited with {}", self.program, output.status);
            Err(DecryptError::Exit {
                program: self.program.clone(),
                code: output.status.code(),
            })
        }
    }
}
