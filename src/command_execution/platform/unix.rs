// Process spawning on macOS (and other Unix hosts) via std::process

use std::io::{self, Write};
use std::process::{Command, Stdio};
use zeroize::Zeroizing;

use super::executor::{ProcessSpawner, RawOutput};

/// Spawns programs directly, never through a shell
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemSpawner;

impl SystemSpawner {
    pub fn new() -> Self {
        Self
    }
}

impl ProcessSpawner for SystemSpawner {
    fn run(&self, argv: &[String], stdin: Option<Zeroizing<Vec<u8>>>) -> io::Result<RawOutput> {
        let (program, arguments) = argv
            .split_first()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "empty argument vector"))?;

        let mut cmd = Command::new(program);
        cmd.args(arguments)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(if stdin.is_some() { Stdio::piped() } else { Stdio::null() });

        let mut child = cmd.spawn()?;

        if let Some(input) = stdin {
            if let Some(mut pipe) = child.stdin.take() {
                // The helper may exit without reading (cached authorization);
                // a closed pipe is not an error here.
                if let Err(e) = pipe.write_all(&input) {
                    if e.kind() != io::ErrorKind::BrokenPipe {
                        log::warn!("Failed to write to {} stdin: {}", program, e);
                    }
                }
                // Dropping the pipe closes the child's stdin.
            }
            drop(input);
        }

        let output = child.wait_with_output()?;

        Ok(RawOutput {
            exit_code: output.status.code(),
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}
