//! Runs an external tool as an argument vector, never as a shell
//! string, and reports what happened rather than whether it succeeded
//! (spec §4.1, §9 shell-injection note).

use std::io::{BufRead, BufReader};
use std::process::{Command, Stdio};
use std::thread;

use anyhow::{Context, Result};

/// The outcome of running one external command. A non-zero exit code
/// is a value here, not an error — callers decide whether it's fatal.
#[derive(Debug, Clone)]
pub struct ExitOutcome {
    pub code: Option<i32>,
    pub success: bool,
}

/// Runs `program` with `args` (argv form — never shell-parsed),
/// captures stdout and stderr, and logs each non-empty line: stdout at
/// `log::info!`, stderr at `log::warn!`. Returns as soon as the child
/// exits. Only spawn failure (missing binary, permission denied) is an
/// `Err`; a non-zero exit is reported through `ExitOutcome`.
pub fn run(program: &str, args: &[&str]) -> Result<ExitOutcome> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .with_context(|| format!("failed to spawn '{program}'"))?;

    let stdout = child.stdout.take().expect("stdout was piped");
    let stderr = child.stderr.take().expect("stderr was piped");

    // Drain both streams concurrently so a child that fills one pipe
    // while the other is idle can't stall the run (the same hazard
    // piped btrfs-send/receive invocations hit).
    let stdout_thread = thread::spawn(move || drain(stdout, Level::Info));
    let stderr_thread = thread::spawn(move || drain(stderr, Level::Warn));

    let status = child
        .wait()
        .with_context(|| format!("failed to wait on '{program}'"))?;

    stdout_thread.join().expect("stdout drain thread panicked");
    stderr_thread.join().expect("stderr drain thread panicked");

    Ok(ExitOutcome {
        code: status.code(),
        success: status.success(),
    })
}

/// Runs `program` and turns a non-zero exit into an `Err` carrying the
/// command line. Convenience for the many call sites where any failure
/// is unconditionally fatal for the enclosing reconciler (spec §7,
/// error kind 2).
pub fn run_checked(program: &str, args: &[&str]) -> Result<()> {
    let outcome = run(program, args)?;
    if !outcome.success {
        anyhow::bail!(
            "'{program} {}' exited with {:?}",
            args.join(" "),
            outcome.code
        );
    }
    Ok(())
}

enum Level {
    Info,
    Warn,
}

fn drain<R: std::io::Read>(reader: R, level: Level) {
    let reader = BufReader::new(reader);
    for line in reader.lines().map_while(Result::ok) {
        if line.is_empty() {
            continue;
        }
        match level {
            Level::Info => log::info!("{line}"),
            Level::Warn => log::warn!("{line}"),
        }
    }
}
