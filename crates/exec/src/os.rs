use crate::{dispatch, ChildHandle, Command, CommandRunner, ExecError, FutureResult, Output, Result};
use duct::{cmd, Expression, Handle};
use std::path::PathBuf;
use tracing::{debug, Instrument};
use which::which;

/// Runs commands as real child processes.
#[derive(Debug, Default, Clone)]
pub struct OsRunner;

impl OsRunner {
  pub fn new() -> Self {
    OsRunner
  }
}

fn resolve(program: &str) -> Result<PathBuf> {
  which(program).map_err(|source| ExecError::NotFound {
    program: program.to_owned(),
    source,
  })
}

fn expression(command: &Command) -> Result<Expression> {
  let path = resolve(command.program())?;
  let args: Vec<&str> = command.get_args().iter().map(|a| a.value()).collect();

  let mut expr = cmd(path, args);
  for (key, value) in command.get_env() {
    expr = expr.env(key, value.value());
  }

  Ok(expr.stderr_to_stdout().stdout_capture().unchecked())
}

impl CommandRunner for OsRunner {
  fn run(&self, command: Command) -> FutureResult<Output> {
    Box::pin(
      async move {
        debug!(%command, "running");
        dispatch::run(move || {
          let program = command.program().to_owned();
          expression(&command)?
            .run()
            .map(Output::from)
            .map_err(|source| ExecError::Io { program, source })
        })
        .await
      }
      .in_current_span(),
    )
  }

  fn start(&self, command: Command) -> Result<Box<dyn ChildHandle>> {
    debug!(%command, "starting");
    let handle = expression(&command)?
      .start()
      .map_err(|source| ExecError::Io {
        program: command.program().to_owned(),
        source,
      })?;

    Ok(Box::new(OsChild {
      program: command.program().to_owned(),
      handle,
    }))
  }
}

struct OsChild {
  program: String,
  handle: Handle,
}

impl ChildHandle for OsChild {
  fn try_wait(&mut self) -> Result<Option<Output>> {
    match self.handle.try_wait() {
      Ok(output) => Ok(output.cloned().map(Output::from)),
      Err(source) => Err(ExecError::Io {
        program: self.program.clone(),
        source,
      }),
    }
  }
}

#[cfg(all(test, unix))]
mod tests {
  use super::*;
  use crate::Arg;

  #[tokio::test]
  async fn captures_combined_output() {
    let output = OsRunner::new()
      .run(
        Command::new("sh")
          .args(vec!["-c", "echo out; echo err 1>&2; exit 3"]),
      )
      .await
      .unwrap();

    assert_eq!(output.code(), Some(3));
    assert!(output.text().contains("out"));
    assert!(output.text().contains("err"));
  }

  #[tokio::test]
  async fn passes_environment() {
    let output = OsRunner::new()
      .run(
        Command::new("sh")
          .args(vec!["-c", "printf %s \"$TOKEN\""])
          .env("TOKEN", Arg::sensitive("abc")),
      )
      .await
      .unwrap();

    assert!(output.success());
    assert_eq!(output.text(), "abc");
  }

  #[tokio::test]
  async fn missing_program_is_not_found() {
    let err = OsRunner::new()
      .run(Command::new("definitely-not-a-real-program-name"))
      .await
      .unwrap_err();

    assert!(matches!(err, ExecError::NotFound { .. }));
  }
}
