//! Scripted [`CommandRunner`] for tests.

use crate::{ChildHandle, Command, CommandRunner, ExecError, FutureResult, Output, Result};
use std::{
  collections::VecDeque,
  sync::{Arc, Mutex, MutexGuard},
};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FakeResponse {
  /// The process exits with this output.
  Exit(Output),

  /// The process keeps running; only meaningful for started commands.
  Running,
}

impl From<Output> for FakeResponse {
  fn from(v: Output) -> Self {
    FakeResponse::Exit(v)
  }
}

struct Script {
  prefix: Vec<String>,
  responses: VecDeque<FakeResponse>,
}

impl Script {
  // The last response repeats forever.
  fn next(&mut self) -> Option<FakeResponse> {
    if self.responses.len() > 1 {
      self.responses.pop_front()
    } else {
      self.responses.front().cloned()
    }
  }
}

#[derive(Default)]
struct FakeRunnerInner {
  scripts: Vec<Script>,
  log: Vec<Command>,
}

/// Answers commands from scripts matched by argument prefix. Later scripts
/// take precedence over earlier ones with an overlapping prefix.
#[derive(Default, Clone)]
pub struct FakeRunner(Arc<Mutex<FakeRunnerInner>>);

impl FakeRunner {
  pub fn new() -> Self {
    Self::default()
  }

  fn inner(&self) -> MutexGuard<'_, FakeRunnerInner> {
    self.0.lock().unwrap_or_else(|e| e.into_inner())
  }

  /// Responds to commands whose arguments start with `prefix`, in order.
  pub fn script<I>(&self, prefix: &[&str], responses: I) -> &Self
  where
    I: IntoIterator,
    I::Item: Into<FakeResponse>,
  {
    self.inner().scripts.push(Script {
      prefix: prefix.iter().map(|s| (*s).to_owned()).collect(),
      responses: responses.into_iter().map(Into::into).collect(),
    });
    self
  }

  pub fn get_log(&self) -> Vec<Command> {
    self.inner().log.clone()
  }

  pub fn reset_log(&self) {
    self.inner().log.clear();
  }

  /// Logged commands whose arguments start with `prefix`.
  pub fn calls(&self, prefix: &[&str]) -> usize {
    self
      .inner()
      .log
      .iter()
      .filter(|c| c.has_prefix(prefix))
      .count()
  }

  fn respond(&self, command: Command) -> Result<FakeResponse> {
    let mut inner = self.inner();
    let response = inner
      .scripts
      .iter_mut()
      .rev()
      .find(|s| {
        let prefix: Vec<&str> = s.prefix.iter().map(String::as_str).collect();
        command.has_prefix(&prefix)
      })
      .and_then(Script::next);

    info!(%command, ?response, "fake runner");
    let display = command.to_string();
    inner.log.push(command);
    response.ok_or(ExecError::Unscripted(display))
  }
}

impl CommandRunner for FakeRunner {
  fn run(&self, command: Command) -> FutureResult<Output> {
    let result = self.respond(command).and_then(|response| match response {
      FakeResponse::Exit(output) => Ok(output),
      FakeResponse::Running => Err(ExecError::Unscripted(
        "running response for a command that is waited on".into(),
      )),
    });

    Box::pin(async move { result })
  }

  fn start(&self, command: Command) -> Result<Box<dyn ChildHandle>> {
    let response = self.respond(command)?;
    Ok(Box::new(FakeChild(response)))
  }
}

struct FakeChild(FakeResponse);

impl ChildHandle for FakeChild {
  fn try_wait(&mut self) -> Result<Option<Output>> {
    Ok(match &self.0 {
      FakeResponse::Exit(output) => Some(output.clone()),
      FakeResponse::Running => None,
    })
  }
}
