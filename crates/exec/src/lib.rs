//! Running external programs without blocking the async runtime.
//!
//! [`CommandRunner`] is the seam: [`OsRunner`] executes real processes on a
//! small pool of dispatcher threads, [`fake::FakeRunner`] answers from a
//! script so callers can be tested without the programs installed.

mod command;
mod dispatch;
pub mod fake;
mod os;

pub use command::*;
pub use os::OsRunner;

use futures::future::BoxFuture;
use std::{io, result};
use thiserror::Error;

pub type Result<T> = result::Result<T, ExecError>;
pub type FutureResult<T> = BoxFuture<'static, Result<T>>;

#[derive(Debug, Error)]
pub enum ExecError {
  #[error("executable {program:?} not found: {source}")]
  NotFound {
    program: String,
    #[source]
    source: which::Error,
  },

  #[error("failed to run {program:?}: {source}")]
  Io {
    program: String,
    #[source]
    source: io::Error,
  },

  #[error("no scripted response for command {0}")]
  Unscripted(String),

  #[error("command dispatcher unavailable: {0}")]
  Dispatch(String),
}

/// A process started with [`CommandRunner::start`] that is not waited on.
pub trait ChildHandle: Send + Sync {
  /// Returns the output once the process has exited, without blocking.
  fn try_wait(&mut self) -> Result<Option<Output>>;
}

pub trait CommandRunner: Send + Sync + 'static {
  /// Runs the command to completion. A non-zero exit is not an error, it is
  /// reported through [`Output::success`].
  fn run(&self, command: Command) -> FutureResult<Output>;

  /// Starts the command and returns without waiting for it to exit.
  fn start(&self, command: Command) -> Result<Box<dyn ChildHandle>>;
}
