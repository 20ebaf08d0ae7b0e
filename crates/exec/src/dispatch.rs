use crate::{ExecError, Result};
use futures::channel::oneshot;
use once_cell::sync::OnceCell;
use std::{
  future::Future,
  panic::{catch_unwind, AssertUnwindSafe},
};
use tracing::{error, Span};

const WORKERS: usize = 4;

struct Job {
  span: Span,
  run: Box<dyn FnOnce() + Send>,
}

type Dispatcher = crossbeam::channel::Sender<Job>;

static DISPATCHER: OnceCell<Dispatcher> = OnceCell::new();

// Blocking process work runs on these threads so the async runtime never
// waits on a child process.
fn dispatcher() -> Result<&'static Dispatcher> {
  DISPATCHER.get_or_try_init(|| {
    let (sender, receiver) = crossbeam::channel::unbounded::<Job>();

    for n in 0..WORKERS {
      let receiver = receiver.clone();
      std::thread::Builder::new()
        .name(format!("azurefile-exec:{}", n))
        .spawn(move || {
          while let Ok(Job { span, run }) = receiver.recv() {
            let _enter = span.enter();
            if let Err(e) = catch_unwind(AssertUnwindSafe(run)) {
              error!("command job panicked in dispatcher: {:?}", e);
            }
          }
        })
        .map_err(|e| ExecError::Dispatch(format!("failed to spawn worker: {}", e)))?;
    }

    Ok(sender)
  })
}

/// Runs `f` on a dispatcher thread inside the caller's span.
pub(crate) fn run<R, F>(f: F) -> impl Future<Output = Result<R>>
where
  F: FnOnce() -> Result<R> + Send + 'static,
  R: Send + 'static,
{
  let (sender, receiver) = oneshot::channel();
  let sent = dispatcher().and_then(|dispatch| {
    dispatch
      .send(Job {
        span: Span::current(),
        run: Box::new(move || {
          let _ = sender.send(f());
        }),
      })
      .map_err(|_| ExecError::Dispatch("dispatcher has shut down".into()))
  });

  async move {
    sent?;
    match receiver.await {
      Ok(r) => r,
      Err(_) => Err(ExecError::Dispatch(
        "request was cancelled (worker panicked?)".into(),
      )),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn returns_closure_result() {
    let value = run(|| Ok(21 * 2)).await.unwrap();
    assert_eq!(value, 42);
  }

  #[tokio::test]
  async fn panicking_job_reports_cancellation() {
    let result: Result<()> = run(|| panic!("boom")).await;
    assert!(matches!(result, Err(ExecError::Dispatch(_))));

    // Workers survive the panic.
    assert_eq!(run(|| Ok("still alive")).await.unwrap(), "still alive");
  }
}
