//! Bulk share copies driven through `azcopy`.
//!
//! The copy runs detached. Progress is read back from `azcopy jobs list` and
//! `azcopy jobs show`, so a retried request resumes the job an earlier
//! attempt launched instead of starting a second one.

use crate::{
  error::{Error, Result},
  sas::account_sas,
};
use azurefile_exec::{Arg, ChildHandle, Command, CommandRunner, Output};
use chrono::Utc;
use std::{fmt, sync::Arc, time::Duration};
use tokio::time::{sleep, Instant};
use tracing::{debug, info, instrument, warn};

const MIN_SAS_LIFETIME: Duration = Duration::from_secs(3600);

/// Progress of an azcopy job as the tool reports it.
#[derive(Debug, Clone, PartialEq)]
pub enum JobStatus {
  Completed,
  InProgress(f64),
  Failed(String),
  NotFound,
}

impl JobStatus {
  fn from_status_word(word: &str) -> Self {
    match word {
      "Completed" => JobStatus::Completed,
      "InProgress" => JobStatus::InProgress(0.0),
      other => JobStatus::Failed(format!("azcopy job status: {}", other)),
    }
  }
}

fn strip_query(url: &str) -> &str {
  url.split('?').next().unwrap_or(url)
}

/// Finds the job in `azcopy jobs list` output whose destination is
/// `destination` (compared without query string).
pub fn find_job(list_output: &str, destination: &str) -> Option<(String, JobStatus)> {
  let mut id: Option<&str> = None;
  let mut status: Option<&str> = None;

  for line in list_output.lines().map(str::trim) {
    if let Some(v) = line.strip_prefix("JobId:") {
      id = Some(v.trim());
      status = None;
    } else if let Some(v) = line.strip_prefix("Status:") {
      status = Some(v.trim());
    } else if let Some(v) = line.strip_prefix("Command:") {
      let mut words = v.split_whitespace();
      let targets_destination = words.next() == Some("copy")
        && words.nth(1).map(strip_query) == Some(strip_query(destination));

      if let (true, Some(id)) = (targets_destination, id) {
        let status = status.map_or(JobStatus::InProgress(0.0), JobStatus::from_status_word);
        return Some((id.to_owned(), status));
      }
    }
  }

  None
}

/// Reads the status out of `azcopy jobs show <id>` output.
pub fn parse_job_show(output: &str) -> JobStatus {
  let mut percent = None;
  let mut final_status = None;

  for line in output.lines().map(str::trim) {
    if let Some(v) = line.strip_prefix("Percent Complete (approx):") {
      percent = v.trim().parse::<f64>().ok();
    } else if let Some(v) = line.strip_prefix("Final Job Status:") {
      final_status = Some(v.trim());
    }
  }

  match (final_status, percent) {
    (Some("InProgress"), p) => JobStatus::InProgress(p.unwrap_or(0.0)),
    (Some(word), _) => JobStatus::from_status_word(word),
    (None, Some(p)) => JobStatus::InProgress(p),
    (None, None) => JobStatus::NotFound,
  }
}

/// Identity azcopy logs in with instead of a SAS token.
#[derive(Clone, Default)]
pub struct IdentitySettings {
  pub tenant_id: String,
  pub client_id: String,
  pub client_secret: String,
  pub use_managed_identity: bool,
  pub user_assigned_identity_id: String,
}

impl fmt::Debug for IdentitySettings {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("IdentitySettings")
      .field("tenant_id", &self.tenant_id)
      .field("client_id", &self.client_id)
      .field("client_secret", &"<redacted>")
      .field("use_managed_identity", &self.use_managed_identity)
      .field("user_assigned_identity_id", &self.user_assigned_identity_id)
      .finish()
  }
}

impl IdentitySettings {
  /// Environment for azcopy's automatic login.
  pub fn azcopy_env(&self) -> Result<Vec<(String, Arg)>> {
    if self.use_managed_identity {
      let mut env = vec![("AZCOPY_AUTO_LOGIN_TYPE".to_owned(), Arg::from("MSI"))];
      if !self.user_assigned_identity_id.is_empty() {
        env.push((
          "AZCOPY_MSI_CLIENT_ID".to_owned(),
          Arg::from(self.user_assigned_identity_id.as_str()),
        ));
      }
      return Ok(env);
    }

    if !self.client_secret.is_empty() {
      if self.client_id.is_empty() || self.tenant_id.is_empty() {
        return Err(Error::validation(
          "AADClientID and TenantID must be set when use service principal",
        ));
      }

      return Ok(vec![
        ("AZCOPY_AUTO_LOGIN_TYPE".to_owned(), Arg::from("SPN")),
        ("AZCOPY_SPA_APPLICATION_ID".to_owned(), Arg::from(self.client_id.as_str())),
        (
          "AZCOPY_SPA_CLIENT_SECRET".to_owned(),
          Arg::sensitive(self.client_secret.as_str()),
        ),
        ("AZCOPY_TENANT_ID".to_owned(), Arg::from(self.tenant_id.as_str())),
      ]);
    }

    Err(Error::validation(
      "neither the service principal nor the managed identity has been set",
    ))
  }
}

#[derive(Debug, Clone)]
pub struct CopyOptions {
  pub azcopy: String,
  pub extra_args: Vec<String>,
  pub poll_interval: Duration,
  pub timeout: Duration,
  /// Authorize with SAS tokens even when an identity is configured.
  pub use_sas_token: bool,
}

impl Default for CopyOptions {
  fn default() -> Self {
    CopyOptions {
      azcopy: "azcopy".to_owned(),
      extra_args: Vec::new(),
      poll_interval: Duration::from_secs(5),
      timeout: Duration::from_secs(5 * 60),
      use_sas_token: true,
    }
  }
}

/// A share on one side of a copy.
#[derive(Clone)]
pub struct ShareLocation {
  pub account: String,
  pub share: String,
  pub key: String,
}

impl fmt::Debug for ShareLocation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ShareLocation")
      .field("account", &self.account)
      .field("share", &self.share)
      .field("key", &"<redacted>")
      .finish()
  }
}

#[derive(Debug, Clone)]
pub struct CopyRequest {
  pub source: ShareLocation,
  /// Copy from this snapshot of the source instead of the live share.
  pub snapshot: Option<String>,
  pub destination: ShareLocation,
  pub endpoint_suffix: String,
}

impl CopyRequest {
  fn url(&self, location: &ShareLocation) -> String {
    format!(
      "https://{}.file.{}/{}",
      location.account, self.endpoint_suffix, location.share
    )
  }

  pub fn source_url(&self) -> String {
    let url = self.url(&self.source);
    match &self.snapshot {
      Some(tag) => format!("{}?sharesnapshot={}", url, tag),
      None => url,
    }
  }

  pub fn destination_url(&self) -> String {
    self.url(&self.destination)
  }
}

fn with_token(url: String, token: &str) -> Arg {
  let separator = if url.contains('?') { '&' } else { '?' };
  Arg::sensitive(format!("{}{}{}", url, separator, token))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyState {
  NotStarted,
  Launched,
  Polling,
  Completed,
  Failed,
  TimedOut,
}

/// One copy as tracked by the orchestrator.
#[derive(Debug)]
struct CopyJob {
  destination: String,
  id: Option<String>,
  state: CopyState,
}

impl CopyJob {
  fn transition(&mut self, state: CopyState) {
    if self.state != state {
      debug!(destination = %self.destination, from = ?self.state, to = ?state, "copy state");
      self.state = state;
    }
  }
}

pub struct CopyOrchestrator {
  runner: Arc<dyn CommandRunner>,
  options: CopyOptions,
  identity: Option<IdentitySettings>,
}

impl CopyOrchestrator {
  pub fn new(
    runner: Arc<dyn CommandRunner>,
    options: CopyOptions,
    identity: Option<IdentitySettings>,
  ) -> Self {
    CopyOrchestrator {
      runner,
      options,
      identity,
    }
  }

  fn sas(&self, location: &ShareLocation) -> Result<String> {
    let lifetime = self.options.timeout.max(MIN_SAS_LIFETIME);
    let expiry = Utc::now()
      + chrono::Duration::from_std(lifetime).unwrap_or_else(|_| chrono::Duration::hours(1));

    account_sas(&location.account, &location.key, expiry).map_err(|err| {
      Error::backend(format!(
        "failed to generate sas token in creating new shared key credential, accountName: {}, err: {}",
        location.account, err
      ))
    })
  }

  /// The copy command, authorized by identity when configured and allowed,
  /// falling back to SAS tokens.
  fn copy_command(&self, request: &CopyRequest) -> Result<Command> {
    let identity = match (&self.identity, self.options.use_sas_token) {
      (Some(identity), false) => match identity.azcopy_env() {
        Ok(env) => Some(env),
        Err(err) => {
          warn!(%err, "azcopy identity login unavailable, falling back to sas token");
          None
        }
      },
      _ => None,
    };

    let mut command = Command::new(&self.options.azcopy).arg("copy");
    command = match identity {
      Some(env) => {
        let mut command = command
          .arg(request.source_url())
          .arg(request.destination_url());
        for (key, value) in env {
          command = command.env(key, value);
        }
        command
      }
      None => command
        .arg(with_token(request.source_url(), &self.sas(&request.source)?))
        .arg(with_token(request.destination_url(), &self.sas(&request.destination)?)),
    };

    Ok(
      command
        .args(vec!["--recursive", "--check-length=false"])
        .args(self.options.extra_args.iter().map(String::as_str)),
    )
  }

  async fn run(&self, args: &[&str]) -> Result<Output> {
    let command = Command::new(&self.options.azcopy).args(args.iter().copied());
    self
      .runner
      .run(command)
      .await
      .map_err(|err| Error::backend(format!("azcopy {} failed: {}", args.join(" "), err)))
  }

  /// Job targeting `destination`, with its detailed status when it runs.
  async fn job_status(&self, destination: &str) -> Result<Option<(String, JobStatus)>> {
    let list = self.run(&["jobs", "list"]).await?;
    if !list.success() {
      warn!(output = list.text(), "azcopy jobs list failed");
      return Ok(None);
    }

    match find_job(list.text(), destination) {
      Some((id, JobStatus::InProgress(_))) => {
        let show = self.run(&["jobs", "show", &id]).await?;
        let status = match parse_job_show(show.text()) {
          JobStatus::NotFound => JobStatus::InProgress(0.0),
          status => status,
        };
        Ok(Some((id, status)))
      }
      found => Ok(found),
    }
  }

  /// Copies the source share into the destination and waits for the job.
  #[instrument(skip(self, request), fields(source = %request.source.share, destination = %request.destination.share))]
  pub async fn copy(&self, request: &CopyRequest) -> Result<()> {
    if request.source.account.is_empty()
      || request.source.share.is_empty()
      || request.destination.share.is_empty()
    {
      return Err(Error::validation(format!(
        "one or more of srcAccountName({}), srcFileShareName({}), dstFileShareName({}) are empty",
        request.source.account, request.source.share, request.destination.share
      )));
    }

    let destination = request.destination_url();
    let deadline = Instant::now() + self.options.timeout;
    let mut job = CopyJob {
      destination: destination.clone(),
      id: None,
      state: CopyState::NotStarted,
    };
    let mut child: Option<Box<dyn ChildHandle>> = None;

    match self.job_status(&destination).await? {
      Some((_, JobStatus::Completed)) => {
        info!("copy already completed");
        job.transition(CopyState::Completed);
        return Ok(());
      }
      Some((id, JobStatus::Failed(cause))) => {
        job.transition(CopyState::Failed);
        return Err(Error::backend(format!("azcopy job {} failed: {}", id, cause)));
      }
      Some((id, _)) => {
        info!(job = %id, "resuming running azcopy job");
        job.id = Some(id);
        job.transition(CopyState::Polling);
      }
      None => {
        let command = self.copy_command(request)?;
        info!(%command, "starting azcopy");
        child = Some(self.runner.start(command).map_err(|err| {
          Error::backend(format!("failed to start azcopy: {}", err))
        })?);
        job.transition(CopyState::Launched);
      }
    }

    loop {
      sleep(self.options.poll_interval).await;

      match self.job_status(&destination).await? {
        Some((_, JobStatus::Completed)) => {
          job.transition(CopyState::Completed);
          info!(job = ?job.id, "copy completed");
          return Ok(());
        }
        Some((id, JobStatus::Failed(cause))) => {
          job.transition(CopyState::Failed);
          return Err(Error::backend(format!("azcopy job {} failed: {}", id, cause)));
        }
        Some((id, JobStatus::InProgress(percent))) => {
          job.id = Some(id);
          job.transition(CopyState::Polling);
          debug!(job = ?job.id, percent, "copy in progress");
        }
        Some((_, JobStatus::NotFound)) | None => {
          let exited = match child.as_mut() {
            Some(child) => child
              .try_wait()
              .map_err(|err| Error::backend(format!("failed to wait for azcopy: {}", err)))?,
            None => None,
          };

          match exited {
            Some(output) if output.success() => {
              job.transition(CopyState::Completed);
              return Ok(());
            }
            Some(output) => {
              job.transition(CopyState::Failed);
              return Err(Error::backend(format!(
                "azcopy copy failed with exit code {:?}: {}",
                output.code(),
                output.text().trim()
              )));
            }
            None => (),
          }
        }
      }

      if Instant::now() >= deadline {
        job.transition(CopyState::TimedOut);
        return Err(Error::Timeout(format!(
          "wait timeout for azcopy job on destination {} after {:?}",
          request.destination.share, self.options.timeout
        )));
      }
    }
  }
}
