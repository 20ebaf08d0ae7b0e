use std::fmt;

/// A single program argument or environment value. Sensitive values are
/// passed to the process untouched but never printed.
#[derive(Clone, PartialEq, Eq)]
pub enum Arg {
  Plain(String),
  Sensitive(String),
}

impl Arg {
  #[inline]
  pub fn sensitive(value: impl Into<String>) -> Self {
    Arg::Sensitive(value.into())
  }

  #[inline]
  pub fn value(&self) -> &str {
    match self {
      Arg::Plain(v) | Arg::Sensitive(v) => v,
    }
  }

  #[inline]
  pub fn is_sensitive(&self) -> bool {
    matches!(self, Arg::Sensitive(_))
  }
}

impl From<String> for Arg {
  #[inline]
  fn from(v: String) -> Self {
    Arg::Plain(v)
  }
}

impl From<&str> for Arg {
  #[inline]
  fn from(v: &str) -> Self {
    Arg::Plain(v.to_owned())
  }
}

impl fmt::Debug for Arg {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Arg::Plain(v) => fmt::Debug::fmt(v, f),
      Arg::Sensitive(_) => f.write_str("<redacted>"),
    }
  }
}

#[derive(Clone, PartialEq, Eq)]
pub struct Command {
  program: String,
  args: Vec<Arg>,
  env: Vec<(String, Arg)>,
}

impl Command {
  pub fn new(program: impl Into<String>) -> Self {
    Command {
      program: program.into(),
      args: Vec::new(),
      env: Vec::new(),
    }
  }

  pub fn arg(mut self, arg: impl Into<Arg>) -> Self {
    self.args.push(arg.into());
    self
  }

  pub fn args<I>(mut self, args: I) -> Self
  where
    I: IntoIterator,
    I::Item: Into<Arg>,
  {
    self.args.extend(args.into_iter().map(Into::into));
    self
  }

  pub fn env(mut self, key: impl Into<String>, value: impl Into<Arg>) -> Self {
    self.env.push((key.into(), value.into()));
    self
  }

  #[inline]
  pub fn program(&self) -> &str {
    &self.program
  }

  #[inline]
  pub fn get_args(&self) -> &[Arg] {
    &self.args
  }

  #[inline]
  pub fn get_env(&self) -> &[(String, Arg)] {
    &self.env
  }

  /// True when the arguments start with `prefix`.
  pub fn has_prefix(&self, prefix: &[&str]) -> bool {
    self.args.len() >= prefix.len()
      && self
        .args
        .iter()
        .zip(prefix)
        .all(|(arg, expected)| arg.value() == *expected)
  }
}

impl fmt::Debug for Command {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Command")
      .field("program", &self.program)
      .field("args", &self.args)
      .field("env", &self.env)
      .finish()
  }
}

impl fmt::Display for Command {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.program)?;
    for arg in &self.args {
      match arg {
        Arg::Plain(v) => write!(f, " {}", v)?,
        Arg::Sensitive(_) => f.write_str(" <redacted>")?,
      }
    }

    Ok(())
  }
}

/// Exit status and combined stdout/stderr of a finished process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Output {
  code: Option<i32>,
  text: String,
}

impl Output {
  pub fn new(code: Option<i32>, text: impl Into<String>) -> Self {
    Output {
      code,
      text: text.into(),
    }
  }

  #[inline]
  pub fn ok(text: impl Into<String>) -> Self {
    Output::new(Some(0), text)
  }

  #[inline]
  pub fn failed(code: i32, text: impl Into<String>) -> Self {
    Output::new(Some(code), text)
  }

  /// `None` when the process was killed by a signal.
  #[inline]
  pub fn code(&self) -> Option<i32> {
    self.code
  }

  #[inline]
  pub fn success(&self) -> bool {
    self.code == Some(0)
  }

  #[inline]
  pub fn text(&self) -> &str {
    &self.text
  }
}

impl From<std::process::Output> for Output {
  fn from(v: std::process::Output) -> Self {
    let mut text = String::from_utf8_lossy(&v.stdout).into_owned();
    if !v.stderr.is_empty() {
      text.push_str(&String::from_utf8_lossy(&v.stderr));
    }

    Output::new(v.status.code(), text)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use test_case::test_case;

  fn azcopy() -> Command {
    Command::new("azcopy")
      .args(vec!["copy", "https://src/share?sv=1", "https://dst/share"])
      .arg(Arg::sensitive("--secret"))
      .env("AZCOPY_SPA_CLIENT_SECRET", Arg::sensitive("hunter2"))
      .env("AZCOPY_AUTO_LOGIN_TYPE", "SPN")
  }

  #[test]
  fn debug_redacts_sensitive_values() {
    let printed = format!("{:?}", azcopy());
    assert!(!printed.contains("hunter2"));
    assert!(!printed.contains("--secret"));
    assert!(printed.contains("SPN"));
  }

  #[test]
  fn display_redacts_sensitive_args() {
    assert_eq!(
      azcopy().to_string(),
      "azcopy copy https://src/share?sv=1 https://dst/share <redacted>"
    );
  }

  #[test_case(&["copy"] => true ; "first word")]
  #[test_case(&["copy", "https://src/share?sv=1"] => true ; "two words")]
  #[test_case(&["jobs", "list"] => false ; "other subcommand")]
  #[test_case(&[] => true ; "empty prefix")]
  fn prefix_match(prefix: &[&str]) -> bool {
    azcopy().has_prefix(prefix)
  }

  #[test_case(Some(0) => true)]
  #[test_case(Some(1) => false)]
  #[test_case(None => false ; "killed")]
  fn output_success(code: Option<i32>) -> bool {
    Output::new(code, "").success()
  }
}
