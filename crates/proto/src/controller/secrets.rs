use std::{collections::HashMap, fmt};

/// Request secrets. Keys are shown when debug-printed, values never are.
#[derive(Default, Clone)]
pub(crate) struct Secrets(HashMap<String, String>);

impl AsRef<HashMap<String, String>> for Secrets {
  #[inline]
  fn as_ref(&self) -> &HashMap<String, String> {
    &self.0
  }
}

impl From<HashMap<String, String>> for Secrets {
  #[inline]
  fn from(v: HashMap<String, String>) -> Self {
    Secrets(v)
  }
}

impl fmt::Debug for Secrets {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let mut keys: Vec<_> = self.0.keys().collect();
    keys.sort();

    let mut m = f.debug_map();
    for k in keys {
      m.key(k).value(&"<redacted>");
    }

    m.finish()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn debug_hides_values() {
    let secrets: Secrets = vec![
      ("azurestorageaccountname".to_owned(), "acct".to_owned()),
      ("azurestorageaccountkey".to_owned(), "c2VjcmV0".to_owned()),
    ]
    .into_iter()
    .collect::<HashMap<_, _>>()
    .into();

    let printed = format!("{:?}", secrets);
    assert!(!printed.contains("c2VjcmV0"));
    assert!(!printed.contains("\"acct\""));
    assert_eq!(
      printed,
      r#"{"azurestorageaccountkey": "<redacted>", "azurestorageaccountname": "<redacted>"}"#
    );
  }
}
