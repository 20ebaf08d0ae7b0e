use std::fmt;
use tracing::{field, Span};

/// Records a value on the current span under the given field name. Fields
/// must be declared on the span (`fields(request, response)`) to be kept.
pub(crate) trait Record: Sized {
  fn record_field(self, field: &'static str) -> Self;

  #[inline]
  fn record_request(self) -> Self {
    self.record_field("request")
  }

  #[inline]
  fn record_response(self) -> Self {
    self.record_field("response")
  }
}

impl<T: fmt::Debug> Record for T {
  #[inline]
  fn record_field(self, field: &'static str) -> Self {
    Span::current().record(field, &field::debug(&self));
    self
  }
}

#[inline]
pub(crate) fn record_request<T: fmt::Debug>(request: T) -> T {
  request.record_request()
}

/// Turns an empty string into `None`.
#[inline]
pub(crate) fn non_empty(value: String) -> Option<String> {
  if value.is_empty() {
    None
  } else {
    Some(value)
  }
}

/// Fails with `InvalidArgument` carrying `message` when `value` is empty.
#[inline]
pub(crate) fn required(value: String, message: &'static str) -> Result<String, tonic::Status> {
  non_empty(value).ok_or_else(|| tonic::Status::invalid_argument(message))
}
