use crate::{controller::Controller, proto, ControllerService};
use std::{
  fmt, io,
  net::SocketAddr,
  path::PathBuf,
  pin::Pin,
  str::FromStr,
  sync::Arc,
  task::{Context, Poll},
};
use thiserror::Error;
use tokio::{
  io::{AsyncRead, AsyncWrite, ReadBuf},
  net::{UnixListener, UnixStream},
};
use tokio_stream::{wrappers::UnixListenerStream, StreamExt};
use tonic::transport::{server::Connected, Server};
use tracing::info;

/// Where the gRPC server listens: `unix:///path/to/csi.sock` or
/// `tcp://host:port`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
  Unix(PathBuf),
  Tcp(SocketAddr),
}

impl FromStr for Endpoint {
  type Err = ServeError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let invalid = || ServeError::InvalidEndpoint(s.to_owned());

    if let Some(path) = s.strip_prefix("unix://") {
      if path.is_empty() {
        return Err(invalid());
      }

      Ok(Endpoint::Unix(PathBuf::from(path)))
    } else if let Some(addr) = s.strip_prefix("tcp://") {
      addr.parse().map(Endpoint::Tcp).map_err(|_| invalid())
    } else {
      Err(invalid())
    }
  }
}

impl fmt::Display for Endpoint {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Endpoint::Unix(path) => write!(f, "unix://{}", path.display()),
      Endpoint::Tcp(addr) => write!(f, "tcp://{}", addr),
    }
  }
}

#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ServeError {
  #[error("invalid endpoint {0:?}, expected unix://<path> or tcp://<host:port>")]
  InvalidEndpoint(String),

  #[error("failed to bind endpoint: {0}")]
  Bind(#[from] io::Error),

  #[error(transparent)]
  Transport(#[from] tonic::transport::Error),
}

#[derive(Debug)]
struct UdsStream(UnixStream);

impl Connected for UdsStream {}

impl AsyncRead for UdsStream {
  fn poll_read(
    mut self: Pin<&mut Self>,
    cx: &mut Context<'_>,
    buf: &mut ReadBuf<'_>,
  ) -> Poll<io::Result<()>> {
    Pin::new(&mut self.0).poll_read(cx, buf)
  }
}

impl AsyncWrite for UdsStream {
  fn poll_write(
    mut self: Pin<&mut Self>,
    cx: &mut Context<'_>,
    buf: &[u8],
  ) -> Poll<io::Result<usize>> {
    Pin::new(&mut self.0).poll_write(cx, buf)
  }

  fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
    Pin::new(&mut self.0).poll_flush(cx)
  }

  fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
    Pin::new(&mut self.0).poll_shutdown(cx)
  }
}

/// Serves the identity and controller services until `shutdown` resolves.
/// A stale unix socket left by a previous run is removed before binding.
pub async fn serve<T, F>(service: T, endpoint: &Endpoint, shutdown: F) -> Result<(), ServeError>
where
  T: ControllerService,
  F: std::future::Future<Output = ()>,
{
  let controller = Controller(Arc::new(service));
  let router = Server::builder()
    .add_service(proto::identity_server::IdentityServer::new(controller.clone()))
    .add_service(proto::controller_server::ControllerServer::new(controller));

  match endpoint {
    Endpoint::Unix(path) => {
      match tokio::fs::remove_file(path).await {
        Ok(()) => info!(path = %path.display(), "removed stale socket"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => (),
        Err(e) => return Err(e.into()),
      }

      let listener = UnixListener::bind(path)?;
      info!(%endpoint, "listening");
      let incoming = UnixListenerStream::new(listener).map(|s| s.map(UdsStream));
      router
        .serve_with_incoming_shutdown(incoming, shutdown)
        .await?;
    }

    Endpoint::Tcp(addr) => {
      info!(%endpoint, "listening");
      router.serve_with_shutdown(*addr, shutdown).await?;
    }
  }

  info!("server stopped");
  Ok(())
}
