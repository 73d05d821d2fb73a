//! TCP server for the mock HTTP services.
//!
//! Accepts connections under a connection limit and hands each one to
//! hyper, which dispatches requests to the configured service. HTTP/1.1
//! connections are kept alive across requests unless the client asks
//! otherwise; HTTP/2 is negotiated from the connection preface.

use crate::config::Config;
use crate::http::{self, Request};
use crate::services::Service;
use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder;
use std::convert::Infallible;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, trace, warn};

/// Listen backlog
const BACKLOG: i32 = 1024;

/// Server instance
pub struct Server {
    listener: TcpListener,
    service: Arc<Service>,
    connection_limit: Arc<Semaphore>,
}

impl Server {
    /// Bind the configured listen address
    pub async fn bind(config: &Config, service: Service) -> io::Result<Self> {
        let addr = tokio::net::lookup_host(&config.listen)
            .await?
            .next()
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("listen address '{}' did not resolve", config.listen),
                )
            })?;

        let server = Server {
            listener: TcpListener::from_std(create_listener(addr)?)?,
            service: Arc::new(service),
            connection_limit: Arc::new(Semaphore::new(config.max_connections)),
        };
        info!(
            address = %server.local_addr()?,
            max_connections = config.max_connections,
            "Server listening"
        );

        Ok(server)
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections until the process exits
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        loop {
            // Wait for a connection slot
            let permit = self.connection_limit.clone().acquire_owned().await?;

            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    debug!(peer = %addr, "New connection");
                    if let Err(e) = stream.set_nodelay(true) {
                        trace!(error = %e, "Failed to set TCP_NODELAY");
                    }

                    let service = Arc::clone(&self.service);

                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, service).await {
                            debug!(error = %e, "Connection error");
                        }
                        drop(permit);
                    });
                }
                Err(e) => {
                    error!(error = %e, "Failed to accept connection");
                }
            }
        }
    }
}

/// Create a non-blocking TCP listener with SO_REUSEADDR so restarts can
/// rebind immediately.
fn create_listener(addr: SocketAddr) -> io::Result<std::net::TcpListener> {
    let socket = socket2::Socket::new(
        match addr {
            SocketAddr::V4(_) => socket2::Domain::IPV4,
            SocketAddr::V6(_) => socket2::Domain::IPV6,
        },
        socket2::Type::STREAM,
        Some(socket2::Protocol::TCP),
    )?;

    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    socket.listen(BACKLOG)?;

    Ok(socket.into())
}

/// Serve requests on a single client connection
pub(crate) async fn handle_connection<S>(
    stream: S,
    service: Arc<Service>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let mut builder = Builder::new(TokioExecutor::new());
    builder
        .http1()
        .max_buf_size(http::MAX_HEADER_SIZE)
        .pipeline_flush(true);

    let result = builder
        .serve_connection(
            TokioIo::new(stream),
            service_fn(move |request| {
                let service = Arc::clone(&service);
                async move { Ok::<_, Infallible>(respond(&service, request).await) }
            }),
        )
        .await;

    trace!("Connection closed");
    result
}

/// Collect the request body and run the service
async fn respond(
    service: &Service,
    request: hyper::Request<Incoming>,
) -> hyper::Response<Full<Bytes>> {
    let (parts, body) = request.into_parts();

    let response = match http::collect_body(body).await {
        Ok(body) => {
            let request = Request::from_parts(parts, body);
            let response = service.handle(&request);
            debug!(
                method = %request.method(),
                path = %request.uri().path(),
                status = response.status().as_u16(),
                "Handled request"
            );
            response
        }
        Err(response) => {
            warn!(
                method = %parts.method,
                path = %parts.uri.path(),
                status = response.status().as_u16(),
                "Rejected request body"
            );
            response
        }
    };

    response.map(Full::new)
}
