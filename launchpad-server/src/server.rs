// HTTP server loop

use hyper::Request;
use hyper::body::Incoming as IncomingBody;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use launchpad_campaign::CancellationToken;
use std::convert::Infallible;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, info};

use crate::App;

/// Accept connections until `shutdown` fires.
///
/// Each connection is served on a task tracked by `AppState::tasks`. Once the
/// listener stops, open connections finish their current request and close,
/// and `serve` resolves only after every tracked task (including pending
/// welcome emails) is done. Campaigns observe `AppState::shutdown`, so pass
/// the same token to have them stop and answer with partial results.
pub async fn serve(
    listener: TcpListener,
    app: Arc<App>,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    let addr = listener.local_addr()?;
    let tasks = app.state().tasks.clone();
    info!(%addr, "Server listening");

    loop {
        let (stream, peer) = tokio::select! {
            accepted = listener.accept() => accepted?,
            _ = shutdown.cancelled() => break,
        };

        let io = TokioIo::new(stream);
        let app = app.clone();
        let shutdown = shutdown.clone();

        tasks.spawn(async move {
            let service = service_fn(move |req: Request<IncomingBody>| {
                let app = app.clone();
                async move { Ok::<_, Infallible>(app.serve(req).await) }
            });

            let conn = http1::Builder::new().serve_connection(io, service);
            tokio::pin!(conn);

            let result = tokio::select! {
                result = conn.as_mut() => result,
                _ = shutdown.cancelled() => {
                    conn.as_mut().graceful_shutdown();
                    conn.await
                }
            };

            if let Err(err) = result {
                debug!(%peer, error = %err, "Error serving connection");
            }
        });
    }

    info!(open = tasks.len(), "Server stopped accepting connections");
    tasks.close();
    tasks.wait().await;

    info!("Server stopped");
    Ok(())
}

/// Cancel `shutdown` on Ctrl-C.
pub fn cancel_on_ctrl_c(shutdown: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown requested");
            shutdown.cancel();
        }
    });
}
