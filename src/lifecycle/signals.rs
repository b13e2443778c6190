//! OS signal handling.
//!
//! SIGINT and SIGTERM both resolve [`wait_for_termination`]; the caller turns
//! that into a [`Shutdown::trigger`](super::Shutdown::trigger).

/// Wait for the first termination signal.
#[cfg(unix)]
pub async fn wait_for_termination() -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result?,
        _ = terminate.recv() => {}
    }
    tracing::info!("Shutdown signal received");
    Ok(())
}

/// Wait for the first termination signal.
#[cfg(not(unix))]
pub async fn wait_for_termination() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");
    Ok(())
}
