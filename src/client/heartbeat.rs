//! Background heartbeat task.
//!
//! Runs inside the protected application process on its own schedule,
//! decoupled from ordinary application work. Each tick renews the session;
//! on graceful shutdown the session is released with a bounded wait so
//! cleanup never blocks process exit.
//!
//! # Failure policy
//!
//! - A transport failure is logged and retried on the next tick. It never
//!   terminates the host process.
//! - `session_expired` means another device reclaimed the key (or an
//!   operator cleared the session); renewal cannot fix that, so the task
//!   falls back to a full acquisition. Only a sustained run of failed
//!   recoveries flags the session as lost.
//! - `revoked` and `invalid_key` are terminal; the session is flagged lost
//!   immediately.
//!
//! The task only ever *flags* loss, via a watch channel; whether to stop
//! the application is the host's decision.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::client::{ActivationClient, ClientError, Rejection};

/// Consecutive failed recoveries before the session is declared lost.
const SESSION_LOST_THRESHOLD: u32 = 3;

/// Bounded wait for the shutdown-time release call.
const RELEASE_GRACE: Duration = Duration::from_secs(3);

/// Bounded wait for the whole task to wind down on shutdown.
const SHUTDOWN_WAIT: Duration = Duration::from_secs(5);

/// Handle to a running heartbeat task.
pub struct Heartbeat {
    stop: watch::Sender<bool>,
    session_lost: watch::Receiver<bool>,
    task: JoinHandle<()>,
}

impl Heartbeat {
    /// Spawns the heartbeat loop.
    ///
    /// `initial_period` is the wait before the first renewal; after each
    /// successful renewal the server-recommended interval takes over.
    pub fn spawn(client: ActivationClient, initial_period: Duration) -> Self {
        let (stop_tx, stop_rx) = watch::channel(false);
        let (lost_tx, lost_rx) = watch::channel(false);

        let task = tokio::spawn(run(client, initial_period, stop_rx, lost_tx));

        Self {
            stop: stop_tx,
            session_lost: lost_rx,
            task,
        }
    }

    /// Watch channel that flips to `true` once the session is lost.
    ///
    /// The host application should stop (or degrade) when this fires; a
    /// lost session means another device holds the key or the key was
    /// revoked.
    pub fn session_lost(&self) -> watch::Receiver<bool> {
        self.session_lost.clone()
    }

    /// Stops the loop and releases the session, best effort.
    ///
    /// Returns once the task has wound down or the shutdown bound elapsed;
    /// the process may exit immediately afterwards either way.
    pub async fn shutdown(mut self) {
        let _ = self.stop.send(true);

        if tokio::time::timeout(SHUTDOWN_WAIT, &mut self.task)
            .await
            .is_err()
        {
            tracing::warn!("heartbeat task did not stop in time, aborting");
            self.task.abort();
        }
    }
}

async fn run(
    client: ActivationClient,
    initial_period: Duration,
    mut stop: watch::Receiver<bool>,
    lost: watch::Sender<bool>,
) {
    let mut period = initial_period;
    let mut failed_recoveries: u32 = 0;

    loop {
        tokio::select! {
            // Graceful shutdown requested.
            _ = stop.changed() => break,

            _ = tokio::time::sleep(period) => {
                match client.heartbeat().await {
                    Ok(next_interval_seconds) => {
                        failed_recoveries = 0;
                        if next_interval_seconds > 0 {
                            // Adopt the server-recommended pace.
                            period = Duration::from_secs(next_interval_seconds);
                        }
                        tracing::debug!("heartbeat renewed, next in {:?}", period);
                    }

                    Err(ClientError::Rejected(Rejection::SessionExpired)) => {
                        // Renewal cannot recover this; a fresh acquisition can.
                        tracing::warn!("session expired on server, attempting re-acquisition");
                        match client.acquire().await {
                            Ok(()) => {
                                tracing::info!("session re-acquired");
                                failed_recoveries = 0;
                            }
                            Err(err) => {
                                failed_recoveries += 1;
                                tracing::warn!(
                                    "re-acquisition failed ({err}), {failed_recoveries}/{SESSION_LOST_THRESHOLD}"
                                );
                                if failed_recoveries >= SESSION_LOST_THRESHOLD {
                                    tracing::error!("session lost: another device holds the key");
                                    let _ = lost.send(true);
                                    // Nothing held any more; no release on the way out.
                                    return;
                                }
                            }
                        }
                    }

                    Err(ClientError::Rejected(
                        rejection @ (Rejection::Revoked | Rejection::InvalidKey),
                    )) => {
                        tracing::error!("session lost: {rejection}");
                        let _ = lost.send(true);
                        return;
                    }

                    // Transport trouble or a transiently unavailable store:
                    // a single missed renewal is only a warning.
                    Err(err) => {
                        tracing::warn!("heartbeat failed ({err}), retrying next tick");
                    }
                }
            }
        }
    }

    // Graceful path: hand the session back, bounded so shutdown never hangs.
    match tokio::time::timeout(RELEASE_GRACE, client.release()).await {
        Ok(Ok(())) => tracing::debug!("session released"),
        Ok(Err(err)) => tracing::debug!("release failed ({err}), session will go stale"),
        Err(_) => tracing::debug!("release timed out, session will go stale"),
    }
}
