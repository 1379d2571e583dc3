//! Single-task event loop around a [`Session`].

use std::future::Future;

use tokio::sync::mpsc;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{error, info, warn};

use super::{Session, SessionObserver};
use crate::core::{BandError, Notification, Transport, TransportError};

/// Run `session` until `shutdown` resolves.
///
/// Notifications, keep-alive ticks and shutdown are multiplexed on one task,
/// so session state is only ever touched serially. Recoverable errors are
/// logged; anything else ends the loop. A closed notification channel is
/// reported as [`TransportError::Disconnected`].
pub async fn run<T, O, F>(
    session: &mut Session<T, O>,
    mut notifications: mpsc::Receiver<Notification>,
    shutdown: F,
) -> Result<(), BandError>
where
    T: Transport,
    O: SessionObserver,
    F: Future<Output = ()>,
{
    session.start().await?;

    let period = session.config().tick_interval;
    let mut ticker = time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(shutdown);

    loop {
        let result = tokio::select! {
            _ = &mut shutdown => {
                info!("Shutdown requested");
                return Ok(());
            }
            received = notifications.recv() => match received {
                Some(notification) => session.on_notification(notification).await,
                None => {
                    error!("Notification channel closed");
                    return Err(TransportError::Disconnected.into());
                }
            },
            _ = ticker.tick() => session.on_tick().await,
        };

        if let Err(e) = result {
            if !e.is_recoverable() {
                error!("Session failed: {}", e);
                return Err(e);
            }
            warn!("Session error: {}", e);
        }
    }
}
