//! Periodic meter polling for one registered concentrator.

use super::Session;
use crate::dlt645::{Dlt645Frame, Identifier, MeterAddress};
use log::{debug, error, info, warn};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Identifiers read on every polling cycle, in order.
pub const POLLED_IDENTIFIERS: [Identifier; 3] = [
    Identifier::FORWARD_ACTIVE_ENERGY,
    Identifier::VOLTAGE,
    Identifier::CURRENT,
];

/// Spawns the polling task for `address`.
///
/// The task waits the warmup delay, then polls once per interval until
/// `token` is cancelled. Cancellation is observed between commands, so an
/// in-flight command always runs to its response or timeout.
pub fn spawn_scheduler(
    session: Arc<Session>,
    address: MeterAddress,
    token: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        run(&session, address, &token).await;
        debug!("{}: scheduler for {} stopped", session.peer(), address);
    })
}

async fn run(session: &Session, address: MeterAddress, token: &CancellationToken) {
    let polling = session.config().polling.clone();

    tokio::select! {
        _ = token.cancelled() => return,
        _ = sleep(polling.warmup()) => {}
    }

    let mut ticker = interval(polling.interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = token.cancelled() => return,
            _ = ticker.tick() => {}
        }
        info!("{}: polling meter {}", session.peer(), address);

        for identifier in POLLED_IDENTIFIERS {
            if token.is_cancelled() {
                return;
            }
            poll_once(session, address, identifier).await;
        }
    }
}

async fn poll_once(session: &Session, address: MeterAddress, identifier: Identifier) {
    let request = match Dlt645Frame::read(address, identifier).encode() {
        Ok(request) => request,
        Err(e) => {
            error!("{}: cannot build read {}: {}", session.peer(), identifier, e);
            return;
        }
    };
    match session.command_passthrough_sync(&[request]).await {
        Ok(Some(response)) => debug!(
            "{}: read {} answered with {} frame(s)",
            session.peer(),
            identifier,
            response.parsed.len()
        ),
        Ok(None) => warn!("{}: read {} got no response", session.peer(), identifier),
        Err(e) => error!("{}: read {} failed: {}", session.peer(), identifier, e),
    }
}
