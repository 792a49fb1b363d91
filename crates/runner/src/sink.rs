//! Event sink
//!
//! Drains engine events into the log. Settled sessions are additionally
//! emitted as JSON lines so the persistence collaborator can tail them.

use arbiter_execution::EngineEvent;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Spawn a task that consumes engine events until the channel closes
pub fn spawn_event_logger(mut events: mpsc::UnboundedReceiver<EngineEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                EngineEvent::SignalAccepted {
                    cycle_id,
                    strategy,
                    signal,
                } => {
                    log::info!("[events] {strategy} signal accepted ({cycle_id}): {signal}");
                }
                EngineEvent::OpenFilled {
                    cycle_id,
                    strategy,
                    fill,
                } => {
                    log::info!(
                        "[events] {strategy} open filled ({cycle_id}): {} @ {}",
                        fill.quantity,
                        fill.price
                    );
                }
                EngineEvent::CloseFilled {
                    cycle_id,
                    strategy,
                    fill,
                    remaining,
                } => {
                    log::info!(
                        "[events] {strategy} close filled ({cycle_id}): {} @ {}, {remaining} remaining",
                        fill.quantity,
                        fill.price
                    );
                }
                EngineEvent::SessionSettled { cycle_id, session } => {
                    match serde_json::to_string(&session) {
                        Ok(json) => log::info!("[events] session settled ({cycle_id}): {json}"),
                        Err(e) => log::error!("[events] session serialization failed: {e}"),
                    }
                }
                EngineEvent::CycleAborted {
                    cycle_id,
                    strategy,
                    reason,
                } => {
                    log::warn!("[events] {strategy} cycle aborted ({cycle_id}): {reason}");
                }
            }
        }
        log::info!("[events] sink stopped");
    })
}
