//! Data bridge: connects the [`Controller`] to TUI actions.
//!
//! Starts the session loop, fetches the container list once, then forwards
//! every [`SessionUpdate`](logdeck_core::SessionUpdate) as an [`Action`]
//! until cancelled.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use logdeck_core::Controller;

use crate::action::{Action, Notification};

pub async fn spawn_data_bridge(
    controller: Controller,
    action_tx: mpsc::UnboundedSender<Action>,
    cancel: CancellationToken,
) {
    let mut updates = match controller.start().await {
        Ok(rx) => rx,
        Err(e) => {
            warn!(error = %e, "failed to start log session");
            let _ = action_tx.send(Action::Notify(Notification::error(e.to_string())));
            return;
        }
    };

    // One shot: a failed fetch leaves the list empty for this run.
    match controller.fetch_containers().await {
        Ok(containers) => {
            info!(count = containers.len(), "container list loaded");
            let loaded = Notification::info(match containers.len() {
                1 => "1 container available".to_owned(),
                n => format!("{n} containers available"),
            });
            let _ = action_tx.send(Action::ContainersLoaded(containers));
            let _ = action_tx.send(Action::Notify(loaded));
        }
        Err(e) => {
            warn!(error = %e, "failed to fetch container list");
            let _ = action_tx.send(Action::InventoryFailed(e.to_string()));
            let _ = action_tx.send(Action::Notify(Notification::error(format!(
                "Could not load containers: {e}"
            ))));
        }
    }

    loop {
        tokio::select! {
            biased;

            () = cancel.cancelled() => break,

            update = updates.recv() => match update {
                Some(update) => {
                    let _ = action_tx.send(Action::from(update));
                }
                None => break,
            },
        }
    }

    controller.shutdown().await;
    debug!("data bridge stopped");
}
