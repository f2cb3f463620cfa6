use std::sync::Arc;

use chrono::Utc;
use host::{
    page::Mutation,
    port::PORT_CAPACITY,
    ContentPort, Delivery, GamePage, Responder, SnapshotStore, StorageUpdate,
};
use msgs::{Request, Response, SyncError};
use tokio::sync::{
    broadcast::{self, error::RecvError},
    mpsc, oneshot,
};

use crate::{
    actions::perform_user_action,
    back_channel::BackChannel,
    config::SourceConfig,
    extract::extract_snapshot,
    observe::{is_version_change, wait_for_anchor, VersionChange, VersionTracker},
};

struct SourceAdapter {
    page: Arc<dyn GamePage>,
    store: SnapshotStore,
    config: SourceConfig,
    back_channel: BackChannel,
    watching: Option<broadcast::Receiver<Mutation>>,
    versions: VersionTracker,
}

/// Starts the adapter for one tab's page. It lives until `shutdown` fires or
/// the port is dropped.
pub fn spawn_source_adapter_process(page: Arc<dyn GamePage>, store: SnapshotStore, config: SourceConfig, mut shutdown: oneshot::Receiver<()>) -> ContentPort {
    let (port, mut inbox) = mpsc::channel::<Delivery>(PORT_CAPACITY);
    tokio::spawn(async move {
        let mut adapter = SourceAdapter {
            back_channel: BackChannel::new(page.clone(), config.back_channel_timeout()),
            page,
            store,
            config,
            watching: None,
            versions: VersionTracker::new(),
        };

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("source adapter torn down");
                    break;
                }
                delivery = inbox.recv() => {
                    let Some(delivery) = delivery else {
                        break;
                    };
                    let (request, responder) = delivery.open();
                    match request {
                        Ok(request) => adapter.process_request(request, responder).await,
                        Err(e) => responder.respond(&Response::Error(e)),
                    }
                }
                mutation = next_mutation(&mut adapter.watching) => {
                    adapter.process_mutation(mutation);
                }
            }
        }
    });
    port
}

async fn next_mutation(watching: &mut Option<broadcast::Receiver<Mutation>>) -> Result<Mutation, RecvError> {
    match watching {
        Some(mutations) => mutations.recv().await,
        None => std::future::pending().await,
    }
}

impl SourceAdapter {
    async fn process_request(&mut self, request: Request, responder: Responder) {
        match request {
            Request::Ping => responder.respond(&Response::Pong),
            Request::Connect => {
                let connected = self.connect().await;
                responder.respond(&Response::Connected(connected));
            }
            Request::Disconnect => {
                // The coordinator clears the snapshot along with the binding.
                self.watching = None;
                self.versions.reset();
                tracing::info!("stopped watching the game page");
                responder.respond(&Response::Ack);
            }
            Request::UserAction(payload) => {
                responder.respond(&perform_user_action(self.page.as_ref(), &payload).into());
            }
            Request::CreateTransaction(payload) => {
                let back_channel = self.back_channel.clone();
                tokio::spawn(async move {
                    responder.respond(&back_channel.create_transaction(&payload).await.into());
                });
            }
            Request::CheckFormula(payload) => {
                let back_channel = self.back_channel.clone();
                tokio::spawn(async move {
                    responder.respond(&back_channel.check_formula(&payload).await.into());
                });
            }
            other => {
                tracing::debug!(kind = %other.kind(), "not handled by the source");
                responder.respond(&Response::Error(SyncError::Rejected(format!("the source does not handle {}", other.kind()))));
            }
        }
    }

    /// (Re)starts observation and publishes the current state.
    async fn connect(&mut self) -> bool {
        match wait_for_anchor(self.page.as_ref(), self.config.anchor_timeout()).await {
            Ok(mutations) => {
                self.watching = Some(mutations);
                self.versions.reset();
                self.publish();
                tracing::info!("watching the game page");
                true
            }
            Err(e) => {
                self.watching = None;
                tracing::warn!("{e}");
                false
            }
        }
    }

    fn process_mutation(&mut self, mutation: Result<Mutation, RecvError>) {
        match mutation {
            Ok(mutation) if is_version_change(&mutation) => self.publish(),
            Ok(_) => {}
            Err(RecvError::Lagged(skipped)) => {
                tracing::debug!(skipped, "page observer lagged, re-reading");
                self.publish();
            }
            Err(RecvError::Closed) => {
                tracing::warn!("page stopped reporting mutations");
                self.watching = None;
            }
        }
    }

    fn publish(&mut self) {
        let snapshot = match extract_snapshot(self.page.as_ref(), Utc::now().timestamp_millis()) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!("snapshot dropped: {e}");
                return;
            }
        };

        match self.versions.observe(snapshot.version) {
            VersionChange::Advanced => {
                tracing::debug!(version = snapshot.version, "publishing game state");
                self.store.set(StorageUpdate::new().game_state(Some(snapshot)));
            }
            VersionChange::Unchanged => {}
            VersionChange::Regressed { last_seen } => {
                tracing::warn!(version = snapshot.version, last_seen, "game state version went backwards, ignored");
            }
        }
    }
}
