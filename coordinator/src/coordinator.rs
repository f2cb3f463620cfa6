use std::time::Duration;

use host::{Delivery, Host, HostEvent, Responder, ScriptKind, StorageUpdate, TabInfo};
use msgs::{
    message::CommandPayload,
    wire::decode,
    Indicator, Request, RequestKind, Response, SyncError, TabId,
};
use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time::timeout,
};
use uuid::Uuid;

use crate::{
    config::CoordinatorConfig,
    pending::PendingCalls,
    registry::{Registry, SourceBinding},
    source_url::{match_source_url, SourceUrl},
};

type RelayDone = (Uuid, Result<Vec<u8>, SyncError>);

struct ConnectDone {
    tab: TabId,
    game_id: String,
    result: Result<Response, SyncError>,
}

/// Runs the coordinator loop until the host goes away.
pub fn spawn_coordinator_process(host: Host, mut events: mpsc::UnboundedReceiver<HostEvent>, config: CoordinatorConfig) -> JoinHandle<()> {
    tokio::spawn(async move {
        let (relay_done_tx, mut relay_done_rx) = mpsc::unbounded_channel::<RelayDone>();
        let (connect_done_tx, mut connect_done_rx) = mpsc::unbounded_channel::<ConnectDone>();
        let mut coordinator = Coordinator::new(host, config, relay_done_tx, connect_done_tx);

        coordinator.host.store().clear();
        tracing::info!("coordinator started");

        loop {
            tokio::select! {
                event = events.recv() => {
                    let Some(event) = event else {
                        tracing::info!("host closed, coordinator stopping");
                        break;
                    };
                    coordinator.process_event(event).await;
                }
                Some((call_id, result)) = relay_done_rx.recv() => {
                    coordinator.pending.complete(call_id, result);
                }
                Some(done) = connect_done_rx.recv() => {
                    coordinator.finish_connect(done).await;
                }
            }
        }
    })
}

pub struct Coordinator {
    host: Host,
    config: CoordinatorConfig,
    registry: Registry,
    pending: PendingCalls,
    relay_done: mpsc::UnboundedSender<RelayDone>,
    connect_done: mpsc::UnboundedSender<ConnectDone>,
}

/// Sends `request` to a tab, bounded by `limit`.
async fn call_tab(host: &Host, tab_id: TabId, request: &Request, limit: Duration) -> Result<Response, SyncError> {
    match timeout(limit, host.send_message(tab_id, request)).await {
        Ok(result) => result,
        Err(_) => Err(SyncError::timeout(request.kind().as_str(), limit)),
    }
}

impl Coordinator {
    fn new(
        host: Host,
        config: CoordinatorConfig,
        relay_done: mpsc::UnboundedSender<RelayDone>,
        connect_done: mpsc::UnboundedSender<ConnectDone>,
    ) -> Coordinator {
        Coordinator {
            host,
            config,
            registry: Registry::new(),
            pending: PendingCalls::new(),
            relay_done,
            connect_done,
        }
    }

    async fn process_event(&mut self, event: HostEvent) {
        match event {
            HostEvent::ActionClicked(tab) => self.on_action_clicked(tab).await,
            HostEvent::TabRemoved(tab_id) => self.on_tab_removed(tab_id).await,
            HostEvent::TabUpdated { tab, new_document } => self.on_tab_updated(tab, new_document).await,
            HostEvent::Command { tab, command } => self.on_command(tab, &command).await,
            HostEvent::RuntimeMessage { sender, delivery } => self.on_runtime_message(sender, delivery),
        }
    }

    fn source_url(&self, url: &str) -> Option<SourceUrl> {
        match_source_url(url, &self.config.source_hosts)
    }

    async fn call_tab(&self, tab_id: TabId, request: &Request, limit: Duration) -> Result<Response, SyncError> {
        call_tab(&self.host, tab_id, request, limit).await
    }

    async fn probe(&self, tab_id: TabId) -> bool {
        matches!(self.call_tab(tab_id, &Request::Ping, self.config.probe_timeout()).await, Ok(Response::Pong))
    }

    async fn on_action_clicked(&mut self, tab: TabInfo) {
        let source_url = self.source_url(&tab.url);

        if self.registry.claimed_tab() == Some(tab.id) {
            tracing::debug!(tab = tab.id, "tab holds the source role, skipping injection");
        } else if self.probe(tab.id).await {
            tracing::debug!(tab = tab.id, "ping answered, skipping injection");
        } else {
            let script = match source_url {
                Some(_) => {
                    if let Some(previous) = self.registry.claimed_tab() {
                        self.disconnect_source(previous).await;
                    }
                    ScriptKind::Source
                }
                None => ScriptKind::Overlay,
            };
            if let Err(e) = self.host.inject(tab.id, script).await {
                tracing::warn!(tab = tab.id, ?script, "injection failed: {e}");
                self.host.set_indicator(tab.id, Indicator::Failure).await;
                return;
            }
        }

        match source_url {
            Some(source_url) => self.connect_or_disconnect_source(&tab, &source_url).await,
            None => self.toggle_overlay(tab.id).await,
        }
    }

    async fn toggle_overlay(&self, tab_id: TabId) {
        match self.call_tab(tab_id, &Request::Toggle, self.config.relay_timeout()).await {
            Ok(Response::Active(active)) => {
                tracing::info!(tab = tab_id, active, "overlay toggled");
                let indicator = if active { Indicator::Success } else { Indicator::Default };
                self.host.set_indicator(tab_id, indicator).await;
            }
            Ok(other) => {
                tracing::warn!(tab = tab_id, "unexpected toggle answer: {other:?}");
                self.host.set_indicator(tab_id, Indicator::Default).await;
            }
            Err(e) => {
                tracing::warn!(tab = tab_id, "toggle failed: {e}");
                self.host.set_indicator(tab_id, Indicator::Failure).await;
            }
        }
    }

    /// Activating the bound tab again unbinds it; activating another tab
    /// unbinds the old one first.
    async fn connect_or_disconnect_source(&mut self, tab: &TabInfo, source_url: &SourceUrl) {
        if let Some(previous) = self.registry.claimed_tab() {
            self.disconnect_source(previous).await;
            if previous == tab.id {
                return;
            }
        }

        match source_url.connectable_game() {
            Some(game_id) => self.connect_source(tab.id, game_id),
            None => self.disconnect_source(tab.id).await,
        }
    }

    /// Starts connecting. The answer comes back through the loop, which keeps
    /// serving other tabs while the page looks for its anchor.
    fn connect_source(&mut self, tab_id: TabId, game_id: &str) {
        if let Err(e) = self.registry.begin_connect(tab_id) {
            tracing::error!("{e}");
            return;
        }

        let host = self.host.clone();
        let limit = self.config.relay_timeout();
        let connect_done = self.connect_done.clone();
        let game_id = game_id.to_owned();
        tokio::spawn(async move {
            let result = call_tab(&host, tab_id, &Request::Connect, limit).await;
            if connect_done.send(ConnectDone { tab: tab_id, game_id, result }).is_err() {
                tracing::debug!(tab = tab_id, "coordinator gone before connect finished");
            }
        });
    }

    async fn finish_connect(&mut self, done: ConnectDone) {
        let ConnectDone { tab: tab_id, game_id, result } = done;
        if self.registry.binding() != &(SourceBinding::Connecting { tab: tab_id }) {
            tracing::debug!(tab = tab_id, binding = ?self.registry.binding(), "connect answer arrived after the binding moved on");
            return;
        }

        let game_id = game_id.as_str();
        let connected = match result {
            Ok(Response::Connected(connected)) => connected,
            Ok(other) => {
                tracing::warn!(tab = tab_id, "unexpected connect answer: {other:?}");
                false
            }
            Err(e) => {
                tracing::warn!(tab = tab_id, "connect failed: {e}");
                false
            }
        };

        if connected {
            if let Err(e) = self.registry.connected(tab_id, game_id) {
                tracing::error!("{e}");
                return;
            }
            self.host.set_indicator(tab_id, Indicator::Success).await;
            self.host
                .store()
                .set(StorageUpdate::new().timer_tab(Some(tab_id)).active_game(Some(game_id.to_owned())));
            tracing::info!(tab = tab_id, game_id, "source connected");
        } else {
            if let Err(e) = self.registry.failed(tab_id) {
                tracing::error!("{e}");
            }
            self.host.set_indicator(tab_id, Indicator::Failure).await;
            self.host.store().set(StorageUpdate::new().timer_tab(None).active_game(None));
            tracing::warn!(tab = tab_id, game_id, "source failed to connect: {}", SyncError::AnchorNotFound);
        }
    }

    /// Tells the tab to stop, then clears the binding and the snapshot in one write.
    async fn disconnect_source(&mut self, tab_id: TabId) {
        match self.call_tab(tab_id, &Request::Disconnect, self.config.relay_timeout()).await {
            Ok(_) => self.host.set_indicator(tab_id, Indicator::Default).await,
            Err(e) => {
                tracing::warn!(tab = tab_id, "disconnect failed: {e}");
                self.host.set_indicator(tab_id, Indicator::Failure).await;
            }
        }
        if let Err(e) = self.registry.disconnected(tab_id) {
            tracing::error!("{e}");
            return;
        }
        self.host.store().set(StorageUpdate::clear_all());
        tracing::info!(tab = tab_id, "source disconnected");
    }

    async fn on_tab_removed(&mut self, tab_id: TabId) {
        let failed = self.pending.fail_target(tab_id, SyncError::unreachable(format!("tab {tab_id} was closed")));
        if failed > 0 {
            tracing::info!(tab = tab_id, failed, "failed pending calls of closed tab");
        }
        if self.registry.claimed_tab() == Some(tab_id) {
            self.disconnect_source(tab_id).await;
        }
    }

    async fn on_tab_updated(&mut self, tab: TabInfo, new_document: bool) {
        if new_document {
            let failed = self.pending.fail_target(tab.id, SyncError::unreachable(format!("tab {} navigated away", tab.id)));
            if failed > 0 {
                tracing::info!(tab = tab.id, failed, "failed pending calls of navigated tab");
            }
        }

        if self.registry.claimed_tab() != Some(tab.id) {
            return;
        }
        let game_id = self.source_url(&tab.url).and_then(|url| url.game_id);
        let same_game = game_id.is_some() && game_id.as_deref() == self.registry.active_game();
        if new_document || !same_game {
            tracing::info!(tab = tab.id, url = %tab.url, "source tab left its game");
            self.disconnect_source(tab.id).await;
        }
    }

    async fn on_command(&self, tab: TabInfo, command: &str) {
        let command = match command.parse() {
            Ok(command) => command,
            Err(e) => {
                tracing::warn!(tab = tab.id, "{e}");
                return;
            }
        };
        let request = Request::Command(CommandPayload { command });
        if let Err(e) = self.host.post_message(tab.id, &request).await {
            tracing::debug!(tab = tab.id, "command not delivered: {e}");
        }
    }

    fn on_runtime_message(&mut self, sender: TabId, delivery: Delivery) {
        let kind = decode::<Request>(&delivery.frame).map(|request| request.kind());
        let (frame, responder) = delivery.into_parts();
        match kind {
            Ok(kind) if kind.is_relayed() => self.relay(sender, kind, frame, responder),
            Ok(kind) => {
                tracing::debug!(tab = sender, %kind, "not a relayed request");
                responder.respond(&Response::Error(SyncError::Rejected(format!("{kind} is not relayed"))));
            }
            Err(e) => {
                tracing::warn!(tab = sender, "undecodable runtime message: {e}");
                responder.respond(&Response::Error(e));
            }
        }
    }

    /// Forwards the frame untouched to the source tab. The answer comes back
    /// through the loop so the pending table stays the only place calls end.
    fn relay(&mut self, sender: TabId, kind: RequestKind, frame: Vec<u8>, responder: Responder) {
        let Some(target) = self.registry.source_tab() else {
            tracing::debug!(tab = sender, %kind, "no source bound");
            responder.respond(&Response::Error(SyncError::NoSourceBound));
            return;
        };

        let call_id = self.pending.open(target, kind, responder);
        tracing::debug!(%call_id, from = sender, to = target, %kind, "relaying");

        let host = self.host.clone();
        let relay_timeout = self.config.relay_timeout();
        let relay_done = self.relay_done.clone();
        tokio::spawn(async move {
            let result = match timeout(relay_timeout, host.send_frame(target, frame)).await {
                Ok(result) => result,
                Err(_) => Err(SyncError::timeout(kind.as_str(), relay_timeout)),
            };
            if relay_done.send((call_id, result)).is_err() {
                tracing::debug!(%call_id, "coordinator gone before relay finished");
            }
        });
    }
}
