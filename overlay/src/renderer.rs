use chrono::Utc;
use host::{port::PORT_CAPACITY, storage::StoreState, ContentPort, Delivery, Responder, RuntimePort, SnapshotStore};
use msgs::{
    message::{ShortcutCommand, TransactionPayload},
    snapshot::PlayerId,
    GameSnapshot, Request, Response, SyncError,
};
use tokio::{
    sync::{mpsc, oneshot, watch},
    time::{sleep_until, Instant},
};

use crate::{
    actions_tray::{ActionsTray, TrayChange},
    bank::{BankTotals, TransactionForm},
    bank_log::BankLog,
    config::OverlayConfig,
    formula::{classify, FormStatus, FormulaCheck, Key, KeyOutcome},
    player_times::project_time_shares,
    view::{BankView, FormView, Notice, OverlayView, PlayerMarker, TrayView},
};

pub const MONEY_TOKEN: &str = "💲";
pub const VICTORY_POINT_TOKEN: &str = "⭐";

/// Input from the person looking at the overlay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    ClickAction (String),
    ToggleForm,
    SelectToken (String),
    SelectAssociate (Option<PlayerId>),
    FocusFormula,
    Key (Key),
    Submit { close: bool },
    ShowHelp,
    DismissNotice,
}

pub struct OverlayHandle {
    pub port: ContentPort,
    pub view: watch::Receiver<OverlayView>,
    pub ui: mpsc::Sender<UiEvent>,
}

enum Completion {
    Action (Result<Response, SyncError>),
    Transaction { close: bool, result: Result<Response, SyncError> },
    Formula { seq: u64, result: Result<Response, SyncError> },
}

struct OverlayRenderer {
    store: SnapshotStore,
    runtime: RuntimePort,
    config: OverlayConfig,
    active: bool,
    watching: Option<watch::Receiver<StoreState>>,
    rendered_generation: Option<u64>,
    snapshot: Option<GameSnapshot>,
    renders: u64,
    placeholder_renders: u64,
    tray: ActionsTray,
    swap_deadline: Option<Instant>,
    time_shares: Vec<Option<u32>>,
    time_share_deadline: Option<Instant>,
    bank: Option<BankTotals>,
    log: BankLog,
    flash_deadline: Option<Instant>,
    form: TransactionForm,
    log_visible: bool,
    opponents_visible: bool,
    notice: Option<Notice>,
    formula_seq: u64,
    pending_check: bool,
    done: mpsc::UnboundedSender<Completion>,
    view: watch::Sender<OverlayView>,
}

/// Starts the overlay for one tab. It starts inactive; a `toggle` request
/// switches it on.
pub fn spawn_overlay_process(store: SnapshotStore, runtime: RuntimePort, config: OverlayConfig, mut shutdown: oneshot::Receiver<()>) -> OverlayHandle {
    let (port, mut inbox) = mpsc::channel::<Delivery>(PORT_CAPACITY);
    let (ui, mut ui_events) = mpsc::channel::<UiEvent>(PORT_CAPACITY);
    let (view_tx, view) = watch::channel(OverlayView::default());
    let (done, mut completions) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        let mut overlay = OverlayRenderer {
            store,
            runtime,
            log: BankLog::new(config.bank_log_window),
            config,
            active: false,
            watching: None,
            rendered_generation: None,
            snapshot: None,
            renders: 0,
            placeholder_renders: 0,
            tray: ActionsTray::new(),
            swap_deadline: None,
            time_shares: Vec::new(),
            time_share_deadline: None,
            bank: None,
            flash_deadline: None,
            form: TransactionForm::new(),
            log_visible: true,
            opponents_visible: true,
            notice: None,
            formula_seq: 0,
            pending_check: false,
            done,
            view: view_tx,
        };

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("overlay torn down");
                    break;
                }
                delivery = inbox.recv() => {
                    let Some(delivery) = delivery else {
                        break;
                    };
                    let (request, responder) = delivery.open();
                    match request {
                        Ok(request) => overlay.process_request(request, responder),
                        Err(e) => responder.respond(&Response::Error(e)),
                    }
                }
                Some(event) = ui_events.recv() => {
                    overlay.process_ui_event(event);
                }
                Some(completion) = completions.recv() => {
                    overlay.process_completion(completion);
                }
                changed = next_store_change(&mut overlay.watching) => {
                    match changed {
                        Ok(()) => overlay.render_store(),
                        Err(_) => {
                            tracing::warn!("snapshot store went away");
                            overlay.watching = None;
                        }
                    }
                }
                _ = wait_until(overlay.swap_deadline) => {
                    overlay.complete_swap();
                }
                _ = wait_until(overlay.time_share_deadline) => {
                    overlay.tick_time_shares();
                }
                _ = wait_until(overlay.flash_deadline) => {
                    overlay.flash_deadline = None;
                    overlay.log.settle();
                }
            }
            overlay.publish();
        }
    });

    OverlayHandle { port, view, ui }
}

async fn next_store_change(watching: &mut Option<watch::Receiver<StoreState>>) -> Result<(), watch::error::RecvError> {
    match watching {
        Some(store) => store.changed().await,
        None => std::future::pending().await,
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

impl OverlayRenderer {
    fn process_request(&mut self, request: Request, responder: Responder) {
        match request {
            Request::Ping => responder.respond(&Response::Pong),
            Request::Toggle => {
                if self.active {
                    self.deactivate();
                } else {
                    self.activate();
                }
                tracing::info!(active = self.active, "overlay toggled");
                responder.respond(&Response::Active(self.active));
            }
            Request::Command(payload) => {
                self.process_command(payload.command);
                responder.respond(&Response::Ack);
            }
            other => {
                tracing::debug!(kind = %other.kind(), "not handled by the overlay");
                responder.respond(&Response::Error(SyncError::Rejected(format!("the overlay does not handle {}", other.kind()))));
            }
        }
    }

    fn activate(&mut self) {
        self.active = true;
        self.watching = Some(self.store.subscribe());
        self.rendered_generation = None;
        self.render_store();
    }

    fn deactivate(&mut self) {
        self.active = false;
        self.watching = None;
        self.rendered_generation = None;
        self.notice = None;
        self.remove_ui();
    }

    fn remove_ui(&mut self) {
        self.snapshot = None;
        self.tray = ActionsTray::new();
        self.swap_deadline = None;
        self.time_shares.clear();
        self.time_share_deadline = None;
        self.bank = None;
        self.log.clear();
        self.flash_deadline = None;
        self.form.clear();
        self.pending_check = false;
    }

    /// Renders the store if its game state changed since the last render.
    fn render_store(&mut self) {
        let Some(watching) = &mut self.watching else {
            return;
        };
        let game_state = {
            let state = watching.borrow_and_update();
            if self.rendered_generation == Some(state.game_state_generation) {
                return;
            }
            self.rendered_generation = Some(state.game_state_generation);
            state.area.game_state.clone()
        };
        self.render(game_state);
    }

    fn render(&mut self, game_state: Option<GameSnapshot>) {
        let Some(snapshot) = game_state else {
            self.remove_ui();
            self.renders += 1;
            self.placeholder_renders += 1;
            tracing::debug!("no game state, showing the placeholder");
            return;
        };
        if let Err(e) = snapshot.check_shape() {
            tracing::warn!(version = snapshot.version, "not rendering game state: {e}");
            return;
        }
        self.renders += 1;
        let now = Instant::now();

        match self.tray.reconcile(&snapshot.available_actions, snapshot.version) {
            TrayChange::SwapScheduled if self.swap_deadline.is_none() => {
                self.swap_deadline = Some(now + self.config.action_swap_delay());
            }
            TrayChange::Retracted => self.swap_deadline = None,
            _ => {}
        }

        self.time_shares = project_time_shares(&snapshot.turn_order, snapshot.captured_at, now_millis());
        if self.time_share_deadline.is_none() {
            self.time_share_deadline = Some(now + self.config.time_share_interval());
        }

        match &mut self.bank {
            Some(bank) => bank.refresh(&snapshot),
            None => self.bank = BankTotals::build(&snapshot),
        }
        self.form.refresh(&snapshot);

        if self.log.reconcile(&snapshot.bank_log_preview).inserted > 0 {
            self.flash_deadline = Some(now + self.config.new_entry_flash());
        }

        tracing::debug!(version = snapshot.version, "rendered game state");
        self.snapshot = Some(snapshot);
    }

    fn complete_swap(&mut self) {
        self.swap_deadline = None;
        if self.tray.complete_swap() {
            tracing::debug!("new actions swapped in");
        }
    }

    fn tick_time_shares(&mut self) {
        let Some(snapshot) = &self.snapshot else {
            self.time_share_deadline = None;
            return;
        };
        self.time_shares = project_time_shares(&snapshot.turn_order, snapshot.captured_at, now_millis());
        self.time_share_deadline = Some(Instant::now() + self.config.time_share_interval());
    }

    fn process_command(&mut self, command: ShortcutCommand) {
        if !self.active {
            tracing::debug!(command = command.as_str(), "overlay inactive, command ignored");
            return;
        }
        match command {
            ShortcutCommand::ShowHideLog => self.log_visible = !self.log_visible,
            ShortcutCommand::ShowHideOpponentScore => self.opponents_visible = !self.opponents_visible,
            ShortcutCommand::TransactMoney => self.start_transaction(MONEY_TOKEN),
            ShortcutCommand::TransactVp => self.start_transaction(VICTORY_POINT_TOKEN),
        }
    }

    fn start_transaction(&mut self, token: &str) {
        if self.bank.is_none() {
            tracing::debug!(token, "no bank to transact with");
            return;
        }
        self.form.start_transaction(token);
    }

    fn process_ui_event(&mut self, event: UiEvent) {
        if !self.active {
            tracing::debug!(?event, "overlay inactive, ignored");
            return;
        }
        match event {
            UiEvent::ClickAction(label) => self.click_action(&label),
            UiEvent::ToggleForm => {
                if self.bank.is_some() {
                    self.form.toggle();
                }
            }
            UiEvent::SelectToken(token) => {
                self.form.select_token(&token);
            }
            UiEvent::SelectAssociate(associate) => {
                self.form.select_associate(associate);
            }
            UiEvent::FocusFormula => self.form.focus(),
            UiEvent::Key(key) => self.process_key(&key),
            UiEvent::Submit { close } => self.submit_transaction(close),
            UiEvent::ShowHelp => self.notice = Some(Notice::Help),
            UiEvent::DismissNotice => self.notice = None,
        }
    }

    fn spawn_request(&self, request: Request, complete: impl FnOnce(Result<Response, SyncError>) -> Completion + Send + 'static) {
        let runtime = self.runtime.clone();
        let done = self.done.clone();
        tokio::spawn(async move {
            let result = runtime.send_message(&request).await;
            // closed only once the overlay task is gone
            let _ = done.send(complete(result));
        });
    }

    fn click_action(&mut self, label: &str) {
        let Some(button) = self.tray.button(label) else {
            tracing::debug!(label, "no such action");
            return;
        };
        if button.disabled || !self.tray.revealed() {
            tracing::debug!(label, "action not clickable right now");
            return;
        }
        let request = Request::user_action(label, button.version);
        self.tray.set_disabled(true);
        self.spawn_request(request, Completion::Action);
    }

    fn process_key(&mut self, key: &Key) {
        if !self.form.open || !self.form.focused {
            return;
        }
        match self.form.input.handle_key(key) {
            KeyOutcome::Submit { close } => self.submit_transaction(close),
            KeyOutcome::Blur => self.form.focused = false,
            KeyOutcome::Edited => self.check_formula(),
            KeyOutcome::PassThrough => {}
        }
    }

    fn check_formula(&mut self) {
        let check = classify(self.form.input.text());
        if check == FormulaCheck::AwaitMore {
            return;
        }
        self.formula_seq += 1;
        self.pending_check = false;
        match check {
            FormulaCheck::Neutral => self.form.status = FormStatus::Neutral,
            FormulaCheck::Immediate(value) => self.form.status = FormStatus::for_value(value),
            FormulaCheck::Remote => {
                self.pending_check = true;
                let seq = self.formula_seq;
                let request = Request::check_formula(self.form.input.text().trim());
                self.spawn_request(request, move |result| Completion::Formula { seq, result });
            }
            FormulaCheck::AwaitMore => {}
        }
    }

    fn submit_transaction(&mut self, close: bool) {
        if !self.form.open {
            return;
        }
        let Some(token) = self.form.token.clone() else {
            return;
        };
        let formula = self.form.input.text().trim().to_owned();
        if self.pending_check || !self.form.status.submit_enabled() || classify(&formula) == FormulaCheck::AwaitMore {
            tracing::debug!(%formula, "formula not ready to submit");
            return;
        }
        let payload = TransactionPayload { token, formula, associate: self.form.associate.clone() };
        self.spawn_request(Request::CreateTransaction(payload), move |result| Completion::Transaction { close, result });
    }

    fn process_completion(&mut self, completion: Completion) {
        if !self.active {
            return;
        }
        match completion {
            Completion::Action(Ok(_)) => tracing::debug!("action performed"),
            Completion::Action(Err(e)) => {
                tracing::warn!("action failed: {e}");
                self.tray.set_disabled(false);
                self.notice = Some(Notice::Alert(e.to_string()));
            }
            Completion::Transaction { close, result: Ok(_) } => {
                self.form.input.clear();
                self.form.status = FormStatus::Neutral;
                if close {
                    self.form.close();
                }
            }
            Completion::Transaction { result: Err(e), .. } => {
                tracing::warn!("transaction failed: {e}");
                if e.is_transport() || e == SyncError::NoSourceBound {
                    self.notice = Some(Notice::Alert(e.to_string()));
                } else {
                    self.form.status = FormStatus::BadFormula { detail: e.to_string() };
                }
            }
            Completion::Formula { seq, result } => {
                if seq != self.formula_seq {
                    tracing::debug!(seq, latest = self.formula_seq, "outdated formula check dropped");
                    return;
                }
                self.pending_check = false;
                self.form.status = match result {
                    Ok(Response::Formula(value)) => FormStatus::for_value(value.as_f64()),
                    Ok(other) => FormStatus::BadFormula { detail: format!("unexpected answer: {other:?}") },
                    Err(e) => FormStatus::BadFormula { detail: e.to_string() },
                };
            }
        }
    }

    fn form_view(&self) -> FormView {
        let form = &self.form;
        FormView {
            open: form.open,
            focused: form.focused,
            tokens: form.tokens.clone(),
            token: form.token.clone(),
            associates: form.associates.clone(),
            associate: form.associate.clone(),
            formula: form.input.text().to_owned(),
            cursor: form.input.cursor(),
            hint: form.status.hint().to_owned(),
            hover: form.status.hover().map(str::to_owned),
            submit_label: form.status.submit_label(),
            submit_enabled: form.status.submit_enabled() && !self.pending_check,
            in_error: form.status.in_error(),
        }
    }

    fn build_view(&self) -> OverlayView {
        let mut view = OverlayView {
            active: self.active,
            notice: self.notice.clone(),
            renders: self.renders,
            placeholder_renders: self.placeholder_renders,
            ..OverlayView::default()
        };
        if !self.active {
            return view;
        }
        let Some(snapshot) = &self.snapshot else {
            view.placeholder = true;
            return view;
        };

        view.players = snapshot
            .turn_order
            .iter()
            .enumerate()
            .map(|(position, entry)| PlayerMarker {
                player_id: entry.player_id.clone(),
                color_vars: entry.color_vars.clone(),
                active: entry.is_current,
                passed: entry.has_passed,
                position,
                time_share: self.time_shares.get(position).copied().flatten(),
            })
            .collect();
        view.tray = Some(TrayView { buttons: self.tray.buttons().to_vec(), revealed: self.tray.revealed() });
        view.bank = self.bank.as_ref().map(|totals| BankView {
            totals: totals.clone(),
            log: self.log.lines().to_vec(),
            log_visible: self.log_visible,
            opponents_visible: self.opponents_visible,
            form: self.form_view(),
        });
        view
    }

    fn publish(&self) {
        let view = self.build_view();
        self.view.send_if_modified(|current| {
            if *current == view {
                return false;
            }
            *current = view;
            true
        });
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::BTreeMap, time::Duration};

    use host::{port::send_message, HostEvent, StorageUpdate};
    use msgs::{
        message::{CommandPayload, FormulaValue},
        snapshot::TurnOrderEntry,
    };

    use super::*;

    fn snapshot(version: u64, actions: &[&str]) -> GameSnapshot {
        GameSnapshot {
            version,
            turn_order: vec![
                TurnOrderEntry {
                    player_id: "ann".into(),
                    color_vars: vec![("--player-color".into(), "teal".into())],
                    has_passed: false,
                    is_current: true,
                    accumulated_time_excluding_current_turn: 0,
                },
                TurnOrderEntry {
                    player_id: "ben".into(),
                    color_vars: Vec::new(),
                    has_passed: true,
                    is_current: false,
                    accumulated_time_excluding_current_turn: 0,
                },
            ],
            token_totals: BTreeMap::from([
                ("ann".to_string(), BTreeMap::from([("💲".to_string(), 3)])),
                ("ben".to_string(), BTreeMap::from([("💲".to_string(), 8)])),
            ]),
            bank_log_preview: Vec::new(),
            available_actions: actions.iter().map(|action| action.to_string()).collect(),
            own_player_id: "ann".into(),
            player_names: BTreeMap::from([("ann".into(), "Ann".into()), ("ben".into(), "Ben".into())]),
            allow_inter_player_transactions: true,
            captured_at: 0,
        }
    }

    struct Running {
        store: SnapshotStore,
        handle: OverlayHandle,
        requests: mpsc::UnboundedReceiver<Request>,
        _kill: oneshot::Sender<()>,
    }

    /// Starts an overlay whose runtime messages are answered by `answer`.
    fn start(answer: impl Fn(&Request) -> Response + Send + 'static) -> Running {
        let store = SnapshotStore::new();
        let (events_tx, mut events) = mpsc::unbounded_channel();
        let (seen_tx, requests) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                let HostEvent::RuntimeMessage { delivery, .. } = event else {
                    continue;
                };
                let (request, responder) = delivery.open();
                let request = request.unwrap();
                responder.respond(&answer(&request));
                let _ = seen_tx.send(request);
            }
        });
        let (kill, shutdown) = oneshot::channel();
        let config = OverlayConfig { action_swap_delay_ms: 200, time_share_interval_ms: 50, bank_log_window: 8, new_entry_flash_ms: 10 };
        let handle = spawn_overlay_process(store.clone(), RuntimePort::new(9, events_tx), config, shutdown);
        Running { store, handle, requests, _kill: kill }
    }

    async fn wait_for(view: &mut watch::Receiver<OverlayView>, check: impl Fn(&OverlayView) -> bool) -> OverlayView {
        tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                {
                    let current = view.borrow_and_update();
                    if check(&current) {
                        return current.clone();
                    }
                }
                view.changed().await.unwrap();
            }
        })
        .await
        .expect("view never matched")
    }

    async fn toggle(running: &Running) -> Response {
        send_message(&running.handle.port, &Request::Toggle).await.unwrap()
    }

    async fn press(running: &Running, keys: &str) {
        for c in keys.chars() {
            running.handle.ui.send(UiEvent::Key(Key::Char(c))).await.unwrap();
        }
    }

    #[tokio::test]
    async fn empty_store_shows_the_placeholder() {
        let mut running = start(|_| Response::Done);
        assert_eq!(toggle(&running).await, Response::Active(true));

        let view = wait_for(&mut running.handle.view, |view| view.active).await;
        assert!(view.placeholder);
        assert_eq!(view.placeholder_renders, 1);

        running.store.set(StorageUpdate::new().game_state(Some(snapshot(1, &["End Turn"]))));
        let view = wait_for(&mut running.handle.view, |view| !view.placeholder).await;
        assert_eq!(view.players.len(), 2);
        assert!(view.marker("ann").unwrap().active);
        assert!(view.marker("ben").unwrap().passed);
        assert_eq!(view.marker("ben").unwrap().position, 1);
        assert_eq!(view.button("End Turn").map(|button| button.version), Some(1));
        assert_eq!(view.bank.as_ref().unwrap().totals.rows[0].player_id, "ann");
    }

    #[tokio::test]
    async fn only_game_state_changes_render() {
        let mut running = start(|_| Response::Done);
        running.store.set(StorageUpdate::new().game_state(Some(snapshot(1, &[]))));
        toggle(&running).await;
        wait_for(&mut running.handle.view, |view| view.renders == 1).await;

        running.store.set(StorageUpdate::new().timer_tab(Some(3)));
        running.store.set(StorageUpdate::new().game_state(Some(snapshot(1, &[]))));
        running.store.set(StorageUpdate::new().game_state(Some(snapshot(2, &[]))));
        let view = wait_for(&mut running.handle.view, |view| view.renders >= 2).await;
        assert_eq!(view.renders, 2);
    }

    #[tokio::test]
    async fn time_shares_grow_between_snapshots() {
        let mut running = start(|_| Response::Done);
        let mut game = snapshot(1, &[]);
        game.captured_at = now_millis();
        game.turn_order[1].accumulated_time_excluding_current_turn = 500;
        running.store.set(StorageUpdate::new().game_state(Some(game)));
        toggle(&running).await;

        let view = wait_for(&mut running.handle.view, |view| view.renders == 1).await;
        assert!(view.marker("ann").unwrap().time_share.unwrap() < 40);

        let view = wait_for(&mut running.handle.view, |view| {
            view.marker("ann").and_then(|marker| marker.time_share).is_some_and(|share| share >= 45)
        })
        .await;
        assert_eq!(view.renders, 1);
        assert!(view.marker("ben").unwrap().time_share.unwrap() <= 55);
    }

    #[tokio::test]
    async fn toggling_off_removes_everything() {
        let mut running = start(|_| Response::Done);
        running.store.set(StorageUpdate::new().game_state(Some(snapshot(1, &["Pass"]))));
        toggle(&running).await;
        wait_for(&mut running.handle.view, |view| view.tray.is_some()).await;

        assert_eq!(toggle(&running).await, Response::Active(false));
        let view = wait_for(&mut running.handle.view, |view| !view.active).await;
        assert!(view.players.is_empty() && view.tray.is_none() && view.bank.is_none());

        running.store.set(StorageUpdate::new().game_state(Some(snapshot(2, &["Pass"]))));
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(running.handle.view.borrow().renders, 1);
    }

    #[tokio::test]
    async fn failed_actions_reenable_the_buttons() {
        let mut running = start(|request| match request {
            Request::UserAction(_) => Response::Error(SyncError::StaleVersion { requested: 4, current: 5 }),
            _ => Response::Done,
        });
        running.store.set(StorageUpdate::new().game_state(Some(snapshot(4, &["End Turn"]))));
        toggle(&running).await;
        wait_for(&mut running.handle.view, |view| view.tray.is_some()).await;

        running.handle.ui.send(UiEvent::ClickAction("End Turn".into())).await.unwrap();
        assert_eq!(running.requests.recv().await, Some(Request::user_action("End Turn", 4)));

        let view = wait_for(&mut running.handle.view, |view| view.notice.is_some()).await;
        assert!(matches!(view.notice, Some(Notice::Alert(ref text)) if text.contains("Try again")));
        assert!(!view.button("End Turn").unwrap().disabled);
    }

    #[tokio::test]
    async fn successful_actions_stay_disabled_until_a_new_state() {
        let mut running = start(|_| Response::Done);
        running.store.set(StorageUpdate::new().game_state(Some(snapshot(4, &["End Turn"]))));
        toggle(&running).await;
        wait_for(&mut running.handle.view, |view| view.tray.is_some()).await;

        running.handle.ui.send(UiEvent::ClickAction("End Turn".into())).await.unwrap();
        running.requests.recv().await;
        wait_for(&mut running.handle.view, |view| view.button("End Turn").is_some_and(|button| button.disabled)).await;

        running.store.set(StorageUpdate::new().game_state(Some(snapshot(5, &["End Turn"]))));
        let view = wait_for(&mut running.handle.view, |view| view.renders == 2).await;
        assert!(!view.button("End Turn").unwrap().disabled);
    }

    #[tokio::test]
    async fn different_actions_swap_in_after_the_delay() {
        let mut running = start(|_| Response::Done);
        running.store.set(StorageUpdate::new().game_state(Some(snapshot(1, &["End Turn"]))));
        toggle(&running).await;
        wait_for(&mut running.handle.view, |view| view.tray.is_some()).await;

        running.store.set(StorageUpdate::new().game_state(Some(snapshot(2, &["Pass"]))));
        let view = wait_for(&mut running.handle.view, |view| view.renders == 2).await;
        let tray = view.tray.unwrap();
        assert!(!tray.revealed);
        assert_eq!(tray.buttons[0].label, "End Turn");

        let view = wait_for(&mut running.handle.view, |view| view.tray.as_ref().is_some_and(|tray| tray.revealed)).await;
        assert_eq!(view.button("Pass").map(|button| button.version), Some(2));
    }

    #[tokio::test]
    async fn remote_formulas_render_the_page_result() {
        let mut running = start(|request| match request {
            Request::CheckFormula(payload) if payload.formula == "2*21" => Response::Formula(FormulaValue::Number(42.0)),
            Request::CheckFormula(_) => Response::Formula(FormulaValue::Number(4.0)),
            _ => Response::Done,
        });
        running.store.set(StorageUpdate::new().game_state(Some(snapshot(1, &[]))));
        toggle(&running).await;
        wait_for(&mut running.handle.view, |view| view.bank.is_some()).await;

        let command = Request::Command(CommandPayload { command: ShortcutCommand::TransactMoney });
        send_message(&running.handle.port, &command).await.unwrap();
        press(&running, "2*21").await;

        assert_eq!(running.requests.recv().await, Some(Request::check_formula("2*2")));
        assert_eq!(running.requests.recv().await, Some(Request::check_formula("2*21")));
        let view = wait_for(&mut running.handle.view, |view| view.form().is_some_and(|form| form.submit_label == "Gain 42")).await;
        let form = view.form().unwrap();
        assert!(form.submit_enabled);
        assert_eq!(form.token.as_deref(), Some("💲"));
    }

    #[tokio::test]
    async fn plain_numbers_need_no_round_trip() {
        let mut running = start(|_| Response::Done);
        running.store.set(StorageUpdate::new().game_state(Some(snapshot(1, &[]))));
        toggle(&running).await;
        wait_for(&mut running.handle.view, |view| view.bank.is_some()).await;

        running.handle.ui.send(UiEvent::ToggleForm).await.unwrap();
        running.handle.ui.send(UiEvent::FocusFormula).await.unwrap();
        press(&running, "-5").await;
        let view = wait_for(&mut running.handle.view, |view| view.form().is_some_and(|form| form.submit_enabled)).await;
        assert_eq!(view.form().unwrap().submit_label, "Lose 5");
        assert!(running.requests.try_recv().is_err());

        running.handle.ui.send(UiEvent::Key(Key::Enter { shift: true })).await.unwrap();
        let request = running.requests.recv().await.unwrap();
        assert!(matches!(request, Request::CreateTransaction(ref payload) if payload.formula == "-5" && payload.associate.is_none()));
        let view = wait_for(&mut running.handle.view, |view| view.form().is_some_and(|form| !form.open)).await;
        assert_eq!(view.form().unwrap().formula, "");
    }
}
