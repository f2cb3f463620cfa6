use std::{sync::Arc, time::Duration};

use host::{
    page::{Mutation, PanelAttributes, PanelTrigger, TransferField, BANK_PANEL_ID, PANEL_ERROR_SENTINEL},
    GamePage,
};
use msgs::{
    message::{FormulaPayload, FormulaValue, TransactionPayload},
    Response, SyncError,
};
use tokio::{
    sync::{broadcast::error::RecvError, Mutex},
    time::timeout,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelOutcome {
    Value (String),
    Error (String),
}

/// Where the panel is in answering a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelState {
    /// Result cleared.
    Idle,
    /// Error flagged, detail not written yet.
    Transitional,
    Final (PanelOutcome),
}

pub fn classify(attributes: &PanelAttributes) -> PanelState {
    if attributes.result.is_empty() {
        PanelState::Idle
    } else if attributes.result == PANEL_ERROR_SENTINEL {
        if attributes.error.is_empty() {
            PanelState::Transitional
        } else {
            PanelState::Final(PanelOutcome::Error(attributes.error.clone()))
        }
    } else {
        PanelState::Final(PanelOutcome::Value(attributes.result.clone()))
    }
}

/// Request/response over the page's bank-transfer panel. The panel has a
/// single result slot, so calls take turns.
#[derive(Clone)]
pub struct BackChannel {
    page: Arc<dyn GamePage>,
    slot: Arc<Mutex<()>>,
    limit: Duration,
}

impl BackChannel {
    pub fn new(page: Arc<dyn GamePage>, limit: Duration) -> BackChannel {
        BackChannel {
            page,
            slot: Arc::new(Mutex::new(())),
            limit,
        }
    }

    pub async fn create_transaction(&self, payload: &TransactionPayload) -> Result<Response, SyncError> {
        let associate = payload.associate.as_deref().unwrap_or("");
        let fields = [
            (TransferField::Associate, associate),
            (TransferField::Formula, payload.formula.as_str()),
            (TransferField::Token, payload.token.as_str()),
        ];
        match self.round_trip("create transaction", &fields, PanelTrigger::Submit).await? {
            PanelOutcome::Value(_) => Ok(Response::Done),
            PanelOutcome::Error(detail) => Err(SyncError::Rejected(detail)),
        }
    }

    pub async fn check_formula(&self, payload: &FormulaPayload) -> Result<Response, SyncError> {
        let fields = [(TransferField::Formula, payload.formula.as_str())];
        match self.round_trip("check formula", &fields, PanelTrigger::Check).await? {
            PanelOutcome::Value(text) => FormulaValue::parse(&text)
                .map(Response::Formula)
                .ok_or_else(|| SyncError::Malformed(format!("unreadable formula result {text:?}"))),
            PanelOutcome::Error(detail) => Err(SyncError::InvalidFormula(detail)),
        }
    }

    async fn round_trip(&self, operation: &str, fields: &[(TransferField, &str)], trigger: PanelTrigger) -> Result<PanelOutcome, SyncError> {
        let _slot = self.slot.lock().await;

        let mut mutations = self.page.observe();
        for (field, value) in fields {
            if !self.page.set_transfer_field(*field, value) {
                return Err(SyncError::Rejected(format!("the page has no {field:?} input")));
            }
        }
        if !self.page.click_panel(trigger) {
            return Err(SyncError::Rejected(format!("the page has no {trigger:?} button")));
        }

        let wait = async {
            loop {
                match mutations.recv().await {
                    Ok(Mutation::AttributeChanged { node, .. }) if node == BANK_PANEL_ID => {}
                    Ok(_) => continue,
                    Err(RecvError::Lagged(skipped)) => tracing::debug!(skipped, "panel observer lagged"),
                    Err(RecvError::Closed) => return Err(SyncError::unreachable("the page went away")),
                }
                let Some(attributes) = self.page.panel_attributes() else {
                    return Err(SyncError::Rejected("the bank transfer panel is gone".into()));
                };
                match classify(&attributes) {
                    PanelState::Final(outcome) => return Ok(outcome),
                    state => tracing::trace!(?state, "panel not final yet"),
                }
            }
        };

        timeout(self.limit, wait).await.map_err(|_| SyncError::timeout(operation, self.limit))?
    }
}
