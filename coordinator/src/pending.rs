use std::collections::HashMap;

use host::Responder;
use msgs::{RequestKind, Response, SyncError, TabId};
use tokio::time::Instant;
use uuid::Uuid;

pub struct PendingCall {
    pub target: TabId,
    pub kind: RequestKind,
    pub opened_at: Instant,
    responder: Responder,
}

/// Relayed calls waiting for the source tab. Each is answered exactly once:
/// whichever of response, failure or target loss comes first wins.
#[derive(Default)]
pub struct PendingCalls {
    calls: HashMap<Uuid, PendingCall>,
}

impl PendingCalls {
    pub fn new() -> PendingCalls {
        PendingCalls::default()
    }

    pub fn open(&mut self, target: TabId, kind: RequestKind, responder: Responder) -> Uuid {
        let call_id = Uuid::new_v4();
        self.calls.insert(call_id, PendingCall { target, kind, opened_at: Instant::now(), responder });
        call_id
    }

    /// Answers the call with the outcome of the relay. Returns false if the
    /// call was already answered.
    pub fn complete(&mut self, call_id: Uuid, result: Result<Vec<u8>, SyncError>) -> bool {
        let Some(call) = self.calls.remove(&call_id) else {
            tracing::debug!(%call_id, "late relay result dropped");
            return false
        };
        let elapsed = call.opened_at.elapsed();
        match result {
            Ok(frame) => {
                tracing::debug!(%call_id, kind = %call.kind, ?elapsed, "relay answered");
                call.responder.respond_raw(frame);
            }
            Err(e) => {
                tracing::warn!(%call_id, kind = %call.kind, ?elapsed, "relay failed: {e}");
                call.responder.respond(&Response::Error(e));
            }
        }
        true
    }

    /// Fails every call aimed at `tab`. Returns how many were failed.
    pub fn fail_target(&mut self, tab: TabId, error: SyncError) -> usize {
        let call_ids: Vec<Uuid> = self.calls.iter().filter(|(_, call)| call.target == tab).map(|(id, _)| *id).collect();
        for call_id in &call_ids {
            self.complete(*call_id, Err(error.clone()));
        }
        call_ids.len()
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use host::Delivery;
    use msgs::wire::{decode, to_frame};
    use tokio::sync::oneshot;

    use super::*;

    fn responder() -> (Responder, oneshot::Receiver<Vec<u8>>) {
        let (tx, rx) = oneshot::channel();
        let (_, responder) = Delivery { frame: Vec::new(), reply: Some(tx) }.into_parts();
        (responder, rx)
    }

    #[tokio::test]
    async fn calls_are_answered_once() {
        let mut pending = PendingCalls::new();
        let (responder, rx) = responder();
        let call_id = pending.open(1, RequestKind::CheckFormula, responder);

        assert!(pending.complete(call_id, Ok(to_frame(&Response::Done).unwrap())));
        assert!(!pending.complete(call_id, Err(SyncError::unreachable("late"))));
        assert_eq!(decode::<Response>(&rx.await.unwrap()).unwrap(), Response::Done);
        assert!(pending.is_empty());
    }

    #[tokio::test]
    async fn losing_the_target_fails_only_its_calls() {
        let mut pending = PendingCalls::new();
        let (first, first_rx) = responder();
        let (second, _second_rx) = responder();
        pending.open(1, RequestKind::UserAction, first);
        pending.open(2, RequestKind::UserAction, second);

        assert_eq!(pending.fail_target(1, SyncError::unreachable("tab closed")), 1);
        assert_eq!(pending.len(), 1);
        let response = decode::<Response>(&first_rx.await.unwrap()).unwrap();
        assert!(matches!(response, Response::Error(SyncError::Unreachable(_))));
    }
}
