use host::GamePage;
use msgs::{message::UserActionPayload, Response, SyncError};

use crate::extract::parse_version;

/// Clicks the local player's controls labelled `action`, but only if the
/// page is still at the version the caller saw.
pub fn perform_user_action(page: &dyn GamePage, payload: &UserActionPayload) -> Result<Response, SyncError> {
    let anchor = page.anchor().ok_or_else(|| SyncError::Rejected("The game page is missing!".into()))?;
    let current = parse_version(anchor.version.as_deref())?;
    if current != payload.game_state_version {
        return Err(SyncError::StaleVersion { requested: payload.game_state_version, current });
    }

    let clicked = page.click_user_action(&payload.action);
    tracing::debug!(action = %payload.action, version = current, clicked, "user action performed");
    Ok(Response::Done)
}
