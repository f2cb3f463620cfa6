use std::{fmt, str::FromStr};

use anyhow::bail;

use crate::{error::SyncError, snapshot::PlayerId};

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "kebab-case")]
pub enum Request {
    Ping,
    Connect,
    Disconnect,
    Toggle,
    UserAction (UserActionPayload),
    CreateTransaction (TransactionPayload),
    CheckFormula (FormulaPayload),
    Command (CommandPayload),
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserActionPayload {
    pub action: String,
    pub game_state_version: u64,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TransactionPayload {
    pub token: String,
    pub formula: String,
    /// Counterpart player, `None` for the bank.
    pub associate: Option<PlayerId>,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FormulaPayload {
    pub formula: String,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CommandPayload {
    pub command: ShortcutCommand,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    Ping,
    Connect,
    Disconnect,
    Toggle,
    UserAction,
    CreateTransaction,
    CheckFormula,
    Command,
}

impl Request {
    pub fn kind(&self) -> RequestKind {
        match self {
            Request::Ping => RequestKind::Ping,
            Request::Connect => RequestKind::Connect,
            Request::Disconnect => RequestKind::Disconnect,
            Request::Toggle => RequestKind::Toggle,
            Request::UserAction(_) => RequestKind::UserAction,
            Request::CreateTransaction(_) => RequestKind::CreateTransaction,
            Request::CheckFormula(_) => RequestKind::CheckFormula,
            Request::Command(_) => RequestKind::Command,
        }
    }

    pub fn user_action(action: impl Into<String>, game_state_version: u64) -> Request {
        Request::UserAction(UserActionPayload { action: action.into(), game_state_version })
    }

    pub fn check_formula(formula: impl Into<String>) -> Request {
        Request::CheckFormula(FormulaPayload { formula: formula.into() })
    }
}

impl RequestKind {
    /// Kinds the coordinator forwards to the bound source tab.
    pub fn is_relayed(self) -> bool {
        matches!(self, RequestKind::UserAction | RequestKind::CreateTransaction | RequestKind::CheckFormula)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RequestKind::Ping => "ping",
            RequestKind::Connect => "connect",
            RequestKind::Disconnect => "disconnect",
            RequestKind::Toggle => "toggle",
            RequestKind::UserAction => "user action",
            RequestKind::CreateTransaction => "create transaction",
            RequestKind::CheckFormula => "check formula",
            RequestKind::Command => "command",
        }
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Response {
    Pong,
    Connected (bool),
    Ack,
    Active (bool),
    Done,
    Formula (FormulaValue),
    Error (SyncError),
}

impl Response {
    pub fn into_result(self) -> Result<Response, SyncError> {
        match self {
            Response::Error(e) => Err(e),
            other => Ok(other),
        }
    }
}

impl From<Result<Response, SyncError>> for Response {
    fn from(result: Result<Response, SyncError>) -> Response {
        match result {
            Ok(response) => response,
            Err(e) => Response::Error(e),
        }
    }
}

/// Result of evaluating a formula on the source page. JSON has no encoding
/// for infinities or NaN, so they get their own variants.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FormulaValue {
    Number (f64),
    Infinite { negative: bool },
    NotANumber,
}

impl FormulaValue {
    pub fn from_f64(value: f64) -> FormulaValue {
        if value.is_nan() {
            FormulaValue::NotANumber
        } else if value.is_infinite() {
            FormulaValue::Infinite { negative: value < 0.0 }
        } else {
            FormulaValue::Number(value)
        }
    }

    pub fn as_f64(self) -> f64 {
        match self {
            FormulaValue::Number(value) => value,
            FormulaValue::Infinite { negative: false } => f64::INFINITY,
            FormulaValue::Infinite { negative: true } => f64::NEG_INFINITY,
            FormulaValue::NotANumber => f64::NAN,
        }
    }

    /// Parses the textual result the page writes into its result attribute.
    pub fn parse(text: &str) -> Option<FormulaValue> {
        match text.trim() {
            "Infinity" | "+Infinity" => Some(FormulaValue::Infinite { negative: false }),
            "-Infinity" => Some(FormulaValue::Infinite { negative: true }),
            "NaN" => Some(FormulaValue::NotANumber),
            number => {
                let value = number.parse::<f64>().ok()?;
                value.is_finite().then_some(FormulaValue::Number(value))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ShortcutCommand {
    ShowHideLog,
    TransactMoney,
    TransactVp,
    ShowHideOpponentScore,
}

impl ShortcutCommand {
    pub fn as_str(self) -> &'static str {
        match self {
            ShortcutCommand::ShowHideLog => "show-hide-log",
            ShortcutCommand::TransactMoney => "transact-money",
            ShortcutCommand::TransactVp => "transact-vp",
            ShortcutCommand::ShowHideOpponentScore => "show-hide-opponent-score",
        }
    }
}

impl FromStr for ShortcutCommand {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<ShortcutCommand> {
        Ok(match s {
            "show-hide-log" => ShortcutCommand::ShowHideLog,
            "transact-money" => ShortcutCommand::TransactMoney,
            "transact-vp" => ShortcutCommand::TransactVp,
            "show-hide-opponent-score" => ShortcutCommand::ShowHideOpponentScore,
            other => bail!("unknown command: {other}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requests_are_tagged_by_type() {
        let json = serde_json::to_string(&Request::user_action("Pass", 7)).unwrap();
        assert_eq!(json, r#"{"type":"user-action","payload":{"action":"Pass","gameStateVersion":7}}"#);
        assert_eq!(serde_json::to_string(&Request::Ping).unwrap(), r#"{"type":"ping"}"#);
    }

    #[test]
    fn only_page_requests_are_relayed() {
        assert!(RequestKind::UserAction.is_relayed());
        assert!(RequestKind::CheckFormula.is_relayed());
        assert!(RequestKind::CreateTransaction.is_relayed());
        assert!(!RequestKind::Connect.is_relayed());
        assert!(!RequestKind::Toggle.is_relayed());
    }

    #[test]
    fn formula_values_parse_page_text() {
        assert_eq!(FormulaValue::parse("42"), Some(FormulaValue::Number(42.0)));
        assert_eq!(FormulaValue::parse("-Infinity"), Some(FormulaValue::Infinite { negative: true }));
        assert_eq!(FormulaValue::parse("NaN"), Some(FormulaValue::NotANumber));
        assert_eq!(FormulaValue::parse("forty"), None);
        assert!(FormulaValue::from_f64(f64::NAN).as_f64().is_nan());
    }

    #[test]
    fn unknown_commands_are_rejected() {
        assert_eq!("transact-vp".parse::<ShortcutCommand>().unwrap(), ShortcutCommand::TransactVp);
        assert!("paste".parse::<ShortcutCommand>().is_err());
    }
}
