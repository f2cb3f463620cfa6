//! A simulated Shared Game Timer page: the game model, its DOM contract and
//! the formula evaluator behind its bank-transfer panel.

pub mod formula_eval;
pub mod game;
pub mod page;

pub use game::{LogRecord, Player, TimerGame};
pub use page::SimulatedTimerPage;
