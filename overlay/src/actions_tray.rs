#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionButton {
    pub label: String,
    /// Version of the snapshot the button was stamped with.
    pub version: u64,
    pub disabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrayChange {
    Revealed,
    Retracted,
    /// Old buttons slide out; the new set goes in once the swap completes.
    SwapScheduled,
    Restamped,
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct PendingSwap {
    actions: Vec<String>,
    version: u64,
}

/// The local player's action buttons.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionsTray {
    buttons: Vec<ActionButton>,
    revealed: bool,
    pending_swap: Option<PendingSwap>,
}

fn stamp(actions: &[String], version: u64) -> Vec<ActionButton> {
    actions
        .iter()
        .map(|label| ActionButton { label: label.clone(), version, disabled: false })
        .collect()
}

impl ActionsTray {
    pub fn new() -> ActionsTray {
        ActionsTray::default()
    }

    pub fn buttons(&self) -> &[ActionButton] {
        &self.buttons
    }

    pub fn revealed(&self) -> bool {
        self.revealed
    }

    pub fn has_pending_swap(&self) -> bool {
        self.pending_swap.is_some()
    }

    fn same_actions(&self, actions: &[String]) -> bool {
        actions.len() == self.buttons.len() && actions.iter().all(|action| self.buttons.iter().any(|button| button.label == *action))
    }

    /// Brings the tray in line with the actions of a new snapshot.
    ///
    /// Retracting keeps the old buttons so they stay visible while sliding
    /// out. A snapshot arriving during a swap replaces what will be swapped in.
    pub fn reconcile(&mut self, actions: &[String], version: u64) -> TrayChange {
        let has_actions = !actions.is_empty();

        if let Some(swap) = &mut self.pending_swap {
            if has_actions {
                swap.actions = actions.to_vec();
                swap.version = version;
                return TrayChange::SwapScheduled;
            }
            self.pending_swap = None;
            return TrayChange::Retracted;
        }

        match (self.revealed, has_actions) {
            (false, true) => {
                self.buttons = stamp(actions, version);
                self.revealed = true;
                TrayChange::Revealed
            }
            (true, false) => {
                self.revealed = false;
                TrayChange::Retracted
            }
            (true, true) if !self.same_actions(actions) => {
                self.revealed = false;
                self.pending_swap = Some(PendingSwap { actions: actions.to_vec(), version });
                TrayChange::SwapScheduled
            }
            (true, true) => {
                // A click is only valid against the version it was rendered
                // with, so a newer state makes the buttons clickable again.
                for button in &mut self.buttons {
                    if version > button.version {
                        button.disabled = false;
                    }
                    button.version = version;
                }
                TrayChange::Restamped
            }
            (false, false) => TrayChange::Unchanged,
        }
    }

    /// Puts the pending buttons in and reveals them. False if nothing was pending.
    pub fn complete_swap(&mut self) -> bool {
        let Some(swap) = self.pending_swap.take() else {
            return false;
        };
        self.buttons = stamp(&swap.actions, swap.version);
        self.revealed = true;
        true
    }

    pub fn set_disabled(&mut self, disabled: bool) {
        for button in &mut self.buttons {
            button.disabled = disabled;
        }
    }

    pub fn button(&self, label: &str) -> Option<&ActionButton> {
        self.buttons.iter().find(|button| button.label == label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actions(labels: &[&str]) -> Vec<String> {
        labels.iter().map(|label| label.to_string()).collect()
    }

    fn labels(tray: &ActionsTray) -> Vec<&str> {
        tray.buttons().iter().map(|button| button.label.as_str()).collect()
    }

    #[test]
    fn first_actions_reveal_immediately() {
        let mut tray = ActionsTray::new();
        assert_eq!(tray.reconcile(&[], 1), TrayChange::Unchanged);
        assert_eq!(tray.reconcile(&actions(&["End Turn"]), 2), TrayChange::Revealed);
        assert!(tray.revealed());
        assert_eq!(tray.button("End Turn").map(|b| b.version), Some(2));
    }

    #[test]
    fn losing_actions_keeps_the_old_buttons() {
        let mut tray = ActionsTray::new();
        tray.reconcile(&actions(&["End Turn"]), 1);
        assert_eq!(tray.reconcile(&[], 2), TrayChange::Retracted);
        assert!(!tray.revealed());
        assert_eq!(labels(&tray), vec!["End Turn"]);
    }

    #[test]
    fn different_actions_swap_after_retracting() {
        let mut tray = ActionsTray::new();
        tray.reconcile(&actions(&["End Turn"]), 1);
        assert_eq!(tray.reconcile(&actions(&["Pass"]), 2), TrayChange::SwapScheduled);
        assert!(!tray.revealed());
        assert_eq!(labels(&tray), vec!["End Turn"]);

        // a newer snapshot during the swap changes what goes in
        assert_eq!(tray.reconcile(&actions(&["Pass", "Undo"]), 3), TrayChange::SwapScheduled);
        assert!(tray.complete_swap());
        assert!(tray.revealed());
        assert_eq!(labels(&tray), vec!["Pass", "Undo"]);
        assert_eq!(tray.button("Undo").map(|b| b.version), Some(3));
        assert!(!tray.complete_swap());
    }

    #[test]
    fn retraction_during_a_swap_cancels_it() {
        let mut tray = ActionsTray::new();
        tray.reconcile(&actions(&["End Turn"]), 1);
        tray.reconcile(&actions(&["Pass"]), 2);
        assert_eq!(tray.reconcile(&[], 3), TrayChange::Retracted);
        assert!(!tray.has_pending_swap());
        assert!(!tray.complete_swap());
    }

    #[test]
    fn same_actions_only_restamp() {
        let mut tray = ActionsTray::new();
        tray.reconcile(&actions(&["End Turn", "Pass"]), 1);
        tray.set_disabled(true);

        assert_eq!(tray.reconcile(&actions(&["Pass", "End Turn"]), 1), TrayChange::Restamped);
        assert!(tray.buttons().iter().all(|b| b.disabled));

        assert_eq!(tray.reconcile(&actions(&["End Turn", "Pass"]), 4), TrayChange::Restamped);
        assert!(tray.buttons().iter().all(|b| !b.disabled && b.version == 4));
        assert_eq!(labels(&tray), vec!["End Turn", "Pass"]);
    }
}
