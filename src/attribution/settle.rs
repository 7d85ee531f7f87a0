//! Redirect-aware settle detection for automated tabs.
//!
//! A single "page complete" signal is unreliable on redirect-heavy search
//! engines: the interstitial redirect stub also fires "complete", so parsing
//! at that point reads an empty page. The only trustworthy signal is a
//! quiescence window: a "complete" followed by `settle` time with no new
//! "loading". This module is the pure transition table for that logic; the
//! runner owns the actual timers and feeds events in.

/// A navigation lifecycle event observed on the tab.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum NavEvent {
    /// A (re)load started; the page is not final.
    Loading,
    /// The current load finished, possibly a redirect stub.
    Complete,
}

/// Where the tab currently stands.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SettleState {
    /// A load is in flight; any pending settle timer is stale.
    Loading,
    /// The last load completed; waiting out the quiescence window.
    SettlePending,
}

/// What the timer owner must do after feeding an event in.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TimerAction {
    /// Cancel any running settle timer.
    Cancel,
    /// (Re)start the settle timer from zero.
    Restart,
}

/// The settle transition table.
///
/// The runner feeds every navigation event through [`SettleMachine::on_event`]
/// and obeys the returned [`TimerAction`]. When the settle timer fires while
/// the machine is in [`SettleState::SettlePending`], the page is considered
/// settled and parsing may begin.
#[derive(Clone, Copy, Debug)]
pub struct SettleMachine {
    state: SettleState,
}

impl Default for SettleMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl SettleMachine {
    /// A machine for a freshly opened tab (initial navigation in flight).
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: SettleState::Loading,
        }
    }

    /// Feed one navigation event in; returns what to do with the settle timer.
    pub fn on_event(&mut self, event: NavEvent) -> TimerAction {
        match event {
            NavEvent::Loading => {
                self.state = SettleState::Loading;
                TimerAction::Cancel
            }
            NavEvent::Complete => {
                self.state = SettleState::SettlePending;
                TimerAction::Restart
            }
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> SettleState {
        self.state
    }

    /// True when a firing settle timer actually means "settled".
    ///
    /// A timer that fires after a new `Loading` event raced past the cancel
    /// must be ignored; this is the check for that.
    #[must_use]
    pub const fn is_settle_valid(&self) -> bool {
        matches!(self.state, SettleState::SettlePending)
    }
}
