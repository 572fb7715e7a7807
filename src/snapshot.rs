use serde::Serialize;

use crate::channel::{Action, Channel, OnOff};

/// The externally visible state shape, published to the host bus as JSON.
///
/// Absent fields are skipped, so a single-channel update serializes to
/// `{"state_1":"ON"}` and a transition to `{"state_1":"ON","action":"on_l1"}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct StateSnapshot {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_1: Option<OnOff>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_2: Option<OnOff>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<Action>,
}

impl StateSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Snapshot carrying only the level field for one channel.
    pub fn state(channel: Channel, value: OnOff) -> Self {
        let mut snapshot = Self::default();
        match channel {
            Channel::One => snapshot.state_1 = Some(value),
            Channel::Two => snapshot.state_2 = Some(value),
        }
        snapshot
    }

    /// Snapshot carrying the level field plus the matching transition action.
    pub fn transition(channel: Channel, value: OnOff) -> Self {
        let mut snapshot = Self::state(channel, value);
        snapshot.action = Some(Action { channel, state: value });
        snapshot
    }

    pub fn state_for(&self, channel: Channel) -> Option<OnOff> {
        match channel {
            Channel::One => self.state_1,
            Channel::Two => self.state_2,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.state_1.is_none() && self.state_2.is_none() && self.action.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_fields_are_skipped_in_json() {
        let snapshot = StateSnapshot::state(Channel::One, OnOff::On);
        assert_eq!(
            serde_json::to_string(&snapshot).unwrap(),
            r#"{"state_1":"ON"}"#
        );
    }

    #[test]
    fn transition_includes_action() {
        let snapshot = StateSnapshot::transition(Channel::Two, OnOff::Off);
        assert_eq!(
            serde_json::to_string(&snapshot).unwrap(),
            r#"{"state_2":"OFF","action":"off_l2"}"#
        );
    }

    #[test]
    fn empty_snapshot() {
        let snapshot = StateSnapshot::empty();
        assert!(snapshot.is_empty());
        assert_eq!(serde_json::to_string(&snapshot).unwrap(), "{}");
    }
}
