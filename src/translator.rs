use std::sync::Mutex;

use thiserror::Error;
use tracing::{debug, warn};

use crate::adapter::AdapterError;
use crate::channel::{Channel, OnOff, StateKey};
use crate::snapshot::StateSnapshot;

/// A decoded inbound frame from the link layer, already addressed to one of
/// this device's channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolEvent {
    /// Attribute report or read response carrying the channel's on/off level.
    AttributeReport { channel: Channel, on: bool },
    /// An On/Off/Toggle cluster command received from the device.
    Command { channel: Channel, command: Command },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    On,
    Off,
    /// Toggle carries the level it toggled from, when the frame includes it.
    Toggle { current: Option<bool> },
}

/// A fully resolved protocol write for the link-layer adapter to execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteInstruction {
    pub channel: Channel,
    pub on: bool,
}

/// A fully resolved protocol read for the link-layer adapter to execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadInstruction {
    pub channel: Channel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TranslateError {
    /// A toggle command arrived without the level it toggled from; guessing
    /// would risk commanding the wrong relay state.
    #[error("toggle command for channel {channel} carried no current on/off value")]
    AmbiguousToggle { channel: Channel },
}

/// Bidirectional translator between channel-indexed protocol traffic and the
/// flat `state_1`/`state_2` + `action` representation.
///
/// One instance per device. The only state is the last-known level per
/// channel, used to suppress duplicate actions when a report restates a value
/// that has not changed (reports get re-delivered on network retries). The
/// cache is never persisted and entries are only ever overwritten.
///
/// Each channel has its own lock; updates on different channels do not order
/// against each other.
#[derive(Debug, Default)]
pub struct Translator {
    cache: [Mutex<Option<bool>>; 2],
}

impl Translator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Translate one inbound event into the snapshot to publish.
    ///
    /// Attribute reports carry an `action` only when the level actually
    /// changed (a channel never seen before always counts as changed).
    /// Commands are explicit operator intents and always carry an `action`,
    /// even when the resulting level matches the cache. Either way the new
    /// level is stored.
    pub fn ingest(&self, event: ProtocolEvent) -> Result<StateSnapshot, TranslateError> {
        match event {
            ProtocolEvent::AttributeReport { channel, on } => {
                let previous = self.store(channel, on);
                let value = OnOff::from_bool(on);
                debug!(
                    "on/off report from endpoint {}: {} (previous: {:?})",
                    channel, value, previous
                );
                if previous == Some(on) {
                    Ok(StateSnapshot::state(channel, value))
                } else {
                    Ok(StateSnapshot::transition(channel, value))
                }
            }
            ProtocolEvent::Command { channel, command } => {
                let on = match command {
                    Command::On => true,
                    Command::Off => false,
                    Command::Toggle { current: Some(current) } => !current,
                    Command::Toggle { current: None } => {
                        return Err(TranslateError::AmbiguousToggle { channel });
                    }
                };
                self.store(channel, on);
                let value = OnOff::from_bool(on);
                debug!("on/off command from endpoint {}: {}", channel, value);
                Ok(StateSnapshot::transition(channel, value))
            }
        }
    }

    /// Resolve a set request into the write for the adapter to execute, plus
    /// the optimistic echo snapshot: the requested value is echoed back
    /// verbatim, regardless of whether the write later succeeds.
    ///
    /// The cache is not touched; the device reports the new level after the
    /// write and that report flows back through [`ingest`](Self::ingest).
    pub fn apply_set(
        &self,
        key: StateKey,
        value: OnOff,
        hint: Option<Channel>,
    ) -> (WriteInstruction, StateSnapshot) {
        let channel = key.resolve(hint);
        let instruction = WriteInstruction { channel, on: value.as_bool() };
        (instruction, StateSnapshot::state(channel, value))
    }

    /// Resolve a get request into the read for the adapter to execute.
    pub fn apply_get(&self, key: StateKey, hint: Option<Channel>) -> ReadInstruction {
        ReadInstruction { channel: key.resolve(hint) }
    }

    /// Map the adapter's read result back into a snapshot.
    ///
    /// An unreachable endpoint is not an error: the field defaults to `OFF`
    /// so the host still has something to display. Real link failures
    /// propagate.
    pub fn complete_get(
        &self,
        channel: Channel,
        result: Result<bool, AdapterError>,
    ) -> Result<StateSnapshot, AdapterError> {
        match result {
            Ok(on) => Ok(StateSnapshot::state(channel, OnOff::from_bool(on))),
            Err(AdapterError::Unreachable(_)) => {
                warn!("endpoint {} unreachable for read, reporting OFF", channel);
                Ok(StateSnapshot::state(channel, OnOff::Off))
            }
            Err(e) => Err(e),
        }
    }

    /// Last-known level for a channel, if one has been observed.
    pub fn last_known(&self, channel: Channel) -> Option<bool> {
        *self.cache[channel.index()]
            .lock()
            .expect("state cache lock poisoned")
    }

    fn store(&self, channel: Channel, on: bool) -> Option<bool> {
        let mut slot = self.cache[channel.index()]
            .lock()
            .expect("state cache lock poisoned");
        slot.replace(on)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::Action;

    fn report(channel: Channel, on: bool) -> ProtocolEvent {
        ProtocolEvent::AttributeReport { channel, on }
    }

    #[test]
    fn first_observation_always_fires_action() {
        let translator = Translator::new();
        let snapshot = translator.ingest(report(Channel::One, false)).unwrap();
        assert_eq!(snapshot.state_1, Some(OnOff::Off));
        assert_eq!(
            snapshot.action,
            Some(Action { channel: Channel::One, state: OnOff::Off })
        );
    }

    #[test]
    fn duplicate_report_suppresses_action() {
        let translator = Translator::new();
        let first = translator.ingest(report(Channel::One, false)).unwrap();
        assert!(first.action.is_some());

        let second = translator.ingest(report(Channel::One, false)).unwrap();
        assert_eq!(second.state_1, Some(OnOff::Off));
        assert_eq!(second.action, None);

        let third = translator.ingest(report(Channel::One, true)).unwrap();
        assert_eq!(third.state_1, Some(OnOff::On));
        assert_eq!(
            third.action,
            Some(Action { channel: Channel::One, state: OnOff::On })
        );
    }

    #[test]
    fn action_fires_iff_value_changed() {
        let translator = Translator::new();
        let sequence = [false, false, true, true, true, false];
        let mut previous: Option<bool> = None;
        for on in sequence {
            let snapshot = translator.ingest(report(Channel::Two, on)).unwrap();
            assert_eq!(snapshot.action.is_some(), previous != Some(on));
            previous = Some(on);
        }
    }

    #[test]
    fn channels_are_independent() {
        let translator = Translator::new();
        translator.ingest(report(Channel::One, true)).unwrap();
        // First observation on channel 2 fires even though channel 1 is warm.
        let snapshot = translator.ingest(report(Channel::Two, true)).unwrap();
        assert!(snapshot.action.is_some());
        assert_eq!(snapshot.state_1, None);
        assert_eq!(snapshot.state_2, Some(OnOff::On));
    }

    #[test]
    fn commands_always_fire_action() {
        let translator = Translator::new();
        translator.ingest(report(Channel::One, true)).unwrap();
        // Command lands on the value already cached; still an action.
        let snapshot = translator
            .ingest(ProtocolEvent::Command { channel: Channel::One, command: Command::On })
            .unwrap();
        assert_eq!(
            snapshot.action,
            Some(Action { channel: Channel::One, state: OnOff::On })
        );
        assert_eq!(translator.last_known(Channel::One), Some(true));
    }

    #[test]
    fn toggle_negates_carried_value() {
        let translator = Translator::new();
        let snapshot = translator
            .ingest(ProtocolEvent::Command {
                channel: Channel::Two,
                command: Command::Toggle { current: Some(true) },
            })
            .unwrap();
        assert_eq!(snapshot.state_2, Some(OnOff::Off));
        assert_eq!(
            snapshot.action,
            Some(Action { channel: Channel::Two, state: OnOff::Off })
        );
        assert_eq!(translator.last_known(Channel::Two), Some(false));
    }

    #[test]
    fn toggle_without_current_value_is_an_error() {
        let translator = Translator::new();
        let result = translator.ingest(ProtocolEvent::Command {
            channel: Channel::One,
            command: Command::Toggle { current: None },
        });
        assert_eq!(
            result,
            Err(TranslateError::AmbiguousToggle { channel: Channel::One })
        );
        // Nothing stored on the error path.
        assert_eq!(translator.last_known(Channel::One), None);
    }

    #[test]
    fn set_resolves_per_channel_keys() {
        let translator = Translator::new();
        let (write, echo) = translator.apply_set(StateKey::State1, OnOff::On, None);
        assert_eq!(write, WriteInstruction { channel: Channel::One, on: true });
        assert_eq!(echo.state_1, Some(OnOff::On));
        assert_eq!(echo.action, None);

        let (write, echo) = translator.apply_set(StateKey::State2, OnOff::Off, Some(Channel::One));
        assert_eq!(write, WriteInstruction { channel: Channel::Two, on: false });
        assert_eq!(echo.state_2, Some(OnOff::Off));
    }

    #[test]
    fn generic_set_defaults_to_channel_one() {
        let translator = Translator::new();
        let (write, echo) = translator.apply_set(StateKey::State, OnOff::On, None);
        assert_eq!(write.channel, Channel::One);
        assert_eq!(echo.state_1, Some(OnOff::On));
    }

    #[test]
    fn set_does_not_touch_cache() {
        let translator = Translator::new();
        translator.apply_set(StateKey::State1, OnOff::On, None);
        assert_eq!(translator.last_known(Channel::One), None);
    }

    #[test]
    fn get_resolves_and_fails_open_when_unreachable() {
        let translator = Translator::new();
        let read = translator.apply_get(StateKey::State2, None);
        assert_eq!(read.channel, Channel::Two);

        let snapshot = translator
            .complete_get(Channel::Two, Err(AdapterError::Unreachable(Channel::Two)))
            .unwrap();
        assert_eq!(snapshot.state_2, Some(OnOff::Off));
        assert_eq!(snapshot.action, None);
    }

    #[test]
    fn get_propagates_link_errors() {
        let translator = Translator::new();
        let result =
            translator.complete_get(Channel::One, Err(AdapterError::Link("timeout".into())));
        assert!(result.is_err());
    }

    #[test]
    fn get_maps_read_result() {
        let translator = Translator::new();
        let snapshot = translator.complete_get(Channel::One, Ok(true)).unwrap();
        assert_eq!(snapshot.state_1, Some(OnOff::On));
    }
}
