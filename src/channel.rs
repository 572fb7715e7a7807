use std::fmt;

use serde::{Deserialize, Serialize, Serializer};
use tracing::debug;

/// One addressable relay output on the device.
///
/// The set is closed and known at definition time: the SR2CH10A exposes
/// exactly two relays, on Zigbee endpoints 1 and 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    One,
    Two,
}

impl Channel {
    pub const ALL: [Channel; 2] = [Channel::One, Channel::Two];

    /// Map a wire endpoint id to a channel. Traffic for any other endpoint
    /// on the same bus is not ours and maps to `None`.
    pub fn from_endpoint(endpoint: u8) -> Option<Self> {
        match endpoint {
            1 => Some(Channel::One),
            2 => Some(Channel::Two),
            _ => None,
        }
    }

    pub fn endpoint(self) -> u8 {
        match self {
            Channel::One => 1,
            Channel::Two => 2,
        }
    }

    /// Name of the state field published for this channel.
    pub fn state_field(self) -> &'static str {
        match self {
            Channel::One => "state_1",
            Channel::Two => "state_2",
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            Channel::One => 0,
            Channel::Two => 1,
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.endpoint())
    }
}

/// A settable/gettable field name, as addressed by the host.
///
/// `State` is the generic form some hosts send instead of the per-channel
/// fields; it resolves through an optional channel hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateKey {
    State1,
    State2,
    State,
}

impl StateKey {
    /// Parse a field name. Unknown fields yield `None`: unrelated traffic on
    /// the bus must not disturb this device's translation.
    pub fn parse(field: &str) -> Option<Self> {
        match field {
            "state_1" => Some(StateKey::State1),
            "state_2" => Some(StateKey::State2),
            "state" => Some(StateKey::State),
            _ => None,
        }
    }

    /// Resolve to a concrete channel. The generic `state` key follows the
    /// hint when one is given and otherwise defaults to channel 1, matching
    /// the device's observed convention. The default is logged so a caller
    /// that forgot the hint is visible.
    pub fn resolve(self, hint: Option<Channel>) -> Channel {
        match self {
            StateKey::State1 => Channel::One,
            StateKey::State2 => Channel::Two,
            StateKey::State => hint.unwrap_or_else(|| {
                debug!("generic 'state' key with no channel hint, defaulting to channel 1");
                Channel::One
            }),
        }
    }
}

/// On/off level as published to the host: the literal strings `ON`/`OFF`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OnOff {
    #[serde(rename = "ON")]
    On,
    #[serde(rename = "OFF")]
    Off,
}

impl OnOff {
    pub fn from_bool(on: bool) -> Self {
        if on { OnOff::On } else { OnOff::Off }
    }

    pub fn as_bool(self) -> bool {
        matches!(self, OnOff::On)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OnOff::On => "ON",
            OnOff::Off => "OFF",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "ON" => Some(OnOff::On),
            "OFF" => Some(OnOff::Off),
            _ => None,
        }
    }
}

impl fmt::Display for OnOff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A discrete transition event: `on_l1`, `off_l1`, `on_l2`, `off_l2`.
///
/// Distinct from the state fields, which are levels; an action fires once
/// per transition and drives host automations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Action {
    pub channel: Channel,
    pub state: OnOff,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self.state {
            OnOff::On => "on",
            OnOff::Off => "off",
        };
        write!(f, "{}_l{}", verb, self.channel.endpoint())
    }
}

impl Serialize for Action {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
