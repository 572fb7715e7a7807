//! Device definition for the Robo SR2CH10A two-channel Zigbee relay router.
//!
//! The host runtime owns the radio, the network topology and the message
//! bus; this crate owns the translation between channel-indexed protocol
//! traffic and the flat `state_1`/`state_2` + `action` representation the
//! host publishes, plus the configuration and lifecycle hooks the host
//! invokes around it.
//!
//! The core is [`Translator`]: duplicate attribute reports are folded into
//! level-only updates, genuine transitions and commands surface as `on_lN`/
//! `off_lN` actions, and set/get intents resolve into channel-addressed
//! instructions for the host's [`LinkAdapter`]. [`Device`] wires the
//! translator to an adapter and owns the periodic resync task.

mod adapter;
mod channel;
mod device;
mod snapshot;
mod translator;

pub use adapter::{AdapterError, Cluster, LinkAdapter, PowerSource, ReportingPolicy};
pub use channel::{Action, Channel, OnOff, StateKey};
pub use device::{
    Device, DeviceMetadata, SwitchCapability, MANUFACTURER_CODE, METADATA, MODEL, RESYNC_INTERVAL,
    VENDOR,
};
pub use snapshot::StateSnapshot;
pub use translator::{
    Command, ProtocolEvent, ReadInstruction, TranslateError, Translator, WriteInstruction,
};
