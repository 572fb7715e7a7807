use std::future::Future;

use thiserror::Error;

use crate::channel::Channel;

/// Zigbee clusters this device binds during configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cluster {
    OnOff,
    Basic,
    Identify,
}

/// Attribute reporting parameters for one cluster on one endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportingPolicy {
    pub min_interval_secs: u16,
    pub max_interval_secs: u16,
    /// Minimum change that triggers a report; `None` means interval-only.
    pub reportable_change: Option<u8>,
}

impl ReportingPolicy {
    /// On/off reporting: report immediately on any change, at most every
    /// 300 s otherwise.
    pub const ON_OFF: Self = Self {
        min_interval_secs: 0,
        max_interval_secs: 300,
        reportable_change: Some(1),
    };

    /// Basic-cluster reporting: slow interval-only refresh.
    pub const BASIC: Self = Self {
        min_interval_secs: 3600,
        max_interval_secs: 7200,
        reportable_change: None,
    };
}

/// Power source reported by the basic cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerSource {
    Mains,
    Battery,
    Unknown(u8),
}

impl PowerSource {
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            0x01 | 0x02 => PowerSource::Mains,
            0x03 => PowerSource::Battery,
            other => PowerSource::Unknown(other),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdapterError {
    /// The channel has no reachable endpoint. Reads against it fail open to
    /// `OFF`; writes are skipped.
    #[error("endpoint for channel {0} is not reachable")]
    Unreachable(Channel),
    /// A bind/read/write/report request failed against the link layer.
    #[error("link-layer request failed: {0}")]
    Link(String),
}

/// The link-layer collaborator owned by the host runtime.
///
/// The translator never talks to the radio itself; it derives fully resolved
/// read/write instructions and the adapter executes them against the
/// channel's endpoint. Reads and writes address the vendor on/off attribute;
/// a manufacturer code qualifies the request when one is given.
///
/// Implementations must be shareable across the host's per-endpoint
/// callbacks, hence `Send + Sync`.
pub trait LinkAdapter: Send + Sync + 'static {
    /// Read the on/off attribute of the channel's endpoint.
    fn read(
        &self,
        channel: Channel,
        manufacturer: Option<u16>,
    ) -> impl Future<Output = Result<bool, AdapterError>> + Send;

    /// Write the on/off attribute of the channel's endpoint.
    fn write(
        &self,
        channel: Channel,
        on: bool,
        manufacturer: Option<u16>,
    ) -> impl Future<Output = Result<(), AdapterError>> + Send;

    /// Bind a cluster on the channel's endpoint to the coordinator.
    fn bind(
        &self,
        channel: Channel,
        cluster: Cluster,
    ) -> impl Future<Output = Result<(), AdapterError>> + Send;

    /// Configure unsolicited attribute reporting for a cluster.
    fn configure_reporting(
        &self,
        channel: Channel,
        cluster: Cluster,
        policy: ReportingPolicy,
    ) -> impl Future<Output = Result<(), AdapterError>> + Send;

    /// Read the basic-cluster power source attribute.
    fn read_power_source(
        &self,
        channel: Channel,
    ) -> impl Future<Output = Result<PowerSource, AdapterError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn power_source_raw_mapping() {
        assert_eq!(PowerSource::from_raw(0x01), PowerSource::Mains);
        assert_eq!(PowerSource::from_raw(0x03), PowerSource::Battery);
        assert_eq!(PowerSource::from_raw(0x7f), PowerSource::Unknown(0x7f));
    }

    #[test]
    fn reporting_presets() {
        assert_eq!(ReportingPolicy::ON_OFF.min_interval_secs, 0);
        assert_eq!(ReportingPolicy::ON_OFF.reportable_change, Some(1));
        assert_eq!(ReportingPolicy::BASIC.max_interval_secs, 7200);
        assert_eq!(ReportingPolicy::BASIC.reportable_change, None);
    }
}
