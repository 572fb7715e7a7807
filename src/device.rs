use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::adapter::{AdapterError, Cluster, LinkAdapter, ReportingPolicy};
use crate::channel::{Channel, OnOff, StateKey};
use crate::snapshot::StateSnapshot;
use crate::translator::{Command, ProtocolEvent, TranslateError, Translator};

pub const MODEL: &str = "SR2CH10A";
pub const VENDOR: &str = "Robo";

/// Vendor qualifier carried on reads/writes of the on/off attribute.
pub const MANUFACTURER_CODE: u16 = 0xA0FF;

/// Interval of the periodic cache resynchronization against the relays.
pub const RESYNC_INTERVAL: Duration = Duration::from_secs(30);

/// A switch capability exposed to the host, one per relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwitchCapability {
    pub channel: Channel,
    pub description: &'static str,
}

/// Static device-definition metadata consumed by the host at setup time.
#[derive(Debug, Clone, Copy)]
pub struct DeviceMetadata {
    pub zigbee_models: &'static [&'static str],
    pub model: &'static str,
    pub vendor: &'static str,
    pub description: &'static str,
    pub manufacturer_code: u16,
    pub switches: &'static [SwitchCapability],
    pub resync_interval: Duration,
}

pub const METADATA: DeviceMetadata = DeviceMetadata {
    zigbee_models: &["SR2CH10A"],
    model: MODEL,
    vendor: VENDOR,
    description: "RoboSR2CH10A two-channel relay router",
    manufacturer_code: MANUFACTURER_CODE,
    switches: &[
        SwitchCapability {
            channel: Channel::One,
            description: "Relay 1 control (toggle via short button press)",
        },
        SwitchCapability {
            channel: Channel::Two,
            description: "Relay 2 control",
        },
    ],
    resync_interval: RESYNC_INTERVAL,
};

/// One paired SR2CH10A: the translator plus the hooks the host runtime
/// invokes around it.
///
/// Inbound frames enter through [`handle_report`](Device::handle_report) and
/// [`handle_command`](Device::handle_command); host set/get intents through
/// [`set`](Device::set) and [`get`](Device::get). Snapshots worth publishing
/// are forwarded to the optional publish channel.
///
/// The periodic resync task started on interview completion is owned here
/// and stopped on leave/detach/drop, so re-pairing never stacks timers.
pub struct Device<A: LinkAdapter> {
    adapter: Arc<A>,
    translator: Arc<Translator>,
    publish_tx: Option<mpsc::Sender<StateSnapshot>>,
    resync: Mutex<Option<JoinHandle<()>>>,
}

impl<A: LinkAdapter> Device<A> {
    pub fn new(adapter: Arc<A>) -> Self {
        Self {
            adapter,
            translator: Arc::new(Translator::new()),
            publish_tx: None,
            resync: Mutex::new(None),
        }
    }

    /// Forward every non-empty snapshot to the given channel.
    pub fn publish_to(mut self, tx: mpsc::Sender<StateSnapshot>) -> Self {
        self.publish_tx = Some(tx);
        self
    }

    pub fn translator(&self) -> &Translator {
        &self.translator
    }

    /// Inbound attribute report or read response. Reports for endpoints this
    /// device does not own are ignored.
    pub async fn handle_report(&self, endpoint: u8, on: bool) -> StateSnapshot {
        let Some(channel) = Channel::from_endpoint(endpoint) else {
            debug!("ignoring on/off report for unknown endpoint {}", endpoint);
            return StateSnapshot::empty();
        };
        // Report ingestion cannot hit the ambiguous-toggle path.
        self.handle_frame(ProtocolEvent::AttributeReport { channel, on })
            .await
            .unwrap_or_default()
    }

    /// Inbound On/Off/Toggle cluster command.
    pub async fn handle_command(
        &self,
        endpoint: u8,
        command: Command,
    ) -> Result<StateSnapshot, TranslateError> {
        let Some(channel) = Channel::from_endpoint(endpoint) else {
            debug!("ignoring command for unknown endpoint {}", endpoint);
            return Ok(StateSnapshot::empty());
        };
        self.handle_frame(ProtocolEvent::Command { channel, command })
            .await
    }

    async fn handle_frame(
        &self,
        event: ProtocolEvent,
    ) -> Result<StateSnapshot, TranslateError> {
        let snapshot = self.translator.ingest(event)?;
        publish(self.publish_tx.as_ref(), snapshot).await;
        Ok(snapshot)
    }

    /// Host intent to set a field. Unknown fields are a silent no-op. The
    /// returned snapshot is the optimistic echo of the requested value; a
    /// failed write is logged but does not withhold the echo.
    pub async fn set(
        &self,
        field: &str,
        value: OnOff,
        hint: Option<Channel>,
    ) -> Option<StateSnapshot> {
        let Some(key) = StateKey::parse(field) else {
            debug!("ignoring set for unknown field '{}'", field);
            return None;
        };
        let (write, echo) = self.translator.apply_set(key, value, hint);
        info!("setting endpoint {} to {}", write.channel, value);
        match self
            .adapter
            .write(write.channel, write.on, Some(MANUFACTURER_CODE))
            .await
        {
            Ok(()) => {}
            Err(AdapterError::Unreachable(_)) => {
                warn!("endpoint {} unreachable, write skipped", write.channel);
            }
            Err(e) => {
                warn!("write to endpoint {} failed: {}", write.channel, e);
            }
        }
        Some(echo)
    }

    /// Host intent to read a field back. Unknown fields are a silent no-op;
    /// an unreachable endpoint yields the fail-open `OFF` snapshot.
    pub async fn get(
        &self,
        field: &str,
        hint: Option<Channel>,
    ) -> Result<Option<StateSnapshot>, AdapterError> {
        let Some(key) = StateKey::parse(field) else {
            debug!("ignoring get for unknown field '{}'", field);
            return Ok(None);
        };
        let read = self.translator.apply_get(key, hint);
        info!("reading state for endpoint {}", read.channel);
        let result = self
            .adapter
            .read(read.channel, Some(MANUFACTURER_CODE))
            .await;
        self.translator.complete_get(read.channel, result).map(Some)
    }

    /// Pairing-time configuration: bind the on/off, basic and identify
    /// clusters of both endpoints to the coordinator, request change-driven
    /// on/off reporting and slow basic reporting, then read the initial
    /// state of each relay.
    ///
    /// Every step is best-effort: a failed bind or read is logged and the
    /// remaining steps still run. Partial configuration is acceptable; the
    /// periodic resync covers for missing reports.
    pub async fn configure(&self) {
        info!("configuring {} router", MODEL);

        for channel in Channel::ALL {
            for cluster in [Cluster::OnOff, Cluster::Basic, Cluster::Identify] {
                if let Err(e) = self.adapter.bind(channel, cluster).await {
                    warn!("bind {:?} failed for endpoint {}: {}", cluster, channel, e);
                }
            }
            match self
                .adapter
                .configure_reporting(channel, Cluster::OnOff, ReportingPolicy::ON_OFF)
                .await
            {
                Ok(()) => {
                    info!("relay {} configured with immediate on/off reporting", channel);
                }
                Err(e) => {
                    warn!("on/off reporting setup failed for endpoint {}: {}", channel, e);
                }
            }
        }

        for channel in Channel::ALL {
            if let Err(e) = self
                .adapter
                .configure_reporting(channel, Cluster::Basic, ReportingPolicy::BASIC)
                .await
            {
                warn!("basic reporting setup failed for endpoint {}: {}", channel, e);
            }
            match self.adapter.read_power_source(channel).await {
                Ok(source) => debug!("power source for endpoint {}: {:?}", channel, source),
                Err(e) => warn!("failed to read power source for endpoint {}: {}", channel, e),
            }
            if let Err(e) = resync_channel(
                self.adapter.as_ref(),
                &self.translator,
                self.publish_tx.as_ref(),
                channel,
            )
            .await
            {
                warn!("initial state read failed for endpoint {}: {}", channel, e);
            }
        }

        info!("{} configured", MODEL);
    }

    pub fn on_join(&self) {
        info!("{} joined the network as a router", MODEL);
    }

    pub fn on_leave(&self) {
        info!("{} left the network", MODEL);
        self.stop_resync();
    }

    /// Interview completion starts the periodic resync of the cache against
    /// the physical relays.
    pub fn on_interview_complete(&self) {
        info!("{} completed the interview", MODEL);
        self.start_resync();
    }

    /// Stop background work for this device. Idempotent.
    pub fn detach(&self) {
        self.stop_resync();
    }

    fn start_resync(&self) {
        let adapter = Arc::clone(&self.adapter);
        let translator = Arc::clone(&self.translator);
        let publish_tx = self.publish_tx.clone();

        let handle = tokio::spawn(async move {
            let mut timer = tokio::time::interval(RESYNC_INTERVAL);
            // The first tick completes immediately; skip it so the first
            // resync lands one full interval after the interview.
            timer.tick().await;
            loop {
                timer.tick().await;
                for channel in Channel::ALL {
                    if let Err(e) =
                        resync_channel(adapter.as_ref(), &translator, publish_tx.as_ref(), channel)
                            .await
                    {
                        warn!("periodic state sync failed for endpoint {}: {}", channel, e);
                    }
                }
                debug!("periodic state sync completed");
            }
        });

        let mut slot = self.resync.lock().expect("resync handle lock poisoned");
        if let Some(previous) = slot.replace(handle) {
            previous.abort();
        }
    }

    fn stop_resync(&self) {
        let handle = self
            .resync
            .lock()
            .expect("resync handle lock poisoned")
            .take();
        if let Some(handle) = handle {
            handle.abort();
        }
    }
}

impl<A: LinkAdapter> Drop for Device<A> {
    fn drop(&mut self) {
        self.stop_resync();
    }
}

/// Read one channel's level and fold it into the cache. Only a genuine
/// change publishes an action; a confirming read publishes the level alone.
async fn resync_channel<A: LinkAdapter>(
    adapter: &A,
    translator: &Translator,
    publish_tx: Option<&mpsc::Sender<StateSnapshot>>,
    channel: Channel,
) -> Result<(), AdapterError> {
    let on = adapter.read(channel, Some(MANUFACTURER_CODE)).await?;
    if let Ok(snapshot) = translator.ingest(ProtocolEvent::AttributeReport { channel, on }) {
        publish(publish_tx, snapshot).await;
    }
    Ok(())
}

async fn publish(tx: Option<&mpsc::Sender<StateSnapshot>>, snapshot: StateSnapshot) {
    if snapshot.is_empty() {
        return;
    }
    if let Some(tx) = tx {
        if tx.send(snapshot).await.is_err() {
            warn!("snapshot channel closed, dropping update");
        }
    }
}
