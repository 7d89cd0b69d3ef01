use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::time::Duration;

use super::role::Role;

/// Default TCP control port
pub const DEFAULT_CONTROL_PORT: u16 = 7755;
/// Default UDP sync port
pub const DEFAULT_SYNC_PORT: u16 = 7756;
/// Default UDP discovery port
pub const DEFAULT_DISCOVERY_PORT: u16 = 7757;

/// Tuning of the slave-side drift correction law
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CorrectionTuning {
    /// Drift (in played-back seconds at rate 1.0) above which the slave seeks
    pub scrub_threshold_secs: f64,
    /// Constant rate offset applied in the direction of the drift
    pub flat_gain: f64,
    /// Rate offset proportional to drift / scrub threshold
    pub proportional_gain: f64,
    /// How long a nudged rate is held without a fresher sync
    pub window: Duration,
    /// Frame rate assumed when the stream does not report one
    pub default_frame_rate: f64,
}

impl Default for CorrectionTuning {
    fn default() -> Self {
        Self {
            scrub_threshold_secs: 1.0,
            flat_gain: 0.05,
            proportional_gain: 0.75,
            window: Duration::from_secs(1),
            default_frame_rate: 60.0,
        }
    }
}

/// Configuration for a sync node
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Name sent in discovery beacons (default: host name)
    pub display_name: String,

    /// Local address all listeners bind to (default: 0.0.0.0)
    pub bind_address: IpAddr,

    /// TCP control port (0 = auto-assign)
    pub control_port: u16,

    /// UDP sync port (0 = auto-assign)
    pub sync_port: u16,

    /// UDP discovery port (0 = auto-assign)
    pub discovery_port: u16,

    /// Control port peers listen on (None = same as ours)
    pub peer_control_port: Option<u16>,

    /// Sync port peers listen on (None = same as ours)
    pub peer_sync_port: Option<u16>,

    /// Destination address of discovery beacons (default: 255.255.255.255)
    pub beacon_address: IpAddr,

    /// Beacon period (default: 2 seconds)
    pub beacon_interval: Duration,

    /// Position broadcast period while playing (default: 50ms)
    pub sync_interval: Duration,

    /// Silence after which a peer is evicted (default: 10 seconds)
    pub dead_threshold: Duration,

    /// Upper bound for one latency probe (default: 2 seconds)
    pub probe_timeout: Duration,

    /// Idle timeout of inbound control connections (default: 60 seconds)
    pub idle_timeout: Duration,

    /// Drift correction tuning
    pub correction: CorrectionTuning,

    /// Role the node starts in
    pub initial_role: Role,

    /// JSON settings file used by `load_settings` / `save_settings`
    pub settings_path: Option<PathBuf>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            display_name: default_display_name(),
            bind_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            control_port: DEFAULT_CONTROL_PORT,
            sync_port: DEFAULT_SYNC_PORT,
            discovery_port: DEFAULT_DISCOVERY_PORT,
            peer_control_port: None,
            peer_sync_port: None,
            beacon_address: IpAddr::V4(Ipv4Addr::BROADCAST),
            beacon_interval: Duration::from_secs(2),
            sync_interval: Duration::from_millis(50),
            dead_threshold: Duration::from_secs(10),
            probe_timeout: Duration::from_secs(2),
            idle_timeout: Duration::from_secs(60),
            correction: CorrectionTuning::default(),
            initial_role: Role::Slave,
            settings_path: None,
        }
    }
}

impl NodeConfig {
    /// Create a new config builder
    #[must_use]
    pub fn builder() -> NodeConfigBuilder {
        NodeConfigBuilder::default()
    }

    /// Control port used when addressing peers
    #[must_use]
    pub fn peer_control_port(&self) -> u16 {
        self.peer_control_port.unwrap_or(self.control_port)
    }

    /// Sync port used when addressing peers
    #[must_use]
    pub fn peer_sync_port(&self) -> u16 {
        self.peer_sync_port.unwrap_or(self.sync_port)
    }
}

fn default_display_name() -> String {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| "wallsync".to_string())
}

/// Builder for `NodeConfig`
#[derive(Debug, Clone, Default)]
pub struct NodeConfigBuilder {
    config: NodeConfig,
}

impl NodeConfigBuilder {
    /// Set the name announced in beacons
    #[must_use]
    pub fn display_name(mut self, name: impl Into<String>) -> Self {
        self.config.display_name = name.into();
        self
    }

    /// Set the local bind address
    #[must_use]
    pub fn bind_address(mut self, addr: IpAddr) -> Self {
        self.config.bind_address = addr;
        self
    }

    /// Set the TCP control port
    #[must_use]
    pub fn control_port(mut self, port: u16) -> Self {
        self.config.control_port = port;
        self
    }

    /// Set the UDP sync port
    #[must_use]
    pub fn sync_port(mut self, port: u16) -> Self {
        self.config.sync_port = port;
        self
    }

    /// Set the UDP discovery port
    #[must_use]
    pub fn discovery_port(mut self, port: u16) -> Self {
        self.config.discovery_port = port;
        self
    }

    /// Set the ports peers listen on, when they differ from ours
    #[must_use]
    pub fn peer_ports(mut self, control: u16, sync: u16) -> Self {
        self.config.peer_control_port = Some(control);
        self.config.peer_sync_port = Some(sync);
        self
    }

    /// Set the beacon destination address
    #[must_use]
    pub fn beacon_address(mut self, addr: IpAddr) -> Self {
        self.config.beacon_address = addr;
        self
    }

    /// Set the beacon period
    #[must_use]
    pub fn beacon_interval(mut self, interval: Duration) -> Self {
        self.config.beacon_interval = interval;
        self
    }

    /// Set the position broadcast period
    #[must_use]
    pub fn sync_interval(mut self, interval: Duration) -> Self {
        self.config.sync_interval = interval;
        self
    }

    /// Set the peer liveness timeout
    #[must_use]
    pub fn dead_threshold(mut self, threshold: Duration) -> Self {
        self.config.dead_threshold = threshold;
        self
    }

    /// Set the latency probe timeout
    #[must_use]
    pub fn probe_timeout(mut self, timeout: Duration) -> Self {
        self.config.probe_timeout = timeout;
        self
    }

    /// Set the control connection idle timeout
    #[must_use]
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.config.idle_timeout = timeout;
        self
    }

    /// Set the drift correction tuning
    #[must_use]
    pub fn correction(mut self, tuning: CorrectionTuning) -> Self {
        self.config.correction = tuning;
        self
    }

    /// Set the starting role
    #[must_use]
    pub fn role(mut self, role: Role) -> Self {
        self.config.initial_role = role;
        self
    }

    /// Set the settings file path
    #[must_use]
    pub fn settings_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.settings_path = Some(path.into());
        self
    }

    /// Bind every listener to an ephemeral port on localhost
    #[must_use]
    pub fn ephemeral_localhost(mut self) -> Self {
        self.config.bind_address = IpAddr::V4(Ipv4Addr::LOCALHOST);
        self.config.control_port = 0;
        self.config.sync_port = 0;
        self.config.discovery_port = 0;
        self
    }

    /// Build the configuration
    #[must_use]
    pub fn build(self) -> NodeConfig {
        self.config
    }
}
