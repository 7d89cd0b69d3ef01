//! A complete sync node
//!
//! [`Node`] wires the control servers, discovery, peer probing and the
//! sync machinery around a caller supplied [`MediaController`].
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use wallsync::testing::SimulatedMedia;
//! use wallsync::{Node, NodeConfig, Role};
//!
//! # async fn example() -> Result<(), wallsync::SyncError> {
//! let config = NodeConfig::builder().display_name("wall-left").build();
//! let node = Node::start(config, Arc::new(SimulatedMedia::new())).await?;
//!
//! node.set_role(Role::Master).await?;
//! node.core().apply(wallsync::SyncAction::Load("/srv/wall".into())).await?;
//! node.core().apply(wallsync::SyncAction::Play).await?;
//! # Ok(())
//! # }
//! ```

mod commands;
mod player;
mod state;


pub use self::commands::{Rpc, register_all};
pub use self::player::PlayerCore;
pub use self::state::PlayState;

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::control::{CommandRegistry, ControlServer, DatagramServer, Dispatcher};
use crate::discovery::{BeaconListener, DiscoveryBeacon};
use crate::error::Result;
use crate::media::MediaController;
use crate::net::{TokioTransport, Transport};
use crate::peers::LatencyProber;
use crate::state::EventBus;
use crate::types::{NodeConfig, Role, Settings};

/// Running node
pub struct Node {
    core: Arc<PlayerCore>,
    dispatcher: Arc<Dispatcher>,
    control: ControlServer,
    sync: DatagramServer,
    beacon: DiscoveryBeacon,
    prober: LatencyProber,
    listener: Mutex<Option<BeaconListener>>,
}

impl Node {
    /// Start a node that talks to its peers over real sockets
    ///
    /// # Errors
    ///
    /// Returns an error if a listening port cannot be bound.
    pub async fn start(config: NodeConfig, media: Arc<dyn MediaController>) -> Result<Self> {
        let transport = TokioTransport::bind(config.bind_address, config.probe_timeout).await?;
        Self::start_with_transport(config, media, Arc::new(transport)).await
    }

    /// Start a node that sends peer traffic through `transport`
    ///
    /// # Errors
    ///
    /// Returns an error if a listening port cannot be bound.
    pub async fn start_with_transport(
        config: NodeConfig,
        media: Arc<dyn MediaController>,
        transport: Arc<dyn Transport>,
    ) -> Result<Self> {
        let events = EventBus::new();
        let settings = initial_settings(&config).await;
        let core = Arc::new(PlayerCore::new(
            config.clone(),
            media,
            transport,
            settings,
            events.clone(),
        ));
        core.install_ended_handler();

        let mut registry = CommandRegistry::new();
        register_all(&mut registry, &core);
        registry.add_target(core.clone());
        let dispatcher = Arc::new(Dispatcher::new(registry));

        let control = ControlServer::bind(
            SocketAddr::new(config.bind_address, config.control_port),
            dispatcher.clone(),
            config.idle_timeout,
        )
        .await?;
        let sync = DatagramServer::bind(
            SocketAddr::new(config.bind_address, config.sync_port),
            dispatcher.clone(),
        )
        .await?;
        let beacon = DiscoveryBeacon::start(
            &config,
            core.subscribe_role(),
            core.settings().subscribe(),
        )
        .await?;
        let prober = LatencyProber::new(
            core.peers().clone(),
            config.peer_control_port(),
            config.probe_timeout,
            events,
        );

        let node = Self {
            core,
            dispatcher,
            control,
            sync,
            beacon,
            prober,
            listener: Mutex::new(None),
        };
        if config.initial_role.is_master() {
            node.start_listener().await?;
        }

        tracing::info!(
            name = %config.display_name,
            role = %config.initial_role,
            control = %node.control.local_addr(),
            sync = %node.sync.local_addr(),
            "Node started"
        );
        Ok(node)
    }

    /// Shared playback core
    #[must_use]
    pub fn core(&self) -> &Arc<PlayerCore> {
        &self.core
    }

    /// Command dispatcher
    #[must_use]
    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Event bus
    #[must_use]
    pub fn events(&self) -> &EventBus {
        self.core.events()
    }

    /// Current role
    #[must_use]
    pub fn role(&self) -> Role {
        self.core.role()
    }

    /// Bound TCP control address
    #[must_use]
    pub fn control_addr(&self) -> SocketAddr {
        self.control.local_addr()
    }

    /// Bound UDP sync address
    #[must_use]
    pub fn sync_addr(&self) -> SocketAddr {
        self.sync.local_addr()
    }

    /// Bound discovery address, while master
    pub async fn discovery_addr(&self) -> Option<SocketAddr> {
        self.listener.lock().await.as_ref().map(BeaconListener::local_addr)
    }

    /// Discovery beacon
    #[must_use]
    pub fn beacon(&self) -> &DiscoveryBeacon {
        &self.beacon
    }

    /// Switch role
    ///
    /// Becoming master binds the discovery port; becoming slave releases
    /// it. The beacon follows the role on its own.
    ///
    /// # Errors
    ///
    /// Returns `BindFailed` if the discovery port cannot be bound.
    pub async fn set_role(&self, role: Role) -> Result<()> {
        if role.is_master() {
            self.start_listener().await?;
        } else {
            self.listener.lock().await.take();
        }
        self.core.set_role(role).await;
        Ok(())
    }

    async fn start_listener(&self) -> Result<()> {
        let mut listener = self.listener.lock().await;
        if listener.is_none() {
            let config = self.core.config();
            let addr = SocketAddr::new(config.bind_address, config.discovery_port);
            *listener = Some(BeaconListener::bind(addr, self.prober.clone()).await?);
        }
        Ok(())
    }

    /// Stop every server, timer and background task
    pub async fn shutdown(&self) {
        self.beacon.stop();
        self.listener.lock().await.take();
        self.core.broadcaster().stop().await;
        self.core.controller().reset().await;
        self.control.shutdown();
        self.sync.shutdown();
        tracing::info!("Node stopped");
    }
}

/// Settings from the configured file, or defaults
async fn initial_settings(config: &NodeConfig) -> Settings {
    let Some(path) = config.settings_path.as_ref() else {
        return Settings::default();
    };
    let raw = match tokio::fs::read(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Settings::default(),
        Err(e) => {
            tracing::warn!(path = %path.display(), "Cannot read settings: {}", e);
            return Settings::default();
        }
    };
    match serde_json::from_slice::<Settings>(&raw) {
        Ok(mut settings) => {
            settings.clamp();
            settings
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), "Ignoring malformed settings: {}", e);
            Settings::default()
        }
    }
}
