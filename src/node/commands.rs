//! Control commands understood by a node

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::broadcast::error::RecvError;

use super::player::PlayerCore;
use crate::control::{CommandHandler, CommandRegistry, Connection};
use crate::error::{Result, SyncError};
use crate::sync::{SEEK_TO_TIME, SyncAction};

/// Every command a node registers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rpc {
    /// `play`
    Play,
    /// `pause`
    Pause,
    /// `restart`
    Restart,
    /// `load <path>`
    Load,
    /// `set_rate <rate>`
    SetRate,
    /// `seek_to_time <seconds>`
    SeekToTime,
    /// `echo <text>`
    Echo,
    /// `request_state`
    RequestState,
    /// `load_settings`
    LoadSettings,
    /// `save_settings`
    SaveSettings,
    /// `log_stream`
    LogStream,
    /// `generate_snapshot`
    GenerateSnapshot,
    /// `current_time`
    CurrentTime,
    /// `duration`
    Duration,
    /// `volume [<v>]`
    Volume,
    /// `brightness [<v>]`
    Brightness,
    /// `rate [<r>]`
    Rate,
    /// `loop [<b>]`
    Loop,
    /// `is_playing`
    IsPlaying,
    /// `next`
    Next,
    /// `prev`
    Prev,
    /// `track [<i>]`
    Track,
    /// `playstate`
    PlayState,
}

impl Rpc {
    /// All commands, in registration order
    pub const ALL: [Self; 23] = [
        Self::Play,
        Self::Pause,
        Self::Restart,
        Self::Load,
        Self::SetRate,
        Self::SeekToTime,
        Self::Echo,
        Self::RequestState,
        Self::LoadSettings,
        Self::SaveSettings,
        Self::LogStream,
        Self::GenerateSnapshot,
        Self::CurrentTime,
        Self::Duration,
        Self::Volume,
        Self::Brightness,
        Self::Rate,
        Self::Loop,
        Self::IsPlaying,
        Self::Next,
        Self::Prev,
        Self::Track,
        Self::PlayState,
    ];

    /// Command name on the wire
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Play => "play",
            Self::Pause => "pause",
            Self::Restart => "restart",
            Self::Load => "load",
            Self::SetRate => "set_rate",
            Self::SeekToTime => SEEK_TO_TIME,
            Self::Echo => "echo",
            Self::RequestState => "request_state",
            Self::LoadSettings => "load_settings",
            Self::SaveSettings => "save_settings",
            Self::LogStream => "log_stream",
            Self::GenerateSnapshot => "generate_snapshot",
            Self::CurrentTime => "current_time",
            Self::Duration => "duration",
            Self::Volume => "volume",
            Self::Brightness => "brightness",
            Self::Rate => "rate",
            Self::Loop => "loop",
            Self::IsPlaying => "is_playing",
            Self::Next => "next",
            Self::Prev => "prev",
            Self::Track => "track",
            Self::PlayState => "playstate",
        }
    }
}

/// Register every [`Rpc`] against `core`
pub fn register_all(registry: &mut CommandRegistry, core: &Arc<PlayerCore>) {
    for rpc in Rpc::ALL {
        registry.register(
            rpc.name(),
            RpcHandler {
                rpc,
                core: core.clone(),
            },
        );
    }
}

struct RpcHandler {
    rpc: Rpc,
    core: Arc<PlayerCore>,
}

#[async_trait]
impl CommandHandler for RpcHandler {
    async fn execute(&self, conn: &Connection, args: &[&str]) {
        match run(&self.core, self.rpc, conn, args).await {
            Ok(Some(reply)) => {
                conn.reply(reply);
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(peer = %conn.peer(), command = self.rpc.name(), "Command failed: {}", e);
                conn.reply(format!("error {e}"));
            }
        }
    }
}

fn parse_arg<T: std::str::FromStr>(rpc: Rpc, raw: &str) -> Result<T> {
    raw.parse()
        .map_err(|_| SyncError::invalid_argument(rpc.name(), format!("cannot parse {raw:?}")))
}

fn parse_bool(rpc: Rpc, raw: &str) -> Result<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Ok(true),
        "0" | "false" | "off" | "no" => Ok(false),
        _ => Err(SyncError::invalid_argument(
            rpc.name(),
            format!("expected a boolean, got {raw:?}"),
        )),
    }
}

fn seconds(value: f64) -> String {
    format!("{value:.3}")
}

/// Execute `rpc`, returning the reply line if it has one
async fn run(core: &PlayerCore, rpc: Rpc, conn: &Connection, args: &[&str]) -> Result<Option<String>> {
    let first = args.first().copied();
    match rpc {
        Rpc::Play | Rpc::Pause | Rpc::Restart | Rpc::Load | Rpc::SetRate => {
            let action = SyncAction::from_command(rpc.name(), args)?;
            core.apply(action).await?;
            Ok(None)
        }
        Rpc::SeekToTime => {
            let raw = first.ok_or_else(|| SyncError::invalid_argument(rpc.name(), "missing time"))?;
            let target: f64 = parse_arg(rpc, raw)?;
            if !target.is_finite() {
                return Err(SyncError::invalid_argument(rpc.name(), "time must be finite"));
            }
            core.seek_to_time(target).await;
            Ok(None)
        }
        Rpc::Echo => Ok(Some(args.join(" "))),
        Rpc::RequestState => {
            let settings = core.settings().get().await;
            Ok(Some(serde_json::to_string(&settings)?))
        }
        Rpc::LoadSettings => {
            let settings = core.load_settings().await?;
            Ok(Some(serde_json::to_string(&settings)?))
        }
        Rpc::SaveSettings => {
            let path = core.save_settings().await?;
            Ok(Some(format!("saved {}", path.display())))
        }
        Rpc::LogStream => {
            stream_events(core, conn);
            Ok(None)
        }
        Rpc::GenerateSnapshot => {
            let snapshot = core.snapshot().await?;
            Ok(Some(serde_json::to_string(&snapshot)?))
        }
        Rpc::CurrentTime => Ok(Some(seconds(core.media().current_time()))),
        Rpc::Duration => Ok(Some(seconds(core.media().duration().unwrap_or(0.0)))),
        Rpc::Volume => {
            let volume = match first {
                Some(raw) => core.set_volume(parse_arg(rpc, raw)?).await,
                None => core.settings().get().await.volume,
            };
            Ok(Some(format!("{volume:.2}")))
        }
        Rpc::Brightness => {
            let brightness = match first {
                Some(raw) => core.set_brightness(parse_arg(rpc, raw)?).await,
                None => core.settings().get().await.brightness,
            };
            Ok(Some(format!("{brightness:.2}")))
        }
        Rpc::Rate => {
            if let Some(raw) = first {
                let action = SyncAction::from_command("set_rate", &[raw])?;
                core.apply(action).await?;
            }
            Ok(Some(format!("{:.2}", core.settings().get().await.rate)))
        }
        Rpc::Loop => {
            let looping = match first {
                Some(raw) => core.settings().set_looping(parse_bool(rpc, raw)?).await.looping,
                None => core.settings().get().await.looping,
            };
            Ok(Some(looping.to_string()))
        }
        Rpc::IsPlaying => Ok(Some(core.media().is_playing().to_string())),
        Rpc::Next => Ok(Some(core.next().await?.to_string())),
        Rpc::Prev => Ok(Some(core.prev().await?.to_string())),
        Rpc::Track => {
            let index = match first {
                Some(raw) => core.select_track(parse_arg(rpc, raw)?).await?,
                None => core.track().await,
            };
            Ok(Some(index.to_string()))
        }
        Rpc::PlayState => {
            let state = core.play_state().await;
            Ok(Some(serde_json::to_string(&state)?))
        }
    }
}

/// Write every node event to `conn` until it closes
fn stream_events(core: &PlayerCore, conn: &Connection) {
    let mut events = core.events().subscribe();
    let conn = conn.clone();
    let closed = conn.closed_token();
    tracing::debug!(peer = %conn.peer(), "Log stream opened");
    tokio::spawn(async move {
        loop {
            let event = tokio::select! {
                () = closed.cancelled() => break,
                event = events.recv() => event,
            };
            match event {
                Ok(event) => {
                    if !conn.reply(event.to_string()) {
                        break;
                    }
                }
                Err(RecvError::Lagged(missed)) => {
                    conn.reply(format!("lagged {missed}"));
                }
                Err(RecvError::Closed) => break,
            }
        }
        tracing::debug!(peer = %conn.peer(), "Log stream closed");
    });
}
