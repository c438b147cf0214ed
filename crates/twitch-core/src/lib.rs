pub mod client;
pub mod commands;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod handlers;
pub mod points;
pub mod protocol;
pub mod rate;
pub mod timed;
pub mod tls;
pub mod transport;

pub use client::{ConnState, IrcClient};
pub use commands::{
    build_command_list, CommandListEntry, CommandMatcher, CommandRouter, Invocable, MessageSender,
};
pub use config::{BotConfig, ConnectionConfig, ModifiedCommandConfig, TextCommandConfig, TimedCommandConfig};
pub use dispatch::{Dispatcher, Handler};
pub use error::ClientError;
pub use points::{InMemoryPoints, PointsStore, UserPoints};
pub use protocol::{Event, JoinEvent, MessageEvent, Outbound, PartEvent};
pub use rate::{RateLimiter, RateWindow};
pub use timed::TimedCommand;
