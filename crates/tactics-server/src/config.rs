//! Server settings read from the environment.

use anyhow::Context;
use std::net::SocketAddr;
use std::str::FromStr;
use tactics_core::GameConfig;

/// Process-level settings
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// `SERVER_ADDR`
    pub addr: SocketAddr,
    /// `TACTICS_ROOMS`: games opened at startup
    pub initial_rooms: usize,
    /// `TACTICS_SEATS`, `TACTICS_ROWS`, `TACTICS_COLS`
    pub game: GameConfig,
}

impl ServerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let defaults = GameConfig::default();
        let game = GameConfig {
            seats: parse_or(&lookup, "TACTICS_SEATS", defaults.seats)?,
            rows: parse_or(&lookup, "TACTICS_ROWS", defaults.rows)?,
            cols: parse_or(&lookup, "TACTICS_COLS", defaults.cols)?,
            ..defaults
        };
        game.validate().context("Invalid default game settings")?;

        Ok(Self {
            addr: parse_or(&lookup, "SERVER_ADDR", SocketAddr::from(([0, 0, 0, 0], 8080)))?,
            initial_rooms: parse_or(&lookup, "TACTICS_ROOMS", 3)?,
            game,
        })
    }
}

fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid {}: {:?}", key, raw)),
        None => Ok(default),
    }
}
