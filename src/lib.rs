//! Library crate for memory-match-back: the sans-IO game engine plus the
//! leaderboard and session-host services built on it.

/// Configuration file loading and validation.
pub mod config;
/// Score persistence backends.
pub mod dao;
mod dto;
mod error;
/// Sans-IO memory-match engine.
pub mod game;
/// Leaderboard access used by hosted sessions.
pub mod gateway;
/// HTTP routers.
pub mod routes;
/// Business logic behind the routes.
pub mod services;
/// Shared application state.
pub mod state;
