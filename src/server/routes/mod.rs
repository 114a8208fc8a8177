//! API route handlers
//!
//! This module contains all HTTP and WebSocket route handlers for the server.

pub mod events;
pub mod health;
pub mod tasks;
pub mod ws;
