//! Session management for a networked smart planter.
//!
//! The [`session::SessionController`] joins the planter's Wi-Fi, opens a
//! socket, keeps a live telemetry stream and exposes connection and device
//! state through [`state::SessionState`].

pub mod config;
pub mod error;
pub mod link;
pub mod model;
pub mod session;
pub mod state;
pub mod telemetry;
