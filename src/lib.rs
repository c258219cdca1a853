//! Lifecycle manager for a single TomoChain fullnode running as Docker
//! containers: a node container and a metrics sidecar sharing a network and
//! a chain data volume.
//!
//! ## Layers
//! - `cli` — argument definitions.
//! - `commands` — per-command handlers and output wiring.
//! - `domain` — data-only types.
//! - `services` — registry, store, validation, engine and orchestration.

pub mod cli;
pub mod commands;
pub mod domain;
pub mod services;
