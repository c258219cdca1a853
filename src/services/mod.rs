//! Service layer containing business logic and side-effect helpers.
//!
//! ## Service map
//! - `environments.rs` — per-network environment bundles and images.
//! - `storage.rs` — remembered fullnode identity (atomic record file).
//! - `validation.rs` — name/net/pkey checks and `start` intent resolution.
//! - `engine.rs` — container engine capability trait and error kinds.
//! - `docker.rs` — engine implementation over the Docker API.
//! - `orchestrator.rs` — lifecycle state machine (start/stop/update/remove/status/inspect).
//! - `settings.rs` — optional `config.toml` and config dir helpers.
//! - `output.rs` — JSON/text output helpers.
//!
//! ## Conventions
//! - Validation and storage never call the engine.
//! - Side effects should be explicit and localized.
//! - Keep command handlers thin; delegate to services.

pub mod docker;
pub mod engine;
pub mod environments;
pub mod orchestrator;
pub mod output;
pub mod settings;
pub mod storage;
pub mod validation;
