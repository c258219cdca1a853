//! Shared data model layer (structs/constants only).
//!
//! ## Purpose
//! - Keep identity, resource naming and report structs in one place.
//! - Make `--json` output schema changes explicit and reviewable.
//!
//! ## Files
//! - `models.rs` — identity, derived resource set, node state, reports.
//! - `constants.rs` — stable constants (docs link, mount points, glyphs).
//!
//! ## Rule of thumb
//! Domain types should be data-only: no filesystem/engine side effects.
//!
//! ## Compatibility note
//! Changes in these structs can affect `--json` outputs and integration contracts.
//! Keep schema-impacting changes synchronized with `docs/contracts/*`.

pub mod constants;
pub mod models;
