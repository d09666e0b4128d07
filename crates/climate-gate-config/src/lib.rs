// climate-gate-config/src/lib.rs
// ============================================================================
// Module: Climate Gate Config Library
// Description: Canonical config model and validation.
// Purpose: Single source of truth for climate-gate.toml semantics.
// Dependencies: climate-gate-core, serde, toml
// ============================================================================

//! ## Overview
//! `climate-gate-config` defines the configuration model for the Climate Gate
//! server: transports, archive access, token budget, dataset defaults, the
//! listing cache, and plot hand-off. Validation is strict and fails closed.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
