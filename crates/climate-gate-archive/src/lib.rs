// climate-gate-archive/src/lib.rs
// ============================================================================
// Module: Climate Gate Archive Library
// Description: Archive store implementations and the listing cache.
// Purpose: Reach the remote climate archive behind the core store contract.
// Dependencies: climate-gate-core, reqwest, serde_json
// ============================================================================

//! ## Overview
//! This crate provides [`climate_gate_core::ArchiveStore`] implementations: an
//! HTTP gateway client with strict size and time limits, and an in-memory
//! store backed by JSON fixtures. [`DatasetCatalog`] layers a bounded
//! read-through cache of directory listings on top of any store and resolves
//! partially specified dataset handles to concrete objects.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod catalog;
pub mod http;
pub mod memory;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use catalog::DatasetCatalog;
pub use http::HttpArchiveConfig;
pub use http::HttpArchiveStore;
pub use http::HttpStoreError;
pub use memory::FixtureError;
pub use memory::InMemoryArchiveStore;
