//! Granular Heat Exchange Core Library
//!
//! Per-timestep heat exchange for discrete-element particle simulations.
//! Two mechanisms are evaluated independently every step:
//! - contact conduction between touching spheres, over the host's neighbor list
//! - grey-body radiation between every pair of local particles
//!
//! The host owns particle storage, neighbor lists and inter-process
//! communication. This crate reads positions, radii, types and temperatures,
//! and accumulates heat flux, directional heat flux and optional contact
//! statistics into host-provided buffers. A pair-local consumer can take over
//! the per-pair fluxes instead of direct accumulation.
//!
//! ## Modules
//!
//! - `physics`: pure pair kernels (contact area, conduction, radiation)
//! - `material`: per-type conductivity and area-correction tables
//! - `passes`: radiation and conduction loops
//! - `exchange`: the module lifecycle seen by the host

// Core types and utilities
pub mod core_types;
pub mod error;

// Host-facing seams
pub mod comm;
pub mod config;
pub mod material;
pub mod neighbor;

// Kernels and orchestration
pub mod accumulate;
pub mod exchange;
pub mod passes;
pub mod physics;

// Re-export core types
pub use core_types::{
    ContactDataBuffers, HeatFluxBuffers, ParticleState, ParticleStore, Vec3,
};
pub use error::HeatGranError;

// Re-export host-facing types
pub use accumulate::{PairHeatConsumer, PairHeatLog, SharedPairConsumer};
pub use comm::{GhostFold, ReverseComm};
pub use config::{ContactAreaMode, HeatExchangeConfig};
pub use exchange::{GranularHeatExchange, HostContext};
pub use material::{MaterialProperties, MaterialSource, MaterialTables, PairStyle};
pub use neighbor::{ContactDetection, NeighborList, OwnedNeighborList, NEIGHMASK};
pub use passes::PassSummary;
