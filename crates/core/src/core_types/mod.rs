//! Core types shared by the heat-exchange kernels

pub mod particle;
pub mod vec3;

pub use particle::{ContactDataBuffers, HeatFluxBuffers, ParticleState, ParticleStore};
pub use vec3::Vec3;
