//! Pairwise heat-flux kernels

pub mod conduction;
pub mod contact_area;
pub mod radiation;

pub use conduction::{
    conduction_flux, corrected_conductivity, heat_transfer_coefficient, SMALL_CONDUCTIVITY,
};
pub use contact_area::{contact_area, overlap_area, PairGeometry};
pub use radiation::{radiative_flux, view_factor, STEFAN_BOLTZMANN};
