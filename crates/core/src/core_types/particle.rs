//! Per-particle storage seen by the heat-exchange module
//!
//! The host owns particle data. The kernels only see it through two views:
//! - [`ParticleState`]: read-only geometry, type, temperature and group mask
//! - [`HeatFluxBuffers`]: write-accumulate targets (heat flux, directional heat
//!   flux, the diagnostic conductivity channel and optional contact statistics)
//!
//! Particles `0..nlocal` are owned by this process; the remaining entries are
//! ghost copies of particles owned elsewhere.
//!
//! [`ParticleStore`] is an owned structure-of-arrays that hands out both views.
//! Hosts with their own storage build the views directly from their slices.

use serde::{Deserialize, Serialize};

use crate::error::HeatGranError;

/// Group bit of the implicit "all" group.
pub const ALL_GROUP_BIT: u32 = 1;

/// Read-only particle inputs for one evaluation pass.
#[derive(Debug, Clone, Copy)]
pub struct ParticleState<'a> {
    /// Particle centres
    pub x: &'a [[f64; 3]],
    /// Particle radii
    pub radius: &'a [f64],
    /// Particle type, 1-based (`1..=max_type`)
    pub kind: &'a [u32],
    /// Temperature (K)
    pub temperature: &'a [f64],
    /// Group membership bits
    pub mask: &'a [u32],
    /// Number of locally owned particles; entries past this are ghosts
    pub nlocal: usize,
}

impl ParticleState<'_> {
    /// Total number of particles visible to this process (local + ghost).
    #[inline]
    pub fn nall(&self) -> usize {
        self.x.len()
    }

    /// Check that every per-particle slice covers local and ghost particles.
    ///
    /// # Errors
    /// Returns [`HeatGranError::BufferLength`] for the first mismatching slice.
    pub fn validate(&self) -> Result<(), HeatGranError> {
        let nall = self.nall();
        check_len("radius", nall, self.radius.len())?;
        check_len("type", nall, self.kind.len())?;
        check_len("temperature", nall, self.temperature.len())?;
        check_len("mask", nall, self.mask.len())?;
        if self.nlocal > nall {
            return Err(HeatGranError::BufferLength {
                buffer: "nlocal",
                expected: nall,
                actual: self.nlocal,
            });
        }
        Ok(())
    }
}

/// Per-contact statistics and wall coupling slots.
///
/// Only present when the module stores contact data.
#[derive(Debug)]
pub struct ContactDataBuffers<'a> {
    /// Summed (then averaged) conduction contact area
    pub area: &'a mut [f64],
    /// Number of conduction contacts, stored as a float like every per-atom scalar
    pub count: &'a mut [f64],
    /// Wall heat-transfer coefficient, filled by wall modules
    pub wall_heat_transfer_coeff: &'a mut [f64],
    /// Wall temperature, filled by wall modules
    pub wall_temperature: &'a mut [f64],
}

/// Write-accumulate targets for one evaluation pass.
#[derive(Debug)]
pub struct HeatFluxBuffers<'a> {
    /// Scalar heat flux (W)
    pub heat_flux: &'a mut [f64],
    /// Directional heat flux
    pub directional_heat_flux: &'a mut [[f64; 3]],
    /// Temperature-corrected conductivity of the last evaluated contact (diagnostic only)
    pub conductivity: &'a mut [f64],
    /// Contact statistics, if registered
    pub contact: Option<ContactDataBuffers<'a>>,
}

impl HeatFluxBuffers<'_> {
    /// Check that every buffer covers `nall` particles.
    ///
    /// # Errors
    /// Returns [`HeatGranError::BufferLength`] for the first mismatching buffer.
    pub fn validate(&self, nall: usize) -> Result<(), HeatGranError> {
        check_len("heat_flux", nall, self.heat_flux.len())?;
        check_len(
            "directional_heat_flux",
            nall,
            self.directional_heat_flux.len(),
        )?;
        check_len("conductivity", nall, self.conductivity.len())?;
        if let Some(contact) = &self.contact {
            check_len("contact_area", nall, contact.area.len())?;
            check_len("contact_count", nall, contact.count.len())?;
            check_len(
                "wall_heat_transfer_coeff",
                nall,
                contact.wall_heat_transfer_coeff.len(),
            )?;
            check_len("wall_temperature", nall, contact.wall_temperature.len())?;
        }
        Ok(())
    }
}

#[inline]
fn check_len(buffer: &'static str, expected: usize, actual: usize) -> Result<(), HeatGranError> {
    if expected == actual {
        Ok(())
    } else {
        Err(HeatGranError::BufferLength {
            buffer,
            expected,
            actual,
        })
    }
}

/// Owned contact statistics storage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContactData {
    pub area: Vec<f64>,
    pub count: Vec<f64>,
    pub wall_heat_transfer_coeff: Vec<f64>,
    pub wall_temperature: Vec<f64>,
}

impl ContactData {
    fn with_len(n: usize) -> Self {
        Self {
            area: vec![0.0; n],
            count: vec![0.0; n],
            wall_heat_transfer_coeff: vec![0.0; n],
            wall_temperature: vec![0.0; n],
        }
    }

    fn insert(&mut self, idx: usize) {
        self.area.insert(idx, 0.0);
        self.count.insert(idx, 0.0);
        self.wall_heat_transfer_coeff.insert(idx, 0.0);
        self.wall_temperature.insert(idx, 0.0);
    }
}

/// Owned particle storage (structure of arrays).
///
/// Local particles are kept in front of ghosts: [`ParticleStore::add_local`]
/// inserts at the end of the local block, [`ParticleStore::add_ghost`] appends.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParticleStore {
    pub x: Vec<[f64; 3]>,
    pub radius: Vec<f64>,
    pub kind: Vec<u32>,
    pub temperature: Vec<f64>,
    pub mask: Vec<u32>,
    pub heat_flux: Vec<f64>,
    pub directional_heat_flux: Vec<[f64; 3]>,
    pub conductivity: Vec<f64>,
    pub contact_data: Option<ContactData>,
    nlocal: usize,
}

impl ParticleStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of locally owned particles.
    #[inline]
    pub fn nlocal(&self) -> usize {
        self.nlocal
    }

    /// Number of local plus ghost particles.
    #[inline]
    pub fn len(&self) -> usize {
        self.x.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// Add an owned particle and return its index.
    pub fn add_local(
        &mut self,
        position: [f64; 3],
        radius: f64,
        kind: u32,
        temperature: f64,
    ) -> usize {
        let idx = self.nlocal;
        self.insert_at(idx, position, radius, kind, temperature);
        self.nlocal += 1;
        idx
    }

    /// Add a ghost copy of a particle owned elsewhere and return its index.
    pub fn add_ghost(
        &mut self,
        position: [f64; 3],
        radius: f64,
        kind: u32,
        temperature: f64,
    ) -> usize {
        let idx = self.len();
        self.insert_at(idx, position, radius, kind, temperature);
        idx
    }

    fn insert_at(
        &mut self,
        idx: usize,
        position: [f64; 3],
        radius: f64,
        kind: u32,
        temperature: f64,
    ) {
        self.x.insert(idx, position);
        self.radius.insert(idx, radius);
        self.kind.insert(idx, kind);
        self.temperature.insert(idx, temperature);
        self.mask.insert(idx, ALL_GROUP_BIT);
        self.heat_flux.insert(idx, 0.0);
        self.directional_heat_flux.insert(idx, [0.0; 3]);
        self.conductivity.insert(idx, 0.0);
        if let Some(contact) = &mut self.contact_data {
            contact.insert(idx);
        }
    }

    /// Allocate contact statistics storage. Idempotent.
    pub fn register_contact_data(&mut self) {
        if self.contact_data.is_none() {
            self.contact_data = Some(ContactData::with_len(self.len()));
        }
    }

    /// Zero heat flux and directional heat flux (the host does this between steps).
    pub fn reset_flux(&mut self) {
        self.heat_flux.fill(0.0);
        self.directional_heat_flux.fill([0.0; 3]);
    }

    /// Borrow the read-only state and the accumulation buffers at the same time.
    pub fn split(&mut self) -> (ParticleState<'_>, HeatFluxBuffers<'_>) {
        let state = ParticleState {
            x: &self.x,
            radius: &self.radius,
            kind: &self.kind,
            temperature: &self.temperature,
            mask: &self.mask,
            nlocal: self.nlocal,
        };
        let contact = self.contact_data.as_mut().map(|c| ContactDataBuffers {
            area: &mut c.area,
            count: &mut c.count,
            wall_heat_transfer_coeff: &mut c.wall_heat_transfer_coeff,
            wall_temperature: &mut c.wall_temperature,
        });
        let buffers = HeatFluxBuffers {
            heat_flux: &mut self.heat_flux,
            directional_heat_flux: &mut self.directional_heat_flux,
            conductivity: &mut self.conductivity,
            contact,
        };
        (state, buffers)
    }
}
