use std::ffi::c_void;

use granheat_core::{
    ContactDataBuffers, HeatFluxBuffers, NeighborList, ParticleState, PassSummary, ReverseComm,
};

use crate::consumer::{lookup, GranHeatPairCallback};
use crate::error::{DefaultGranHeatError, GranHeatErrorCode};
use crate::helpers::{
    instance_from_ptr, read_state, slice_from_ptr, slice_from_ptr_mut, track_code, write_state,
};
use crate::instance::GranHeatInstance;

/// Read-only particle arrays, `nall` entries each (local particles first).
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct GranHeatParticles {
    /// `3 * nall` doubles, xyz interleaved
    pub x: *const f64,
    pub radius: *const f64,
    /// 1-based particle type
    pub kind: *const u32,
    pub temperature: *const f64,
    pub mask: *const u32,
    pub nlocal: usize,
    pub nall: usize,
}

/// Accumulation targets, `nall` entries each.
///
/// The four contact-data pointers are either all set or all null.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct GranHeatBuffers {
    pub heat_flux: *mut f64,
    /// `3 * nall` doubles, xyz interleaved
    pub directional_heat_flux: *mut f64,
    pub conductivity: *mut f64,
    pub contact_area: *mut f64,
    pub contact_count: *mut f64,
    pub wall_heat_transfer_coeff: *mut f64,
    pub wall_temperature: *mut f64,
}

/// Half neighbor list in compressed-row form.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct GranHeatNeighborList {
    pub ilist: *const u32,
    pub inum: usize,
    /// Indexed by particle, `nrows` entries
    pub numneigh: *const u32,
    /// Indexed by particle, `nrows` entries; offsets into `neighbors`
    pub firstneigh: *const usize,
    pub nrows: usize,
    pub neighbors: *const u32,
    pub nneighbors: usize,
    /// Optional, parallel to `neighbors`; null for geometric contact detection
    pub contact_flags: *const u32,
}

/// Host reverse communication. Either callback may be null when the host
/// runs without Newton's third law.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct GranHeatReverseComm {
    pub user_data: *mut c_void,
    pub reverse_scalar: Option<extern "C" fn(user_data: *mut c_void, buffer: *mut f64, n: usize)>,
    /// `buffer` holds `3 * n` doubles
    pub reverse_vector: Option<extern "C" fn(user_data: *mut c_void, buffer: *mut f64, n: usize)>,
}

/// Pair counts of one pass.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GranHeatPassSummary {
    pub radiative_pairs: usize,
    pub contacts: usize,
    pub stale_contacts: usize,
}

impl From<PassSummary> for GranHeatPassSummary {
    fn from(summary: PassSummary) -> Self {
        Self {
            radiative_pairs: summary.radiative_pairs,
            contacts: summary.contacts,
            stale_contacts: summary.stale_contacts,
        }
    }
}

struct CallbackComm(GranHeatReverseComm);

impl ReverseComm for CallbackComm {
    fn reverse_scalar(&mut self, buffer: &mut [f64]) {
        if let Some(reverse) = self.0.reverse_scalar {
            reverse(self.0.user_data, buffer.as_mut_ptr(), buffer.len());
        }
    }

    fn reverse_vector(&mut self, buffer: &mut [[f64; 3]]) {
        if let Some(reverse) = self.0.reverse_vector {
            reverse(self.0.user_data, buffer.as_mut_ptr().cast(), buffer.len());
        }
    }
}

/// # Safety
/// Pointers must cover `nall` (or `3 * nall`) elements.
unsafe fn particle_state<'a>(
    particles: *const GranHeatParticles,
) -> Result<ParticleState<'a>, DefaultGranHeatError> {
    let p = unsafe { particles.as_ref() }
        .ok_or_else(|| DefaultGranHeatError::null_pointer("particles"))?;
    let n = p.nall;
    Ok(ParticleState {
        x: unsafe { slice_from_ptr(p.x.cast::<[f64; 3]>(), n, "particles.x")? },
        radius: unsafe { slice_from_ptr(p.radius, n, "particles.radius")? },
        kind: unsafe { slice_from_ptr(p.kind, n, "particles.kind")? },
        temperature: unsafe { slice_from_ptr(p.temperature, n, "particles.temperature")? },
        mask: unsafe { slice_from_ptr(p.mask, n, "particles.mask")? },
        nlocal: p.nlocal,
    })
}

/// # Safety
/// Non-null pointers must cover `nall` (or `3 * nall`) elements and must not alias.
unsafe fn flux_buffers<'a>(
    buffers: *const GranHeatBuffers,
    nall: usize,
) -> Result<HeatFluxBuffers<'a>, DefaultGranHeatError> {
    let b = unsafe { buffers.as_ref() }
        .ok_or_else(|| DefaultGranHeatError::null_pointer("buffers"))?;
    let contact = if b.contact_area.is_null() {
        None
    } else {
        Some(ContactDataBuffers {
            area: unsafe { slice_from_ptr_mut(b.contact_area, nall, "buffers.contact_area")? },
            count: unsafe { slice_from_ptr_mut(b.contact_count, nall, "buffers.contact_count")? },
            wall_heat_transfer_coeff: unsafe {
                slice_from_ptr_mut(
                    b.wall_heat_transfer_coeff,
                    nall,
                    "buffers.wall_heat_transfer_coeff",
                )?
            },
            wall_temperature: unsafe {
                slice_from_ptr_mut(b.wall_temperature, nall, "buffers.wall_temperature")?
            },
        })
    };
    Ok(HeatFluxBuffers {
        heat_flux: unsafe { slice_from_ptr_mut(b.heat_flux, nall, "buffers.heat_flux")? },
        directional_heat_flux: unsafe {
            slice_from_ptr_mut(
                b.directional_heat_flux.cast::<[f64; 3]>(),
                nall,
                "buffers.directional_heat_flux",
            )?
        },
        conductivity: unsafe { slice_from_ptr_mut(b.conductivity, nall, "buffers.conductivity")? },
        contact,
    })
}

/// # Safety
/// Row arrays must cover `nrows` entries, `ilist` `inum`, neighbors and flags `nneighbors`.
unsafe fn neighbor_list<'a>(
    neighbors: *const GranHeatNeighborList,
) -> Result<NeighborList<'a>, DefaultGranHeatError> {
    let l = unsafe { neighbors.as_ref() }
        .ok_or_else(|| DefaultGranHeatError::null_pointer("neighbors"))?;
    let contact_flags = if l.contact_flags.is_null() {
        None
    } else {
        Some(unsafe { slice_from_ptr(l.contact_flags, l.nneighbors, "neighbors.contact_flags")? })
    };
    Ok(NeighborList {
        ilist: unsafe { slice_from_ptr(l.ilist, l.inum, "neighbors.ilist")? },
        numneigh: unsafe { slice_from_ptr(l.numneigh, l.nrows, "neighbors.numneigh")? },
        firstneigh: unsafe { slice_from_ptr(l.firstneigh, l.nrows, "neighbors.firstneigh")? },
        neighbors: unsafe { slice_from_ptr(l.neighbors, l.nneighbors, "neighbors.neighbors")? },
        contact_flags,
    })
}

/// # Safety
/// `out_summary` must be null or point to writable memory.
unsafe fn write_summary(out_summary: *mut GranHeatPassSummary, summary: PassSummary) {
    // Null means the caller does not want the summary.
    if let Some(out) = unsafe { out_summary.as_mut() } {
        *out = summary.into();
    }
}

/// Write each local particle's base conductivity into `conductivity` (`nlocal` entries).
///
/// # Safety
/// See `GranHeatParticles`; `conductivity` must hold `nlocal` doubles.
#[no_mangle]
pub unsafe extern "C" fn granheat_seed_conductivity(
    ptr: *const GranHeatInstance,
    particles: *const GranHeatParticles,
    conductivity: *mut f64,
) -> GranHeatErrorCode {
    track_code((|| -> Result<(), DefaultGranHeatError> {
        let instance = instance_from_ptr(ptr)?;
        let state = unsafe { particle_state(particles)? };
        let conductivity =
            unsafe { slice_from_ptr_mut(conductivity, state.nlocal, "conductivity")? };
        read_state(instance)?
            .exchange
            .seed_conductivity(&state, conductivity)?;
        Ok(())
    })())
}

/// Clear wall coupling slots at the start of a step (contact data only).
///
/// # Safety
/// See `GranHeatBuffers`.
#[no_mangle]
pub unsafe extern "C" fn granheat_pre_force(
    ptr: *const GranHeatInstance,
    buffers: *const GranHeatBuffers,
    nall: usize,
) -> GranHeatErrorCode {
    track_code((|| -> Result<(), DefaultGranHeatError> {
        let instance = instance_from_ptr(ptr)?;
        let mut buffers = unsafe { flux_buffers(buffers, nall)? };
        read_state(instance)?.exchange.pre_force(&mut buffers);
        Ok(())
    })())
}

/// Radiation and conduction pass with direct accumulation.
///
/// `comm` may be null when `newton_pair` is false. `out_summary` may be null.
///
/// # Safety
/// See `GranHeatParticles`, `GranHeatBuffers` and `GranHeatNeighborList`.
#[no_mangle]
pub unsafe extern "C" fn granheat_post_force(
    ptr: *const GranHeatInstance,
    particles: *const GranHeatParticles,
    buffers: *const GranHeatBuffers,
    neighbors: *const GranHeatNeighborList,
    newton_pair: bool,
    comm: *const GranHeatReverseComm,
    out_summary: *mut GranHeatPassSummary,
) -> GranHeatErrorCode {
    track_code((|| -> Result<(), DefaultGranHeatError> {
        let instance = instance_from_ptr(ptr)?;
        let state = unsafe { particle_state(particles)? };
        let mut flux = unsafe { flux_buffers(buffers, state.nall())? };
        let list = unsafe { neighbor_list(neighbors)? };
        let mut comm = match unsafe { comm.as_ref() } {
            Some(comm) => CallbackComm(*comm),
            None if !newton_pair => CallbackComm(GranHeatReverseComm {
                user_data: std::ptr::null_mut(),
                reverse_scalar: None,
                reverse_vector: None,
            }),
            None => return Err(DefaultGranHeatError::null_pointer("comm")),
        };

        let mut guard = write_state(instance)?;
        let host = guard.host(newton_pair)?;
        let summary = guard
            .exchange
            .post_force(&state, &mut flux, &list, &host, &mut comm)?;
        unsafe { write_summary(out_summary, summary) };
        Ok(())
    })())
}

/// Same pass as `granheat_post_force`, but every pair goes to the registered
/// consumer `callback`. Per-particle totals and contact statistics are untouched.
///
/// # Safety
/// See `granheat_post_force`.
#[no_mangle]
pub unsafe extern "C" fn granheat_evaluate_for_consumer(
    ptr: *const GranHeatInstance,
    callback: GranHeatPairCallback,
    particles: *const GranHeatParticles,
    buffers: *const GranHeatBuffers,
    neighbors: *const GranHeatNeighborList,
    newton_pair: bool,
    out_summary: *mut GranHeatPassSummary,
) -> GranHeatErrorCode {
    track_code((|| -> Result<(), DefaultGranHeatError> {
        let instance = instance_from_ptr(ptr)?;
        let state = unsafe { particle_state(particles)? };
        let mut flux = unsafe { flux_buffers(buffers, state.nall())? };
        let list = unsafe { neighbor_list(neighbors)? };

        let mut guard = write_state(instance)?;
        let host = guard.host(newton_pair)?;
        let caller = lookup(guard.consumer.as_ref(), callback);
        let summary = guard
            .exchange
            .evaluate_for_consumer(&caller, &state, &mut flux, &list, &host)?;
        unsafe { write_summary(out_summary, summary) };
        Ok(())
    })())
}

#[cfg(test)]
mod tests {
    use std::ffi::CString;
    use std::ptr;

    use super::*;
    use crate::consumer::{granheat_register_pair_consumer, granheat_unregister_pair_consumer};
    use crate::instance::{
        granheat_destroy, granheat_init, granheat_new, granheat_set_type_property,
    };

    /// Two unit spheres 1.8 apart at 400 K and 300 K, both in group 1.
    struct Pair {
        x: [f64; 6],
        radius: [f64; 2],
        kind: [u32; 2],
        temperature: [f64; 2],
        mask: [u32; 2],
    }

    impl Pair {
        fn new() -> Self {
            Self {
                x: [0.0, 0.0, 0.0, 1.8, 0.0, 0.0],
                radius: [1.0; 2],
                kind: [1; 2],
                temperature: [400.0, 300.0],
                mask: [1; 2],
            }
        }

        fn particles(&self) -> GranHeatParticles {
            GranHeatParticles {
                x: self.x.as_ptr(),
                radius: self.radius.as_ptr(),
                kind: self.kind.as_ptr(),
                temperature: self.temperature.as_ptr(),
                mask: self.mask.as_ptr(),
                nlocal: 2,
                nall: 2,
            }
        }
    }

    fn initialized_instance() -> *mut GranHeatInstance {
        let mut instance = ptr::null_mut();
        let style = CString::new("gran/hertz/history").unwrap();
        let name = CString::new("thermalConductivity").unwrap();
        let conductivity = [1.0];
        unsafe {
            assert_eq!(granheat_new(ptr::null(), 0, &mut instance), GranHeatErrorCode::Ok);
            assert_eq!(
                granheat_set_type_property(instance, name.as_ptr(), conductivity.as_ptr(), 1),
                GranHeatErrorCode::Ok
            );
            assert_eq!(granheat_init(instance, style.as_ptr(), 1.5, 1), GranHeatErrorCode::Ok);
        }
        instance
    }

    fn buffers(
        heat_flux: &mut [f64; 2],
        directional: &mut [f64; 6],
        k: &mut [f64; 2],
    ) -> GranHeatBuffers {
        GranHeatBuffers {
            heat_flux: heat_flux.as_mut_ptr(),
            directional_heat_flux: directional.as_mut_ptr(),
            conductivity: k.as_mut_ptr(),
            contact_area: ptr::null_mut(),
            contact_count: ptr::null_mut(),
            wall_heat_transfer_coeff: ptr::null_mut(),
            wall_temperature: ptr::null_mut(),
        }
    }

    fn half_list(
        ilist: &[u32; 2],
        numneigh: &[u32; 2],
        firstneigh: &[usize; 2],
        neighbors: &[u32; 1],
    ) -> GranHeatNeighborList {
        GranHeatNeighborList {
            ilist: ilist.as_ptr(),
            inum: 2,
            numneigh: numneigh.as_ptr(),
            firstneigh: firstneigh.as_ptr(),
            nrows: 2,
            neighbors: neighbors.as_ptr(),
            nneighbors: 1,
            contact_flags: ptr::null(),
        }
    }

    extern "C" fn sum_flux(user_data: *mut c_void, _i: usize, _j: usize, flux: f64) {
        let total = unsafe { &mut *user_data.cast::<f64>() };
        *total += flux;
    }

    #[test]
    fn test_post_force_through_c_buffers() {
        let instance = initialized_instance();
        let pair = Pair::new();
        let particles = pair.particles();
        let (ilist, numneigh, firstneigh, neighbor_ids) = ([0, 1], [1, 0], [0, 1], [1]);
        let list = half_list(&ilist, &numneigh, &firstneigh, &neighbor_ids);

        let mut seeded = [0.0; 2];
        unsafe {
            assert_eq!(
                granheat_seed_conductivity(instance, &particles, seeded.as_mut_ptr()),
                GranHeatErrorCode::Ok
            );
        }
        assert_eq!(seeded, [1.0, 1.0]);

        let (mut heat_flux, mut directional, mut k) = ([0.0; 2], [0.0; 6], [0.0; 2]);
        let flux = buffers(&mut heat_flux, &mut directional, &mut k);
        let mut summary = GranHeatPassSummary::default();
        unsafe {
            assert_eq!(granheat_pre_force(instance, &flux, 2), GranHeatErrorCode::Ok);
            let code = granheat_post_force(
                instance,
                &particles,
                &flux,
                &list,
                false,
                ptr::null(),
                &mut summary,
            );
            assert_eq!(code, GranHeatErrorCode::Ok);
        }

        assert_eq!(
            summary,
            GranHeatPassSummary {
                radiative_pairs: 1,
                contacts: 1,
                stale_contacts: 0,
            }
        );
        // hot particle loses what the cold one gains
        assert!(heat_flux[0] < 0.0);
        assert!((heat_flux[0] + heat_flux[1]).abs() < 1e-9 * heat_flux[0].abs());
        // interleaved xyz: both halves land on x only
        assert!(directional[0] != 0.0);
        assert_eq!(directional[0], directional[3]);
        assert_eq!([directional[1], directional[2]], [0.0, 0.0]);
        assert_eq!([directional[4], directional[5]], [0.0, 0.0]);

        unsafe { granheat_destroy(instance) };
    }

    #[test]
    fn test_post_force_requires_comm_with_newton() {
        let instance = initialized_instance();
        let pair = Pair::new();
        let particles = pair.particles();
        let (ilist, numneigh, firstneigh, neighbor_ids) = ([0, 1], [1, 0], [0, 1], [1]);
        let list = half_list(&ilist, &numneigh, &firstneigh, &neighbor_ids);
        let (mut heat_flux, mut directional, mut k) = ([0.0; 2], [0.0; 6], [0.0; 2]);
        let flux = buffers(&mut heat_flux, &mut directional, &mut k);

        let code = unsafe {
            granheat_post_force(
                instance,
                &particles,
                &flux,
                &list,
                true,
                ptr::null(),
                ptr::null_mut(),
            )
        };
        assert_eq!(code, GranHeatErrorCode::NullPointer);
        assert_eq!(heat_flux, [0.0, 0.0]);

        unsafe { granheat_destroy(instance) };
    }

    #[test]
    fn test_consumer_receives_the_same_net_flux() {
        let instance = initialized_instance();
        let pair = Pair::new();
        let particles = pair.particles();
        let (ilist, numneigh, firstneigh, neighbor_ids) = ([0, 1], [1, 0], [0, 1], [1]);
        let list = half_list(&ilist, &numneigh, &firstneigh, &neighbor_ids);

        let (mut heat_flux, mut directional, mut k) = ([0.0; 2], [0.0; 6], [0.0; 2]);
        let flux = buffers(&mut heat_flux, &mut directional, &mut k);
        let code = unsafe {
            granheat_post_force(
                instance,
                &particles,
                &flux,
                &list,
                false,
                ptr::null(),
                ptr::null_mut(),
            )
        };
        assert_eq!(code, GranHeatErrorCode::Ok);

        let mut total = 0.0_f64;
        let callback = GranHeatPairCallback {
            add_heat: sum_flux,
            user_data: ptr::addr_of_mut!(total).cast(),
        };
        let (mut pair_flux, mut pair_directional, mut pair_k) = ([0.0; 2], [0.0; 6], [0.0; 2]);
        let untouched = buffers(&mut pair_flux, &mut pair_directional, &mut pair_k);
        unsafe {
            assert_eq!(
                granheat_evaluate_for_consumer(
                    instance,
                    callback,
                    &particles,
                    &untouched,
                    &list,
                    false,
                    ptr::null_mut(),
                ),
                GranHeatErrorCode::ConsumerRegistration
            );
            assert_eq!(
                granheat_register_pair_consumer(instance, callback),
                GranHeatErrorCode::Ok
            );
            assert_eq!(
                granheat_evaluate_for_consumer(
                    instance,
                    callback,
                    &particles,
                    &untouched,
                    &list,
                    false,
                    ptr::null_mut(),
                ),
                GranHeatErrorCode::Ok
            );
            assert_eq!(
                granheat_unregister_pair_consumer(instance, callback),
                GranHeatErrorCode::Ok
            );
        }

        assert!((total - heat_flux[0]).abs() < 1e-9 * total.abs());
        assert_eq!(pair_flux, [0.0, 0.0]);
        unsafe { granheat_destroy(instance) };
    }
}
