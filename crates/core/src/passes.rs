//! The two pair passes of one evaluation
//!
//! - Radiation: every pair of local particles `i < j`, contact or not.
//! - Conduction: every neighbor-list pair that is in contact.

use rayon::prelude::*;

use crate::accumulate::{Accumulators, FluxRoute};
use crate::config::ContactAreaMode;
use crate::core_types::{ParticleState, Vec3};
use crate::material::MaterialTables;
use crate::neighbor::{mask_index, ContactDetection, NeighborList};
use crate::physics::{
    conduction_flux, contact_area, corrected_conductivity, heat_transfer_coefficient,
    radiative_flux, PairGeometry,
};

/// Pair counts of one pass, for logging and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassSummary {
    /// Radiative pairs evaluated
    pub radiative_pairs: usize,
    /// Neighbor pairs that conducted heat
    pub contacts: usize,
    /// Flagged contacts whose geometry no longer overlaps
    pub stale_contacts: usize,
}

#[inline]
fn radiative_pair(state: &ParticleState<'_>, a: usize, b: usize) -> Option<(f64, Vec3)> {
    let geom = PairGeometry::new(&state.x[a], &state.x[b], state.radius[a], state.radius[b]);
    // coincident centres have no defined view factor
    if geom.rsq == 0.0 {
        return None;
    }
    let flux = radiative_flux(
        geom.distance(),
        geom.radj,
        state.temperature[a],
        state.temperature[b],
    );
    Some((flux, geom.del))
}

/// All-pairs radiation in ascending `(i, j)` order.
pub(crate) fn radiation_pass(state: &ParticleState<'_>, route: &mut FluxRoute<'_>) -> usize {
    let nlocal = state.nlocal;
    let mut pairs = 0;
    for i in 0..nlocal {
        for j in (i + 1)..nlocal {
            if let Some((flux, del)) = radiative_pair(state, i, j) {
                route.deliver(i, j, flux, &del, None);
                pairs += 1;
            }
        }
    }
    pairs
}

/// All-pairs radiation with one rayon task per particle.
///
/// Each particle sums its own partners in ascending index order, so the
/// result does not depend on scheduling.
pub(crate) fn radiation_pass_parallel(
    state: &ParticleState<'_>,
    acc: &mut Accumulators<'_>,
) -> usize {
    let nlocal = state.nlocal;
    let totals: Vec<(f64, Vec3, usize)> = (0..nlocal)
        .into_par_iter()
        .map(|i| {
            let mut flux_sum = 0.0;
            let mut dir_sum = Vec3::zeros();
            let mut upper_pairs = 0;
            for j in 0..nlocal {
                if j == i {
                    continue;
                }
                let (a, b) = if i < j { (i, j) } else { (j, i) };
                if let Some((flux, del)) = radiative_pair(state, a, b) {
                    if i == a {
                        flux_sum += flux;
                        upper_pairs += 1;
                    } else {
                        flux_sum -= flux;
                    }
                    dir_sum += del * flux * 0.5;
                }
            }
            (flux_sum, dir_sum, upper_pairs)
        })
        .collect();

    let mut pairs = 0;
    for (i, (flux, dir, upper_pairs)) in totals.iter().enumerate() {
        acc.add_totals(i, *flux, dir);
        pairs += upper_pairs;
    }
    pairs
}

/// Neighbor-list conduction pass.
///
/// One function covers both detection strategies and every area mode; the
/// branches are resolved per pair.
#[allow(clippy::too_many_arguments)]
pub(crate) fn conduction_pass(
    detection: ContactDetection,
    mode: ContactAreaMode,
    groupbit: u32,
    tables: &MaterialTables,
    state: &ParticleState<'_>,
    neighbors: &NeighborList<'_>,
    conductivity: &mut [f64],
    route: &mut FluxRoute<'_>,
) -> (usize, usize) {
    let mut contacts = 0;
    let mut stale = 0;

    for &i in neighbors.ilist {
        let i = i as usize;
        let flags = neighbors.contact_flags_of(i);

        for (jj, &jraw) in neighbors.neighbors_of(i).iter().enumerate() {
            let j = mask_index(jraw);

            if state.mask[i] & groupbit == 0 && state.mask[j] & groupbit == 0 {
                continue;
            }

            let geom =
                PairGeometry::new(&state.x[i], &state.x[j], state.radius[i], state.radius[j]);

            match (detection, flags) {
                (ContactDetection::History, Some(flags)) => {
                    if flags[jj] == 0 {
                        continue;
                    }
                    if !geom.in_contact() {
                        stale += 1;
                        continue;
                    }
                }
                _ => {
                    if !geom.in_contact() {
                        continue;
                    }
                }
            }

            let (type_i, type_j) = (state.kind[i], state.kind[j]);
            let ratio = tables
                .area_correction
                .as_ref()
                .map(|table| table.ratio(type_i, type_j));
            let area = contact_area(mode, &geom, ratio);

            let (temp_i, temp_j) = (state.temperature[i], state.temperature[j]);
            let k_i = corrected_conductivity(tables.conductivity.conductivity(type_i), temp_i);
            let k_j = corrected_conductivity(tables.conductivity.conductivity(type_j), temp_j);
            conductivity[i] = k_i;
            conductivity[j] = k_j;

            let hc = heat_transfer_coefficient(k_i, k_j, area);
            let flux = conduction_flux(temp_i, temp_j, hc);
            route.deliver(i, j, flux, &geom.del, Some(area));
            contacts += 1;
        }
    }

    (contacts, stale)
}
