//! Flux accumulation and pair-local reporting
//!
//! Every evaluated pair ends up in exactly one place:
//! - direct accumulation into per-particle totals (default), or
//! - forwarding `(i, j, flux)` to the single registered [`PairHeatConsumer`].
//!
//! Direct accumulation adds `flux` to particle i and subtracts it from
//! particle j. Both particles receive half of `flux · (x_i - x_j)` on their
//! directional accumulator. Particle j is only written when it is owned
//! locally or Newton's third law is applied across processes.

use std::sync::{Arc, Mutex};

use crate::core_types::Vec3;
use crate::error::HeatGranError;

/// Receives per-pair heat flux instead of direct accumulation.
pub trait PairHeatConsumer {
    fn add_heat(&mut self, i: usize, j: usize, flux: f64);
}

/// Shared handle to a consumer; identity is the allocation.
pub type SharedPairConsumer = Arc<Mutex<dyn PairHeatConsumer + Send>>;

/// Records every delivered pair.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PairHeatLog {
    pub entries: Vec<(usize, usize, f64)>,
}

impl PairHeatLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle suitable for [`crate::GranularHeatExchange::register_pair_consumer`].
    pub fn shared() -> Arc<Mutex<Self>> {
        Arc::new(Mutex::new(Self::new()))
    }

    /// Net flux delivered for the unordered pair `{i, j}`, seen from `i`.
    pub fn net_flux(&self, i: usize, j: usize) -> f64 {
        self.entries
            .iter()
            .map(|&(a, b, flux)| {
                if (a, b) == (i, j) {
                    flux
                } else if (a, b) == (j, i) {
                    -flux
                } else {
                    0.0
                }
            })
            .sum()
    }
}

impl PairHeatConsumer for PairHeatLog {
    fn add_heat(&mut self, i: usize, j: usize, flux: f64) {
        self.entries.push((i, j, flux));
    }
}

/// At most one registered consumer.
#[derive(Default)]
pub struct ConsumerSlot {
    current: Option<SharedPairConsumer>,
}

impl std::fmt::Debug for ConsumerSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsumerSlot")
            .field("registered", &self.current.is_some())
            .finish()
    }
}

#[inline]
fn same_consumer(a: &SharedPairConsumer, b: &SharedPairConsumer) -> bool {
    std::ptr::eq(Arc::as_ptr(a).cast::<()>(), Arc::as_ptr(b).cast::<()>())
}

impl ConsumerSlot {
    /// # Errors
    /// [`HeatGranError::ConsumerAlreadyRegistered`] if the slot is taken.
    pub fn register(&mut self, consumer: SharedPairConsumer) -> Result<(), HeatGranError> {
        if self.current.is_some() {
            return Err(HeatGranError::ConsumerAlreadyRegistered);
        }
        self.current = Some(consumer);
        Ok(())
    }

    /// # Errors
    /// [`HeatGranError::ConsumerMismatch`] unless `consumer` is the registered one.
    pub fn unregister(&mut self, consumer: &SharedPairConsumer) -> Result<(), HeatGranError> {
        if !self.is_registered(consumer) {
            return Err(HeatGranError::ConsumerMismatch);
        }
        self.current = None;
        Ok(())
    }

    pub fn is_registered(&self, consumer: &SharedPairConsumer) -> bool {
        self.current
            .as_ref()
            .is_some_and(|current| same_consumer(current, consumer))
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_none()
    }
}

/// Contact statistics written during a direct-accumulation pass.
pub(crate) struct ContactCounters<'r> {
    pub area: &'r mut [f64],
    pub count: &'r mut [f64],
}

/// Per-particle totals written during a direct-accumulation pass.
pub(crate) struct Accumulators<'r> {
    pub heat_flux: &'r mut [f64],
    pub directional: &'r mut [[f64; 3]],
    pub contact: Option<ContactCounters<'r>>,
    pub newton_pair: bool,
    pub nlocal: usize,
}

#[inline(always)]
fn add_vec(dst: &mut [f64; 3], v: &Vec3) {
    dst[0] += v.x;
    dst[1] += v.y;
    dst[2] += v.z;
}

impl Accumulators<'_> {
    #[inline]
    pub fn add_pair(
        &mut self,
        i: usize,
        j: usize,
        flux: f64,
        del: &Vec3,
        contact_area: Option<f64>,
    ) {
        let half = del * flux * 0.5;

        self.heat_flux[i] += flux;
        add_vec(&mut self.directional[i], &half);
        if let (Some(area), Some(counters)) = (contact_area, self.contact.as_mut()) {
            counters.area[i] += area;
            counters.count[i] += 1.0;
        }

        if self.newton_pair || j < self.nlocal {
            self.heat_flux[j] -= flux;
            add_vec(&mut self.directional[j], &half);
            if let (Some(area), Some(counters)) = (contact_area, self.contact.as_mut()) {
                counters.area[j] += area;
                counters.count[j] += 1.0;
            }
        }
    }

    /// Add precomputed per-particle totals (parallel radiation).
    #[inline]
    pub fn add_totals(&mut self, i: usize, flux: f64, directional: &Vec3) {
        self.heat_flux[i] += flux;
        add_vec(&mut self.directional[i], directional);
    }
}

/// Destination of one evaluation pass.
pub(crate) enum FluxRoute<'r> {
    Accumulate(Accumulators<'r>),
    Forward(&'r mut (dyn PairHeatConsumer + Send)),
}

impl FluxRoute<'_> {
    #[inline]
    pub fn deliver(
        &mut self,
        i: usize,
        j: usize,
        flux: f64,
        del: &Vec3,
        contact_area: Option<f64>,
    ) {
        match self {
            Self::Accumulate(acc) => acc.add_pair(i, j, flux, del, contact_area),
            Self::Forward(consumer) => consumer.add_heat(i, j, flux),
        }
    }
}
