//! Granular heat-exchange module
//!
//! Per-timestep heat exchange between particles through two independent
//! mechanisms:
//! - contact conduction over the neighbor list
//! - radiative exchange between every pair of local particles
//!
//! # Lifecycle
//!
//! ```text
//! new(config)            validate configuration
//! post_create(store)     register contact-data storage if requested
//! init(props, style, n)  build material tables (again on re-init)
//! pre_force(buffers)     clear wall coupling slots
//! post_force(...)        radiation + conduction, reverse comm, statistics
//! ```
//!
//! `evaluate_for_consumer` runs the same two passes but hands every pair to
//! the registered pair-local consumer instead of accumulating.

use tracing::{debug, info, warn};

use crate::accumulate::{
    Accumulators, ConsumerSlot, ContactCounters, FluxRoute, SharedPairConsumer,
};
use crate::comm::ReverseComm;
use crate::config::HeatExchangeConfig;
use crate::core_types::particle::ALL_GROUP_BIT;
use crate::core_types::{HeatFluxBuffers, ParticleState, ParticleStore};
use crate::error::HeatGranError;
use crate::material::{MaterialSource, MaterialTables, PairStyle};
use crate::neighbor::NeighborList;
use crate::passes::{conduction_pass, radiation_pass, radiation_pass_parallel, PassSummary};

fn checked_tables<'t>(
    tables: Option<&'t MaterialTables>,
    state: &ParticleState<'_>,
) -> Result<&'t MaterialTables, HeatGranError> {
    let tables = tables.ok_or(HeatGranError::NotInitialized)?;
    let max_type = tables.conductivity.max_type();
    if let Some((index, &particle_type)) = state
        .kind
        .iter()
        .enumerate()
        .find(|(_, &t)| t == 0 || t as usize > max_type)
    {
        return Err(HeatGranError::ParticleTypeOutOfRange {
            index,
            particle_type,
            max_type,
        });
    }
    Ok(tables)
}

fn warn_hybrid_once(warned: &mut bool, host: &HostContext) {
    if host.pair_style.is_hybrid() && !*warned {
        warn!(
            pair_style = %host.pair_style.name,
            "Granular heat exchange may not be valid for hybrid pair styles"
        );
        *warned = true;
    }
}

/// Host settings that can change between passes.
#[derive(Debug, Clone, PartialEq)]
pub struct HostContext {
    /// Newton's third law across process boundaries: ghost partners are
    /// written and folded back by reverse communication
    pub newton_pair: bool,
    /// Active contact-force model
    pub pair_style: PairStyle,
}

/// Contact conduction plus pairwise radiation for granular particles.
#[derive(Debug)]
pub struct GranularHeatExchange {
    config: HeatExchangeConfig,
    groupbit: u32,
    tables: Option<MaterialTables>,
    consumer: ConsumerSlot,
    hybrid_warned: bool,
}

impl GranularHeatExchange {
    /// # Errors
    /// Any configuration rejected by [`HeatExchangeConfig::validate`].
    pub fn new(config: HeatExchangeConfig) -> Result<Self, HeatGranError> {
        config.validate()?;
        info!(
            contact_area = ?config.contact_area,
            area_correction = config.area_correction,
            store_contact_data = config.store_contact_data,
            parallel_radiation = config.parallel_radiation,
            "Creating granular heat exchange"
        );
        Ok(Self {
            config,
            groupbit: ALL_GROUP_BIT,
            tables: None,
            consumer: ConsumerSlot::default(),
            hybrid_warned: false,
        })
    }

    /// # Errors
    /// See [`HeatExchangeConfig::from_keywords`].
    pub fn from_keywords<S: AsRef<str>>(args: &[S]) -> Result<Self, HeatGranError> {
        Self::new(HeatExchangeConfig::from_keywords(args)?)
    }

    /// Restrict conduction to pairs where at least one particle carries `groupbit`.
    pub fn with_groupbit(mut self, groupbit: u32) -> Self {
        self.groupbit = groupbit;
        self
    }

    pub fn config(&self) -> &HeatExchangeConfig {
        &self.config
    }

    /// Tables from the last `init()`.
    pub fn tables(&self) -> Option<&MaterialTables> {
        self.tables.as_ref()
    }

    /// Register contact-data storage with the host when statistics are kept.
    pub fn post_create(&self, store: &mut ParticleStore) {
        if self.config.store_contact_data {
            store.register_contact_data();
        }
    }

    /// Build (or rebuild) the material tables.
    ///
    /// # Errors
    /// Negative conductivity, missing properties, or area correction without a
    /// granular contact model.
    pub fn init(
        &mut self,
        source: &dyn MaterialSource,
        pair_style: &PairStyle,
        max_type: usize,
    ) -> Result<(), HeatGranError> {
        let tables =
            MaterialTables::build(source, pair_style, max_type, self.config.area_correction)?;
        info!(
            max_type,
            pair_style = %pair_style.name,
            rebuild = self.tables.is_some(),
            "Initialised heat exchange material tables"
        );
        self.tables = Some(tables);
        Ok(())
    }

    /// Write each local particle's base conductivity into the diagnostic channel.
    ///
    /// # Errors
    /// Not initialised, unknown particle type, or a short buffer.
    pub fn seed_conductivity(
        &self,
        state: &ParticleState<'_>,
        conductivity: &mut [f64],
    ) -> Result<(), HeatGranError> {
        state.validate()?;
        let tables = checked_tables(self.tables.as_ref(), state)?;
        if conductivity.len() < state.nlocal {
            return Err(HeatGranError::BufferLength {
                buffer: "conductivity",
                expected: state.nlocal,
                actual: conductivity.len(),
            });
        }
        for (k, &particle_type) in conductivity.iter_mut().zip(&state.kind[..state.nlocal]) {
            *k = tables.conductivity.conductivity(particle_type);
        }
        Ok(())
    }

    /// Clear the wall coupling slots before wall modules write into them.
    pub fn pre_force(&self, buffers: &mut HeatFluxBuffers<'_>) {
        if !self.config.store_contact_data {
            return;
        }
        if let Some(contact) = buffers.contact.as_mut() {
            contact.wall_heat_transfer_coeff.fill(0.0);
            contact.wall_temperature.fill(0.0);
        }
    }

    /// Register the pair-local consumer.
    ///
    /// # Errors
    /// [`HeatGranError::ConsumerAlreadyRegistered`] while another one is active.
    pub fn register_pair_consumer(
        &mut self,
        consumer: SharedPairConsumer,
    ) -> Result<(), HeatGranError> {
        self.consumer.register(consumer)
    }

    /// # Errors
    /// [`HeatGranError::ConsumerMismatch`] unless `consumer` is the registered one.
    pub fn unregister_pair_consumer(
        &mut self,
        consumer: &SharedPairConsumer,
    ) -> Result<(), HeatGranError> {
        self.consumer.unregister(consumer)
    }

    pub fn has_pair_consumer(&self) -> bool {
        !self.consumer.is_empty()
    }

    fn check_inputs(
        &self,
        state: &ParticleState<'_>,
        buffers: &HeatFluxBuffers<'_>,
        neighbors: &NeighborList<'_>,
    ) -> Result<(), HeatGranError> {
        state.validate()?;
        buffers.validate(state.nall())?;
        neighbors.validate(state.nlocal, state.nall())?;
        if self.config.store_contact_data && buffers.contact.is_none() {
            return Err(HeatGranError::BufferLength {
                buffer: "contact_area",
                expected: state.nall(),
                actual: 0,
            });
        }
        Ok(())
    }

    /// One force-evaluation pass with direct accumulation.
    ///
    /// # Errors
    /// Not initialised, or inputs that fail validation. Nothing is written
    /// when an error is returned.
    pub fn post_force(
        &mut self,
        state: &ParticleState<'_>,
        buffers: &mut HeatFluxBuffers<'_>,
        neighbors: &NeighborList<'_>,
        host: &HostContext,
        comm: &mut dyn ReverseComm,
    ) -> Result<PassSummary, HeatGranError> {
        self.check_inputs(state, buffers, neighbors)?;
        let tables = checked_tables(self.tables.as_ref(), state)?;
        warn_hybrid_once(&mut self.hybrid_warned, host);

        let store_contact = self.config.store_contact_data;
        let HeatFluxBuffers {
            heat_flux,
            directional_heat_flux,
            conductivity,
            contact,
        } = buffers;

        let counters = match contact.as_mut() {
            Some(c) if store_contact => {
                c.area.fill(0.0);
                c.count.fill(0.0);
                Some(ContactCounters {
                    area: &mut *c.area,
                    count: &mut *c.count,
                })
            }
            _ => None,
        };

        let mut acc = Accumulators {
            heat_flux: &mut **heat_flux,
            directional: &mut **directional_heat_flux,
            contact: counters,
            newton_pair: host.newton_pair,
            nlocal: state.nlocal,
        };

        let mut summary = PassSummary::default();
        if self.config.parallel_radiation {
            summary.radiative_pairs = radiation_pass_parallel(state, &mut acc);
        }
        let mut route = FluxRoute::Accumulate(acc);
        if !self.config.parallel_radiation {
            summary.radiative_pairs = radiation_pass(state, &mut route);
        }
        let (contacts, stale) = conduction_pass(
            neighbors.detection(),
            self.config.contact_area,
            self.groupbit,
            tables,
            state,
            neighbors,
            &mut conductivity[..],
            &mut route,
        );
        summary.contacts = contacts;
        summary.stale_contacts = stale;

        if host.newton_pair {
            comm.reverse_scalar(&mut heat_flux[..]);
            comm.reverse_vector(&mut directional_heat_flux[..]);
            if let Some(c) = contact.as_mut().filter(|_| store_contact) {
                comm.reverse_scalar(&mut c.area[..]);
                comm.reverse_scalar(&mut c.count[..]);
            }
        }

        if let Some(c) = contact.as_mut().filter(|_| store_contact) {
            for i in 0..state.nlocal {
                if c.count[i] > 0.5 {
                    c.area[i] /= c.count[i];
                }
            }
        }

        debug!(
            radiative_pairs = summary.radiative_pairs,
            contacts = summary.contacts,
            stale_contacts = summary.stale_contacts,
            "Heat exchange pass complete"
        );
        Ok(summary)
    }

    /// Run both passes for the registered pair-local consumer.
    ///
    /// No per-particle totals or statistics are written; only the diagnostic
    /// conductivity channel is updated. Contact area and count keep the
    /// averages of the previous `post_force`.
    ///
    /// # Errors
    /// [`HeatGranError::ConsumerMismatch`] if `caller` is not the registered
    /// consumer, plus the failures of [`GranularHeatExchange::post_force`].
    pub fn evaluate_for_consumer(
        &mut self,
        caller: &SharedPairConsumer,
        state: &ParticleState<'_>,
        buffers: &mut HeatFluxBuffers<'_>,
        neighbors: &NeighborList<'_>,
        host: &HostContext,
    ) -> Result<PassSummary, HeatGranError> {
        if !self.consumer.is_registered(caller) {
            return Err(HeatGranError::ConsumerMismatch);
        }
        self.check_inputs(state, buffers, neighbors)?;
        let tables = checked_tables(self.tables.as_ref(), state)?;
        warn_hybrid_once(&mut self.hybrid_warned, host);

        let mut guard = caller.lock().map_err(|_| HeatGranError::ConsumerPoisoned)?;
        let mut route = FluxRoute::Forward(&mut *guard);

        let radiative_pairs = radiation_pass(state, &mut route);
        let (contacts, stale_contacts) = conduction_pass(
            neighbors.detection(),
            self.config.contact_area,
            self.groupbit,
            tables,
            state,
            neighbors,
            &mut buffers.conductivity[..],
            &mut route,
        );

        let summary = PassSummary {
            radiative_pairs,
            contacts,
            stale_contacts,
        };
        debug!(?summary, "Heat exchange pair-local pass complete");
        Ok(summary)
    }
}
