//! C ABI for the granular heat-exchange module
//!
//! Hosts create one opaque [`GranHeatInstance`] per domain, feed it per-type
//! properties, call `granheat_init`, and then `granheat_pre_force` /
//! `granheat_post_force` every step. Particle, buffer and neighbor arrays
//! stay host-owned and are borrowed for the duration of each call.
//!
//! Every fallible function returns a [`GranHeatErrorCode`]; the message of
//! the last failure on the calling thread is available from
//! `granheat_get_last_error`.

mod consumer;
mod error;
mod helpers;
mod instance;
mod pass;

pub use consumer::{
    granheat_register_pair_consumer, granheat_unregister_pair_consumer, GranHeatAddHeatFn,
    GranHeatPairCallback,
};
pub use error::{granheat_get_last_error, granheat_get_last_error_code, GranHeatErrorCode};
pub use instance::{
    granheat_destroy, granheat_init, granheat_new, granheat_set_type_property, GranHeatInstance,
};
pub use pass::{
    granheat_evaluate_for_consumer, granheat_post_force, granheat_pre_force,
    granheat_seed_conductivity, GranHeatBuffers, GranHeatNeighborList, GranHeatParticles,
    GranHeatPassSummary, GranHeatReverseComm,
};
