use std::ffi::c_void;
use std::sync::{Arc, Mutex};

use granheat_core::{HeatGranError, PairHeatConsumer, SharedPairConsumer};

use crate::error::{DefaultGranHeatError, GranHeatErrorCode};
use crate::helpers::{instance_from_ptr, track_code, write_state};

/// C callback receiving `(user_data, i, j, flux)` for every evaluated pair.
pub type GranHeatAddHeatFn = extern "C" fn(user_data: *mut c_void, i: usize, j: usize, flux: f64);

/// Pair-local heat consumer supplied by the host.
///
/// Two callbacks are the same consumer when both the function and
/// `user_data` match.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct GranHeatPairCallback {
    pub add_heat: GranHeatAddHeatFn,
    pub user_data: *mut c_void,
}

impl GranHeatPairCallback {
    fn same_as(&self, other: &Self) -> bool {
        self.user_data == other.user_data && self.add_heat as usize == other.add_heat as usize
    }
}

struct CallbackConsumer(GranHeatPairCallback);

// SAFETY: the host guarantees `user_data` may be used from whichever thread
// runs the pass; the pointer is only handed back to its own callback.
unsafe impl Send for CallbackConsumer {}

impl PairHeatConsumer for CallbackConsumer {
    fn add_heat(&mut self, i: usize, j: usize, flux: f64) {
        (self.0.add_heat)(self.0.user_data, i, j, flux);
    }
}

pub(crate) fn shared(callback: GranHeatPairCallback) -> SharedPairConsumer {
    Arc::new(Mutex::new(CallbackConsumer(callback)))
}

/// Register the single pair-local consumer.
///
/// Returns `GranHeatErrorCode::ConsumerRegistration` while another consumer is registered.
///
/// # Safety
/// `ptr` must come from `granheat_new`. `callback.user_data` must stay valid
/// until the consumer is unregistered.
#[no_mangle]
pub unsafe extern "C" fn granheat_register_pair_consumer(
    ptr: *const crate::GranHeatInstance,
    callback: GranHeatPairCallback,
) -> GranHeatErrorCode {
    track_code((|| -> Result<(), DefaultGranHeatError> {
        let instance = instance_from_ptr(ptr)?;
        let mut state = write_state(instance)?;
        let consumer = shared(callback);
        state.exchange.register_pair_consumer(consumer.clone())?;
        state.consumer = Some((callback, consumer));
        Ok(())
    })())
}

/// Unregister the pair-local consumer.
///
/// Returns `GranHeatErrorCode::ConsumerRegistration` unless `callback` is the
/// registered one.
///
/// # Safety
/// `ptr` must come from `granheat_new`.
#[no_mangle]
pub unsafe extern "C" fn granheat_unregister_pair_consumer(
    ptr: *const crate::GranHeatInstance,
    callback: GranHeatPairCallback,
) -> GranHeatErrorCode {
    track_code((|| -> Result<(), DefaultGranHeatError> {
        let instance = instance_from_ptr(ptr)?;
        let mut state = write_state(instance)?;
        let consumer = match &state.consumer {
            Some((registered, consumer)) if registered.same_as(&callback) => consumer.clone(),
            _ => return Err(HeatGranError::ConsumerMismatch.into()),
        };
        state.exchange.unregister_pair_consumer(&consumer)?;
        state.consumer = None;
        Ok(())
    })())
}

/// Handle matching `callback`, or a fresh one the module will reject.
pub(crate) fn lookup(
    registered: Option<&(GranHeatPairCallback, SharedPairConsumer)>,
    callback: GranHeatPairCallback,
) -> SharedPairConsumer {
    match registered {
        Some((current, consumer)) if current.same_as(&callback) => consumer.clone(),
        _ => shared(callback),
    }
}
