use std::ffi::c_char;
use std::ptr;
use std::sync::RwLock;

use granheat_core::{
    GranularHeatExchange, HeatExchangeConfig, HeatGranError, HostContext, MaterialProperties,
    PairStyle, SharedPairConsumer,
};
use tracing::debug;

use crate::consumer::GranHeatPairCallback;
use crate::error::{DefaultGranHeatError, GranHeatErrorCode};
use crate::helpers::{
    instance_from_ptr, slice_from_ptr, str_from_ptr, track_code, track_error, track_result,
    write_state,
};

/// Everything an instance owns, behind one lock.
pub(crate) struct InstanceState {
    pub exchange: GranularHeatExchange,
    /// Per-type properties collected through `granheat_set_type_property`
    pub properties: MaterialProperties,
    /// Pair style seen by the last `granheat_init`
    pub pair_style: Option<PairStyle>,
    /// Callback registered through `granheat_register_pair_consumer`
    pub consumer: Option<(GranHeatPairCallback, SharedPairConsumer)>,
}

impl InstanceState {
    pub fn host(&self, newton_pair: bool) -> Result<HostContext, DefaultGranHeatError> {
        let pair_style = self
            .pair_style
            .clone()
            .ok_or_else(|| DefaultGranHeatError::from(HeatGranError::NotInitialized))?;
        Ok(HostContext {
            newton_pair,
            pair_style,
        })
    }
}

/// Granular heat-exchange module handle.
///
/// # Thread Safety
/// The module state is protected by an `RwLock`. Passes take the write lock;
/// a host that runs several domains on different threads should create one
/// instance per domain.
pub struct GranHeatInstance {
    pub(crate) state: RwLock<InstanceState>,
}

impl GranHeatInstance {
    pub(crate) fn new(config: HeatExchangeConfig) -> Result<Box<Self>, DefaultGranHeatError> {
        let exchange = GranularHeatExchange::new(config)?;
        Ok(Box::new(Self {
            state: RwLock::new(InstanceState {
                exchange,
                properties: MaterialProperties::new(),
                pair_style: None,
                consumer: None,
            }),
        }))
    }
}

/// Create a heat-exchange instance from a keyword argument list.
///
/// Keywords:
/// ```text
/// contact_area overlap | projection | constant <area>
/// area_correction yes | no
/// store_contact_data yes | no
/// parallel_radiation yes | no
/// ```
///
/// Returns
/// - `GranHeatErrorCode::Ok` with a valid instance in `out_instance`
/// - `GranHeatErrorCode::NullPointer` if `out_instance` or an argument is null
/// - `GranHeatErrorCode::InvalidConfig` for unknown keywords or invalid values
///
/// # Safety
/// - `args` must point to `nargs` NUL-terminated strings (may be null when `nargs == 0`).
/// - `out_instance` must be a valid, non-null pointer to writable memory.
/// - The caller MUST call `granheat_destroy` exactly once on the returned instance.
///
/// Example (C++)
/// ```cpp
/// const char* args[] = {"contact_area", "constant", "1e-4"};
/// GranHeatInstance* heat = nullptr;
/// if (granheat_new(args, 3, &heat) != GranHeatErrorCode::Ok) {
///     fprintf(stderr, "%s\n", granheat_get_last_error());
/// }
/// ```
#[no_mangle]
pub unsafe extern "C" fn granheat_new(
    args: *const *const c_char,
    nargs: usize,
    out_instance: *mut *mut GranHeatInstance,
) -> GranHeatErrorCode {
    if out_instance.is_null() {
        return track_error(&DefaultGranHeatError::null_pointer("out_instance"));
    }

    let result = (|| -> Result<Box<GranHeatInstance>, DefaultGranHeatError> {
        let raw = unsafe { slice_from_ptr(args, nargs, "args")? };
        let keywords = raw
            .iter()
            .map(|&arg| unsafe { str_from_ptr(arg, "args[]") })
            .collect::<Result<Vec<_>, _>>()?;
        let config = HeatExchangeConfig::from_keywords(keywords.as_slice())?;
        GranHeatInstance::new(config)
    })();

    match track_result(result) {
        Ok(instance) => {
            unsafe {
                *out_instance = Box::into_raw(instance);
            }
            GranHeatErrorCode::Ok
        }
        Err(code) => {
            unsafe {
                *out_instance = ptr::null_mut();
            }
            code
        }
    }
}

/// Destroy an instance created by `granheat_new`. Null is a no-op.
///
/// # Safety
/// - The pointer MUST have been created by `granheat_new` and not freed already.
/// - The caller must not use the pointer afterwards.
#[no_mangle]
pub unsafe extern "C" fn granheat_destroy(ptr: *mut GranHeatInstance) {
    if ptr.is_null() {
        return;
    }
    // SAFETY: created by `Box::into_raw` in `granheat_new`.
    unsafe {
        drop(Box::from_raw(ptr));
    }
}

/// Define a per-type scalar property (`thermalConductivity`, `youngsModulus`,
/// `poissonsRatio`, `youngsModulusOriginal`).
///
/// Values are indexed by type starting at type 1. Takes effect at the next
/// `granheat_init`.
///
/// # Safety
/// `name` must be a NUL-terminated string; `values` must point to `ntypes` doubles.
#[no_mangle]
pub unsafe extern "C" fn granheat_set_type_property(
    ptr: *const GranHeatInstance,
    name: *const c_char,
    values: *const f64,
    ntypes: usize,
) -> GranHeatErrorCode {
    track_code((|| -> Result<(), DefaultGranHeatError> {
        let instance = instance_from_ptr(ptr)?;
        let name = unsafe { str_from_ptr(name, "name")? };
        let values = unsafe { slice_from_ptr(values, ntypes, "values")? };
        let mut state = write_state(instance)?;
        state.properties.set(name, values.to_vec());
        debug!(property = name, ntypes, "Set per-type property");
        Ok(())
    })())
}

/// Build the material tables. Call again whenever properties or the pair style change.
///
/// `stress_strain_exponent` is the force/overlap exponent of a granular pair
/// style (1.0 Hooke, 1.5 Hertz). Pass NaN for non-granular styles.
///
/// # Safety
/// `pair_style` must be a NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn granheat_init(
    ptr: *const GranHeatInstance,
    pair_style: *const c_char,
    stress_strain_exponent: f64,
    max_type: usize,
) -> GranHeatErrorCode {
    track_code((|| -> Result<(), DefaultGranHeatError> {
        let instance = instance_from_ptr(ptr)?;
        let name = unsafe { str_from_ptr(pair_style, "pair_style")? };
        let pair_style = if stress_strain_exponent.is_nan() {
            PairStyle::other(name)
        } else {
            PairStyle::granular(name, stress_strain_exponent)
        };

        let mut state = write_state(instance)?;
        let InstanceState {
            exchange,
            properties,
            ..
        } = &mut *state;
        exchange.init(&*properties, &pair_style, max_type)?;
        state.pair_style = Some(pair_style);
        Ok(())
    })())
}
