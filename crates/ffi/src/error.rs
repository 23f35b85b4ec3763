use std::cell::RefCell;
use std::ffi::CString;
use std::os::raw::c_char;
use std::ptr;

use granheat_core::HeatGranError;

/// Common interface for errors that cross the FFI boundary.
///
/// - `code()` is returned to the caller
/// - `msg()` is kept in thread-local storage for `granheat_get_last_error`
pub(crate) trait GranHeatError {
    fn code(&self) -> GranHeatErrorCode;

    fn msg(&self) -> &str;
}

/// Error raised by the FFI layer itself or converted from the core crate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DefaultGranHeatError {
    code: GranHeatErrorCode,
    msg: String,
}

impl DefaultGranHeatError {
    /// Null pointer passed where non-null required.
    ///
    /// # Arguments
    /// * `param_name` - The parameter that was null (e.g., `"out_instance"`, `"particles"`)
    pub fn null_pointer(param_name: &str) -> Self {
        Self {
            code: GranHeatErrorCode::NullPointer,
            msg: format!("Parameter '{param_name}' cannot be null"),
        }
    }

    /// Internal lock poisoned by a panic on another thread.
    pub fn lock_poisoned(lock_name: &str) -> Self {
        Self {
            code: GranHeatErrorCode::LockPoisoned,
            msg: format!("Lock '{lock_name}' was poisoned by a panic in another thread"),
        }
    }

    /// Argument that is not a pointer problem (bad UTF-8, bad count, ...).
    pub fn invalid_parameter(message: String) -> Self {
        Self {
            code: GranHeatErrorCode::InvalidParameter,
            msg: message,
        }
    }
}

impl From<HeatGranError> for DefaultGranHeatError {
    fn from(error: HeatGranError) -> Self {
        let code = match &error {
            HeatGranError::NonPositiveConstantArea(_)
            | HeatGranError::AreaCorrectionRequiresOverlap
            | HeatGranError::UnknownKeyword(_)
            | HeatGranError::MissingKeywordArgument(_)
            | HeatGranError::InvalidKeywordValue { .. } => GranHeatErrorCode::InvalidConfig,
            HeatGranError::NegativeConductivity { .. }
            | HeatGranError::AreaCorrectionRequiresGranular { .. }
            | HeatGranError::InvalidStressStrainExponent(_)
            | HeatGranError::MissingProperty(_)
            | HeatGranError::PropertyLength { .. } => GranHeatErrorCode::InvalidMaterial,
            HeatGranError::ConsumerAlreadyRegistered | HeatGranError::ConsumerMismatch => {
                GranHeatErrorCode::ConsumerRegistration
            }
            HeatGranError::ConsumerPoisoned => GranHeatErrorCode::LockPoisoned,
            HeatGranError::ParticleTypeOutOfRange { .. }
            | HeatGranError::BufferLength { .. }
            | HeatGranError::NeighborOutOfRange { .. } => GranHeatErrorCode::InvalidBuffers,
            HeatGranError::NotInitialized => GranHeatErrorCode::NotInitialized,
        };
        Self {
            code,
            msg: error.to_string(),
        }
    }
}

impl GranHeatError for DefaultGranHeatError {
    fn code(&self) -> GranHeatErrorCode {
        self.code
    }

    fn msg(&self) -> &str {
        &self.msg
    }
}

/// FFI error codes returned by heat-exchange functions.
/// Follows standard C convention: 0 = success, non-zero = error.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GranHeatErrorCode {
    /// Operation completed successfully.
    Ok = 0,

    /// Invalid pointer: null pointer passed where non-null required.
    NullPointer = 1,

    /// Lock poisoned: internal synchronization primitive was poisoned by a panic.
    LockPoisoned = 2,

    /// Invalid parameter passed to function.
    InvalidParameter = 3,

    /// Keyword arguments or configuration rejected.
    InvalidConfig = 4,

    /// Per-type material properties missing, negative, or incompatible with the pair style.
    InvalidMaterial = 5,

    /// Particle, neighbor, or flux buffers have inconsistent lengths or indices.
    InvalidBuffers = 6,

    /// Pair-local consumer already registered, or not the registered one.
    ConsumerRegistration = 7,

    /// `granheat_init` has not been called.
    NotInitialized = 8,
}

impl From<DefaultGranHeatError> for GranHeatErrorCode {
    fn from(error: DefaultGranHeatError) -> Self {
        error.code
    }
}

thread_local! {
    /// Most recent FFI error on this thread (C string, error code).
    static LAST_ERROR: RefCell<(Option<CString>, GranHeatErrorCode)> =
        const { RefCell::new((None, GranHeatErrorCode::Ok)) };
}

pub(crate) fn with_last_error<F, R>(f: F) -> R
where
    F: FnOnce(&(Option<CString>, GranHeatErrorCode)) -> R,
{
    LAST_ERROR.with_borrow(f)
}

pub(crate) fn with_last_error_mut<F, R>(f: F) -> R
where
    F: FnOnce(&mut (Option<CString>, GranHeatErrorCode)) -> R,
{
    LAST_ERROR.with_borrow_mut(f)
}

/// Retrieve the most recent FFI error message as a null-terminated C string.
///
/// Returns `null` if no error has occurred on this thread.
///
/// # Lifetime
/// The returned pointer is valid until the next FFI call on this thread that
/// sets or clears the error. **DO NOT FREE THIS POINTER.**
///
/// Example:
/// ```cpp
/// GranHeatInstance* heat = nullptr;
/// GranHeatErrorCode err = granheat_new(args, nargs, &heat);
/// if (err != GranHeatErrorCode::Ok) {
///     const char* error = granheat_get_last_error();
///     if (error) {
///         printf("heat exchange setup failed: %s\n", error);
///     }
/// }
/// ```
#[no_mangle]
pub extern "C" fn granheat_get_last_error() -> *const c_char {
    with_last_error(|(cstring, _code)| cstring.as_ref().map_or(ptr::null(), |cs| cs.as_ptr()))
}

/// Retrieve the most recent FFI error code (`Ok` if none).
#[no_mangle]
pub extern "C" fn granheat_get_last_error_code() -> GranHeatErrorCode {
    with_last_error(|(_cstring, code)| *code)
}
