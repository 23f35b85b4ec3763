use std::ffi::{c_char, CStr, CString};
use std::sync::{RwLockReadGuard, RwLockWriteGuard};

use crate::error::{with_last_error_mut, DefaultGranHeatError, GranHeatError, GranHeatErrorCode};
use crate::instance::{GranHeatInstance, InstanceState};

/// Set the thread-local error message and code.
pub(crate) fn set_last_error(error: &impl GranHeatError) {
    with_last_error_mut(|(cstring, code)| {
        *cstring = CString::new(error.msg()).ok();
        *code = error.code();
    });
}

/// Record `error` and return its code.
#[inline]
pub(crate) fn track_error(error: &impl GranHeatError) -> GranHeatErrorCode {
    set_last_error(error);
    error.code()
}

/// Clear the thread-local error message and code.
pub(crate) fn clear_last_error() {
    with_last_error_mut(|(cstring, code)| {
        *cstring = None;
        *code = GranHeatErrorCode::Ok;
    });
}

/// Record the outcome of an FFI call: clear on success, store on failure.
pub(crate) fn track_result<T>(
    result: Result<T, DefaultGranHeatError>,
) -> Result<T, GranHeatErrorCode> {
    match result {
        Ok(value) => {
            clear_last_error();
            Ok(value)
        }
        Err(error) => Err(track_error(&error)),
    }
}

/// Collapse a unit result into the returned code.
pub(crate) fn track_code(result: Result<(), DefaultGranHeatError>) -> GranHeatErrorCode {
    match track_result(result) {
        Ok(()) => GranHeatErrorCode::Ok,
        Err(code) => code,
    }
}

pub(crate) fn instance_from_ptr<'a>(
    ptr: *const GranHeatInstance,
) -> Result<&'a GranHeatInstance, DefaultGranHeatError> {
    // SAFETY: callers pass pointers obtained from `granheat_new`; null is rejected.
    unsafe { ptr.as_ref() }.ok_or_else(|| DefaultGranHeatError::null_pointer("instance"))
}

pub(crate) fn read_state(
    instance: &GranHeatInstance,
) -> Result<RwLockReadGuard<'_, InstanceState>, DefaultGranHeatError> {
    instance
        .state
        .read()
        .map_err(|_| DefaultGranHeatError::lock_poisoned("RwLock"))
}

pub(crate) fn write_state(
    instance: &GranHeatInstance,
) -> Result<RwLockWriteGuard<'_, InstanceState>, DefaultGranHeatError> {
    instance
        .state
        .write()
        .map_err(|_| DefaultGranHeatError::lock_poisoned("RwLock"))
}

/// Borrow a C string as UTF-8.
///
/// # Safety
/// `ptr` must be null or point to a NUL-terminated string that outlives `'a`.
pub(crate) unsafe fn str_from_ptr<'a>(
    ptr: *const c_char,
    param_name: &str,
) -> Result<&'a str, DefaultGranHeatError> {
    if ptr.is_null() {
        return Err(DefaultGranHeatError::null_pointer(param_name));
    }
    unsafe { CStr::from_ptr(ptr) }.to_str().map_err(|_| {
        DefaultGranHeatError::invalid_parameter(format!(
            "Parameter '{param_name}' is not valid UTF-8"
        ))
    })
}

/// Borrow `len` elements. A zero length accepts a null pointer.
///
/// # Safety
/// A non-null `ptr` must point to `len` initialised elements valid for `'a`.
pub(crate) unsafe fn slice_from_ptr<'a, T>(
    ptr: *const T,
    len: usize,
    param_name: &str,
) -> Result<&'a [T], DefaultGranHeatError> {
    if len == 0 {
        return Ok(&[]);
    }
    if ptr.is_null() {
        return Err(DefaultGranHeatError::null_pointer(param_name));
    }
    Ok(unsafe { std::slice::from_raw_parts(ptr, len) })
}

/// Mutable counterpart of [`slice_from_ptr`].
///
/// # Safety
/// A non-null `ptr` must point to `len` initialised elements, valid and
/// unaliased for `'a`.
pub(crate) unsafe fn slice_from_ptr_mut<'a, T>(
    ptr: *mut T,
    len: usize,
    param_name: &str,
) -> Result<&'a mut [T], DefaultGranHeatError> {
    if len == 0 {
        return Ok(&mut []);
    }
    if ptr.is_null() {
        return Err(DefaultGranHeatError::null_pointer(param_name));
    }
    Ok(unsafe { std::slice::from_raw_parts_mut(ptr, len) })
}
