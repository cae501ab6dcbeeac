//! C-compatible FFI bindings.

use std::ffi::CStr;
use std::os::raw::c_char;
use std::path::Path;

use crate::engine::{
    apply_decay, compute_delta, compute_simple_baseline, compute_weighted_baseline,
    handle_state_transition, tiered_decay, Thresholds,
};
use crate::format::SnapshotReader;
use crate::store::SnapshotStore;
use crate::types::{KsError, StateVector, STATE_COUNT, TOTAL_MASS};

const KS_OK: i32 = 0;
const KS_ERR_IO: i32 = -1;
const KS_ERR_INVALID: i32 = -2;
const KS_ERR_EMPTY: i32 = -3;
const KS_ERR_OVERFLOW: i32 = -4;
const KS_ERR_NULL_PTR: i32 = -5;

fn error_code(err: &KsError) -> i32 {
    match err {
        KsError::InvalidArgument(_) => KS_ERR_INVALID,
        KsError::EmptyInput => KS_ERR_EMPTY,
        _ => KS_ERR_IO,
    }
}

/// Compute the evidence delta of one interaction.
///
/// A NaN `reading_depth` means "not reported" and uses the default depth.
///
/// # Safety
///
/// `out` must be a valid pointer to a writable `double`.
#[no_mangle]
pub unsafe extern "C" fn ks_evidence_delta(
    weight: f64,
    relevance: f64,
    reading_depth: f64,
    out: *mut f64,
) -> i32 {
    std::panic::catch_unwind(|| {
        if out.is_null() {
            return KS_ERR_NULL_PTR;
        }
        let depth = if reading_depth.is_nan() {
            None
        } else {
            Some(reading_depth)
        };
        match compute_delta(weight, relevance, depth) {
            Ok(delta) => {
                unsafe { *out = delta };
                KS_OK
            }
            Err(e) => error_code(&e),
        }
    })
    .unwrap_or(KS_ERR_INVALID)
}

/// Decay evidence at a fixed per-day rate.
///
/// # Safety
///
/// `out` must be a valid pointer to a writable `double`.
#[no_mangle]
pub unsafe extern "C" fn ks_apply_decay(
    evidence: f64,
    elapsed_days: f64,
    rate: f64,
    out: *mut f64,
) -> i32 {
    std::panic::catch_unwind(|| {
        if out.is_null() {
            return KS_ERR_NULL_PTR;
        }
        match apply_decay(evidence, elapsed_days, rate) {
            Ok(value) => {
                unsafe { *out = value };
                KS_OK
            }
            Err(e) => error_code(&e),
        }
    })
    .unwrap_or(KS_ERR_INVALID)
}

/// Decay evidence at the default rate of its current state.
///
/// # Safety
///
/// `out` must be a valid pointer to a writable `double`.
#[no_mangle]
pub unsafe extern "C" fn ks_tiered_decay(
    evidence: f64,
    elapsed_days: f64,
    stale_multiplier: f64,
    out: *mut f64,
) -> i32 {
    std::panic::catch_unwind(|| {
        if out.is_null() {
            return KS_ERR_NULL_PTR;
        }
        match tiered_decay(evidence, elapsed_days, stale_multiplier) {
            Ok(value) => {
                unsafe { *out = value };
                KS_OK
            }
            Err(e) => error_code(&e),
        }
    })
    .unwrap_or(KS_ERR_INVALID)
}

/// Classify evidence with the default thresholds. Returns the state index
/// (0-3), or an error code for negative or NaN evidence.
#[no_mangle]
pub extern "C" fn ks_classify(evidence: f64) -> i32 {
    match Thresholds::default().classify_checked(evidence) {
        Ok(state) => state.index() as i32,
        Err(e) => error_code(&e),
    }
}

/// Move mass in a four-element vector for an evidence change, in place.
/// Returns the new state index, or an error code. Negative or NaN evidence
/// leaves the vector untouched.
///
/// # Safety
///
/// `vector` must point to four contiguous, writable `double`s.
#[no_mangle]
pub unsafe extern "C" fn ks_handle_transition(
    vector: *mut f64,
    old_evidence: f64,
    new_evidence: f64,
) -> i32 {
    std::panic::catch_unwind(|| {
        if vector.is_null() {
            return KS_ERR_NULL_PTR;
        }
        let thresholds = Thresholds::default();
        let new_state = match thresholds
            .classify_checked(old_evidence)
            .and_then(|_| thresholds.classify_checked(new_evidence))
        {
            Ok(state) => state,
            Err(e) => return error_code(&e),
        };
        let slice = unsafe { std::slice::from_raw_parts_mut(vector, STATE_COUNT) };
        let mut values = [0.0; STATE_COUNT];
        values.copy_from_slice(slice);
        let mut state_vector = match StateVector::new(values) {
            Ok(v) if v.is_conserved(TOTAL_MASS) => v,
            _ => return KS_ERR_INVALID,
        };

        handle_state_transition(&mut state_vector, old_evidence, new_evidence, &thresholds);
        slice.copy_from_slice(state_vector.as_array());
        new_state.index() as i32
    })
    .unwrap_or(KS_ERR_INVALID)
}

/// Load a snapshot archive from a .ksnap file. Returns handle or NULL on failure.
///
/// # Safety
///
/// `path` must be a valid, NUL-terminated C string.
#[no_mangle]
pub unsafe extern "C" fn ks_archive_open(path: *const c_char) -> *mut std::ffi::c_void {
    std::panic::catch_unwind(|| {
        if path.is_null() {
            return std::ptr::null_mut();
        }
        let path_str = unsafe { CStr::from_ptr(path) };
        let path_str = match path_str.to_str() {
            Ok(s) => s,
            Err(_) => return std::ptr::null_mut(),
        };
        match SnapshotReader::read_from_file(Path::new(path_str)) {
            Ok(store) => Box::into_raw(Box::new(store)) as *mut std::ffi::c_void,
            Err(_) => std::ptr::null_mut(),
        }
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Free an archive handle.
///
/// # Safety
///
/// `archive` must be NULL or a handle returned by `ks_archive_open` that has
/// not been freed yet.
#[no_mangle]
pub unsafe extern "C" fn ks_archive_free(archive: *mut std::ffi::c_void) {
    if !archive.is_null() {
        let _ = std::panic::catch_unwind(|| unsafe {
            drop(Box::from_raw(archive as *mut SnapshotStore));
        });
    }
}

/// Number of snapshots in an archive.
///
/// # Safety
///
/// `archive` must be NULL or a live handle returned by `ks_archive_open`.
#[no_mangle]
pub unsafe extern "C" fn ks_archive_snapshot_count(archive: *mut std::ffi::c_void) -> u64 {
    std::panic::catch_unwind(|| {
        if archive.is_null() {
            return 0;
        }
        let store = unsafe { &*(archive as *const SnapshotStore) };
        store.len() as u64
    })
    .unwrap_or(0)
}

/// Compute a baseline over every snapshot in an archive and write it as
/// JSON into `buffer`. `alpha <= 0` selects the simple baseline. Returns the
/// JSON length, or an error code (`KS_ERR_OVERFLOW` when the buffer is too small).
///
/// # Safety
///
/// `archive` must be a live handle and `buffer` must be valid for
/// `buffer_len` bytes.
#[no_mangle]
pub unsafe extern "C" fn ks_archive_baseline_json(
    archive: *mut std::ffi::c_void,
    alpha: f64,
    buffer: *mut c_char,
    buffer_len: u32,
) -> i32 {
    std::panic::catch_unwind(|| {
        if archive.is_null() || buffer.is_null() {
            return KS_ERR_NULL_PTR;
        }
        let store = unsafe { &*(archive as *const SnapshotStore) };
        let snapshots: Vec<_> = store.snapshots().into_iter().cloned().collect();
        let result = if alpha <= 0.0 {
            compute_simple_baseline(&snapshots)
        } else {
            compute_weighted_baseline(&snapshots, alpha)
        };
        let result = match result {
            Ok(r) => r,
            Err(e) => return error_code(&e),
        };
        let json = match serde_json::to_vec(&result) {
            Ok(j) => j,
            Err(_) => return KS_ERR_IO,
        };
        if json.len() >= buffer_len as usize {
            return KS_ERR_OVERFLOW;
        }
        unsafe {
            std::ptr::copy_nonoverlapping(json.as_ptr(), buffer as *mut u8, json.len());
            *buffer.add(json.len()) = 0;
        }
        json.len() as i32
    })
    .unwrap_or(KS_ERR_IO)
}
