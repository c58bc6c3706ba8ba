//! C ABI for hosts that drive the solver from another runtime.
//!
//! A solver lives behind an opaque pointer obtained from [`lbm_create`] and
//! released with [`lbm_destroy`]. Fields are copied out row-major.

use std::ptr;

use libc::{c_double, c_int, size_t};
use log::error;
use ndarray::Array2;

use crate::boundary::BoundaryRegime;
use crate::solver::Solver;
use crate::FloatNum;

/// Opaque handle handed across the C boundary.
pub struct LbmHandle {
    solver: Solver,
}

impl<'a> LbmHandle {
    fn to_ptr(self) -> *mut LbmHandle {
        Box::into_raw(Box::new(self))
    }

    /// # Safety
    /// `ptr` must be null or come from [`LbmHandle::to_ptr`] and still be alive.
    unsafe fn from_ptr(ptr: *mut LbmHandle) -> Option<&'a mut LbmHandle> {
        ptr.as_mut()
    }
}

fn regime_from_code(code: c_int) -> Option<BoundaryRegime> {
    match code {
        0 => Some(BoundaryRegime::BounceBack),
        1 => Some(BoundaryRegime::Constant),
        2 => Some(BoundaryRegime::Custom),
        _ => None,
    }
}

/// Creates a solver with the default wall. `regime` is 0 (bounce-back),
/// 1 (constant) or 2 (custom). Returns false and writes null on failure.
///
/// # Safety
/// `out` must be valid for a pointer write.
#[no_mangle]
pub unsafe extern "C" fn lbm_create(
    height: size_t,
    width: size_t,
    tau: c_double,
    regime: c_int,
    out: *mut *mut LbmHandle,
) -> bool {
    if out.is_null() {
        return false;
    }
    let regime = match regime_from_code(regime) {
        Some(r) => r,
        None => {
            error!("Error when initializing LBM simulation: unknown regime code {}", regime);
            *out = ptr::null_mut();
            return false;
        }
    };
    match Solver::new(height, width, tau as FloatNum, regime) {
        Ok(solver) => {
            *out = LbmHandle { solver }.to_ptr();
            true
        }
        Err(e) => {
            error!("Error when initializing LBM simulation: {}", e);
            *out = ptr::null_mut();
            false
        }
    }
}

/// Advances one tick. Returns 0 when clean, 1 when the tick reported
/// instabilities, -1 on a fatal error or null handle.
///
/// # Safety
/// `ptr` must be null or a live handle from [`lbm_create`].
#[no_mangle]
pub unsafe extern "C" fn lbm_step(ptr: *mut LbmHandle) -> c_int {
    match LbmHandle::from_ptr(ptr) {
        Some(handle) => match handle.solver.step() {
            Ok(report) if report.is_stable() => 0,
            Ok(_) => 1,
            Err(e) => {
                error!("LBM step failed: {}", e);
                -1
            }
        },
        None => -1,
    }
}

unsafe fn copy_field(field: &Array2<FloatNum>, dst: *mut c_double, len: size_t) -> size_t {
    let n = field.len();
    if dst.is_null() || len < n {
        return 0;
    }
    let out = std::slice::from_raw_parts_mut(dst, n);
    for (o, v) in out.iter_mut().zip(field.iter()) {
        *o = *v as c_double;
    }
    n
}

/// Copies the density field into `dst`. Returns the number of values
/// written, 0 if `len` is too small.
///
/// # Safety
/// `ptr` must be null or a live handle; `dst` must be valid for `len` writes.
#[no_mangle]
pub unsafe extern "C" fn lbm_copy_density(ptr: *mut LbmHandle, dst: *mut c_double, len: size_t) -> size_t {
    match LbmHandle::from_ptr(ptr) {
        Some(handle) => copy_field(handle.solver.density(), dst, len),
        None => 0,
    }
}

/// # Safety
/// Same contract as [`lbm_copy_density`].
#[no_mangle]
pub unsafe extern "C" fn lbm_copy_velocity_x(ptr: *mut LbmHandle, dst: *mut c_double, len: size_t) -> size_t {
    match LbmHandle::from_ptr(ptr) {
        Some(handle) => copy_field(handle.solver.velocity_x(), dst, len),
        None => 0,
    }
}

/// # Safety
/// Same contract as [`lbm_copy_density`].
#[no_mangle]
pub unsafe extern "C" fn lbm_copy_velocity_y(ptr: *mut LbmHandle, dst: *mut c_double, len: size_t) -> size_t {
    match LbmHandle::from_ptr(ptr) {
        Some(handle) => copy_field(handle.solver.velocity_y(), dst, len),
        None => 0,
    }
}

/// # Safety
/// `ptr` must be null or a live handle.
#[no_mangle]
pub unsafe extern "C" fn lbm_advect_particles(ptr: *mut LbmHandle, scale: c_double) {
    if let Some(handle) = LbmHandle::from_ptr(ptr) {
        handle.solver.advect_particles(scale as FloatNum);
    }
}

/// # Safety
/// `ptr` must be null or a handle from [`lbm_create`] not yet destroyed.
#[no_mangle]
pub unsafe extern "C" fn lbm_destroy(ptr: *mut LbmHandle) {
    if !ptr.is_null() {
        drop(Box::from_raw(ptr));
    }
}
