use std::os::raw::{c_char, c_int, c_void};

pub(crate) type MecabHandle = *mut c_void;

pub(crate) type FnMecabNew = unsafe extern "C" fn(c_int, *mut *mut c_char) -> MecabHandle;
pub(crate) type FnMecabSparseToStr3 =
    unsafe extern "C" fn(MecabHandle, *const c_char, usize, *mut c_char, usize) -> *const c_char;
pub(crate) type FnMecabDestroy = unsafe extern "C" fn(MecabHandle);
pub(crate) type FnMecabStrError = unsafe extern "C" fn(MecabHandle) -> *const c_char;
pub(crate) type FnMecabVersion = unsafe extern "C" fn() -> *const c_char;
