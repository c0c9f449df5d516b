use std::ffi::{CStr, CString};
use std::ops::Range;
use std::os::raw::{c_char, c_int, c_void};
use std::path::{Path, PathBuf};
use std::ptr;
use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use crate::binding::{EngineBinding, InstanceHandle};
use crate::config::{
    FnMecabDestroy, FnMecabNew, FnMecabSparseToStr3, FnMecabStrError, FnMecabVersion,
    MecabHandle,
};
use crate::discovery::default_library_candidates;
use crate::error::{MecabError, Result};
use crate::locator::Location;

const PROGRAM_NAME: &str = "mecab";

#[derive(Clone, Copy)]
pub(crate) struct MecabApi {
    pub(crate) mecab_new: FnMecabNew,
    pub(crate) mecab_sparse_tostr3: FnMecabSparseToStr3,
    pub(crate) mecab_destroy: FnMecabDestroy,
    pub(crate) mecab_strerror: Option<FnMecabStrError>,
    pub(crate) mecab_version: Option<FnMecabVersion>,
}

impl MecabApi {
    pub(crate) unsafe fn load(library: &DynamicLibrary) -> Result<Self> {
        Ok(Self {
            mecab_new: library.load_symbol("mecab_new")?,
            mecab_sparse_tostr3: library.load_symbol("mecab_sparse_tostr3")?,
            mecab_destroy: library.load_symbol("mecab_destroy")?,
            mecab_strerror: library.load_symbol_optional("mecab_strerror")?,
            mecab_version: library.load_symbol_optional("mecab_version")?,
        })
    }
}

pub(crate) struct LoadedLibrary {
    pub(crate) _library: DynamicLibrary,
    pub(crate) path: PathBuf,
    pub(crate) api: MecabApi,
}

#[derive(Debug)]
pub(crate) struct DynamicLibrary {
    handle: *mut c_void,
}

// SAFETY: the handle is a process-wide loader token; dlsym/GetProcAddress may
// be called from any thread and it is only closed on drop.
unsafe impl Send for DynamicLibrary {}
unsafe impl Sync for DynamicLibrary {}

impl DynamicLibrary {
    pub(crate) fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_string = path.as_ref().to_string_lossy().to_string();
        let path_c = CString::new(path_string.clone())?;
        let handle = unsafe { platform_open(path_c.as_ptr()) };
        if handle.is_null() {
            return Err(MecabError::LibraryLoad(format!(
                "{} ({})",
                path_string,
                platform_last_error()
            )));
        }
        Ok(Self { handle })
    }

    pub(crate) unsafe fn load_symbol<T: Copy>(&self, symbol_name: &str) -> Result<T> {
        let symbol_c = CString::new(symbol_name)?;
        let symbol_ptr = platform_symbol(self.handle, symbol_c.as_ptr());
        if symbol_ptr.is_null() {
            return Err(MecabError::SymbolLoad(format!(
                "{} ({})",
                symbol_name,
                platform_last_error()
            )));
        }
        Ok(std::mem::transmute_copy::<*mut c_void, T>(&symbol_ptr))
    }

    pub(crate) unsafe fn load_symbol_optional<T: Copy>(
        &self,
        symbol_name: &str,
    ) -> Result<Option<T>> {
        let symbol_c = CString::new(symbol_name)?;
        let symbol_ptr = platform_symbol(self.handle, symbol_c.as_ptr());
        if symbol_ptr.is_null() {
            return Ok(None);
        }
        Ok(Some(std::mem::transmute_copy::<*mut c_void, T>(
            &symbol_ptr,
        )))
    }
}

impl Drop for DynamicLibrary {
    fn drop(&mut self) {
        if self.handle.is_null() {
            return;
        }
        unsafe {
            platform_close(self.handle);
        }
        self.handle = ptr::null_mut();
    }
}

/// [`EngineBinding`] over the MeCab C API in a dynamically loaded library.
///
/// The library is opened on the first successful [`EngineBinding::load`] and
/// kept for the life of the binding; later loads of a different path replace
/// it only when no instance is alive.
#[derive(Default)]
pub struct NativeEngine {
    loaded: Mutex<Option<Arc<LoadedLibrary>>>,
    live_instances: Mutex<usize>,
}

impl NativeEngine {
    /// Creates a binding with no library loaded yet.
    pub fn new() -> Self {
        Self::default()
    }

    fn api(&self) -> Option<Arc<LoadedLibrary>> {
        self.loaded
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn open_library(path: &Path) -> Result<LoadedLibrary> {
        let library = DynamicLibrary::open(path)?;
        let api = unsafe { MecabApi::load(&library)? };
        Ok(LoadedLibrary {
            _library: library,
            path: path.to_path_buf(),
            api,
        })
    }

    fn open_with_fallback(path: &Path) -> Result<LoadedLibrary> {
        let mut errors = Vec::new();
        match Self::open_library(path) {
            Ok(loaded) => return Ok(loaded),
            Err(error) => errors.push(error.to_string()),
        }

        for candidate in default_library_candidates() {
            if Path::new(candidate) == path {
                continue;
            }
            match Self::open_library(Path::new(candidate)) {
                Ok(loaded) => return Ok(loaded),
                Err(error) => errors.push(error.to_string()),
            }
        }

        Err(MecabError::LibraryLoad(format!(
            "set MECAB_LIBRARY_PATH to the MeCab shared library. tried: {}",
            errors.join(" | ")
        )))
    }

    fn engine_error(&self, api: &MecabApi, handle: MecabHandle) -> Option<String> {
        let strerror = api.mecab_strerror?;
        let message = cstr_to_string(unsafe { strerror(handle) });
        let message = message.trim();
        if message.is_empty() {
            None
        } else {
            Some(message.to_string())
        }
    }
}

impl EngineBinding for NativeEngine {
    fn load(&self, binary: &Location) -> Result<()> {
        let path = binary.local_path()?;
        let mut guard = self
            .loaded
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(loaded) = guard.as_ref() {
            let live = *self
                .live_instances
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            if loaded.path == path || live > 0 {
                return Ok(());
            }
        }

        let loaded = Self::open_with_fallback(path)?;
        debug!(library = %loaded.path.display(), "loaded mecab library");
        *guard = Some(Arc::new(loaded));
        Ok(())
    }

    fn create(&self, args: &[String]) -> Option<InstanceHandle> {
        let loaded = self.api()?;
        let owned = match std::iter::once(PROGRAM_NAME)
            .chain(args.iter().map(String::as_str))
            .map(CString::new)
            .collect::<std::result::Result<Vec<_>, _>>()
        {
            Ok(owned) => owned,
            Err(error) => {
                warn!(%error, "engine argument contains a NUL byte");
                return None;
            }
        };
        let mut argv: Vec<*mut c_char> = owned
            .iter()
            .map(|arg| arg.as_ptr().cast_mut())
            .collect();
        let argc = c_int::try_from(argv.len()).ok()?;

        // MeCab only reads argv; `owned` outlives the call.
        let handle = unsafe { (loaded.api.mecab_new)(argc, argv.as_mut_ptr()) };
        if handle.is_null() {
            if let Some(message) = self.engine_error(&loaded.api, ptr::null_mut()) {
                warn!(%message, ?args, "mecab_new returned a null handle");
            }
            return None;
        }

        *self
            .live_instances
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) += 1;
        InstanceHandle::new(handle as usize)
    }

    fn analyze(
        &self,
        instance: InstanceHandle,
        input: &CStr,
        input_len: usize,
        output: &mut [u8],
    ) -> Option<Range<usize>> {
        let loaded = self.api()?;
        if output.is_empty() {
            return None;
        }

        let handle = instance.get() as MecabHandle;
        let base = output.as_mut_ptr();
        let result = unsafe {
            (loaded.api.mecab_sparse_tostr3)(
                handle,
                input.as_ptr(),
                input_len,
                base.cast::<c_char>(),
                output.len(),
            )
        };
        if result.is_null() {
            if let Some(message) = self.engine_error(&loaded.api, handle) {
                debug!(%message, "mecab_sparse_tostr3 returned null");
            }
            return None;
        }

        let offset = (result as usize).checked_sub(base as usize)?;
        if offset >= output.len() {
            warn!("mecab_sparse_tostr3 returned a pointer outside the output buffer");
            return None;
        }
        let end = output[offset..]
            .iter()
            .position(|byte| *byte == 0)
            .map_or(output.len(), |len| offset + len);
        Some(offset..end)
    }

    fn destroy(&self, instance: InstanceHandle) -> Result<()> {
        let loaded = self
            .api()
            .ok_or_else(|| MecabError::Engine("no mecab library is loaded".to_string()))?;
        unsafe {
            (loaded.api.mecab_destroy)(instance.get() as MecabHandle);
        }
        let mut live = self
            .live_instances
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *live = live.saturating_sub(1);
        Ok(())
    }

    fn version(&self) -> Option<String> {
        let loaded = self.api()?;
        let version = loaded.api.mecab_version?;
        let pointer = unsafe { version() };
        if pointer.is_null() {
            None
        } else {
            Some(cstr_to_string(pointer))
        }
    }
}

pub(crate) fn cstr_to_string(pointer: *const c_char) -> String {
    if pointer.is_null() {
        return String::new();
    }
    unsafe { CStr::from_ptr(pointer) }
        .to_string_lossy()
        .to_string()
}

#[cfg(target_os = "windows")]
#[link(name = "kernel32")]
extern "system" {
    fn LoadLibraryA(lp_lib_file_name: *const c_char) -> *mut c_void;
    fn GetProcAddress(h_module: *mut c_void, lp_proc_name: *const c_char) -> *mut c_void;
    fn FreeLibrary(h_lib_module: *mut c_void) -> i32;
    fn GetLastError() -> u32;
}

#[cfg(target_os = "windows")]
unsafe fn platform_open(path: *const c_char) -> *mut c_void {
    LoadLibraryA(path)
}

#[cfg(target_os = "windows")]
unsafe fn platform_symbol(handle: *mut c_void, symbol: *const c_char) -> *mut c_void {
    GetProcAddress(handle, symbol)
}

#[cfg(target_os = "windows")]
unsafe fn platform_close(handle: *mut c_void) {
    let _ = FreeLibrary(handle);
}

#[cfg(target_os = "windows")]
fn platform_last_error() -> String {
    format!("GetLastError={}", unsafe { GetLastError() })
}

#[cfg(target_os = "linux")]
#[link(name = "dl")]
extern "C" {
    fn dlopen(filename: *const c_char, flags: std::os::raw::c_int) -> *mut c_void;
    fn dlsym(handle: *mut c_void, symbol: *const c_char) -> *mut c_void;
    fn dlclose(handle: *mut c_void) -> std::os::raw::c_int;
    fn dlerror() -> *const c_char;
}

#[cfg(target_os = "macos")]
extern "C" {
    fn dlopen(filename: *const c_char, flags: std::os::raw::c_int) -> *mut c_void;
    fn dlsym(handle: *mut c_void, symbol: *const c_char) -> *mut c_void;
    fn dlclose(handle: *mut c_void) -> std::os::raw::c_int;
    fn dlerror() -> *const c_char;
}

#[cfg(unix)]
unsafe fn platform_open(path: *const c_char) -> *mut c_void {
    const RTLD_NOW: std::os::raw::c_int = 2;
    const RTLD_LOCAL: std::os::raw::c_int = 0;
    dlopen(path, RTLD_NOW | RTLD_LOCAL)
}

#[cfg(unix)]
unsafe fn platform_symbol(handle: *mut c_void, symbol: *const c_char) -> *mut c_void {
    dlsym(handle, symbol)
}

#[cfg(unix)]
unsafe fn platform_close(handle: *mut c_void) {
    let _ = dlclose(handle);
}

#[cfg(unix)]
fn platform_last_error() -> String {
    let pointer = unsafe { dlerror() };
    if pointer.is_null() {
        "unknown error".to_string()
    } else {
        let full = cstr_to_string(pointer);
        full.split(": tried:").next().unwrap_or(&full).to_string()
    }
}
