use std::collections::VecDeque;
use std::env;
use std::ffi::{CStr, OsString};
use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, OnceLock};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::binding::{EngineBinding, InstanceHandle};
use crate::error::{MecabError, Result};
use crate::locator::{AssetKind, Location, StaticResourceLocator};

fn env_lock() -> &'static Mutex<()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
}

fn set_env_var(key: &str, value: &str) {
    #[allow(unused_unsafe)]
    unsafe {
        env::set_var(key, value);
    }
}

fn remove_env_var(key: &str) {
    #[allow(unused_unsafe)]
    unsafe {
        env::remove_var(key);
    }
}

/// Runs a closure while holding a global environment lock and applying overrides.
pub(crate) fn with_env_vars<T>(overrides: &[(&str, Option<&str>)], f: impl FnOnce() -> T) -> T {
    let _guard = env_lock()
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    let backups: Vec<(&str, Option<OsString>)> = overrides
        .iter()
        .map(|(key, _)| (*key, env::var_os(key)))
        .collect();

    for (key, value) in overrides {
        match value {
            Some(value) => set_env_var(key, value),
            None => remove_env_var(key),
        }
    }

    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(f));

    for (key, value) in backups.into_iter().rev() {
        match value {
            Some(value) => {
                #[allow(unused_unsafe)]
                unsafe {
                    env::set_var(key, value);
                }
            }
            None => remove_env_var(key),
        }
    }

    match result {
        Ok(result) => result,
        Err(payload) => std::panic::resume_unwind(payload),
    }
}

pub(crate) fn make_temp_dir(name: &str) -> PathBuf {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock should be monotonic")
        .as_nanos();
    let path = env::temp_dir().join(format!("mecab-rs-{name}-{suffix}"));
    fs::create_dir_all(&path).expect("failed to create temp dir");
    path
}

pub(crate) fn remove_tree(path: &Path) {
    let _ = fs::remove_dir_all(path);
}

pub(crate) fn fake_locator() -> StaticResourceLocator {
    StaticResourceLocator::new()
        .with(AssetKind::EngineBinary, Location::local("libmecab-fake.so"))
        .with(AssetKind::DataBlob, Location::local("/fake/dic/ipadic"))
}

type Responder = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Scripted in-memory engine that records every call.
pub(crate) struct ScriptedEngine {
    create_script: Mutex<VecDeque<bool>>,
    responder: Responder,
    analyze_delay: Option<Duration>,
    next_handle: AtomicUsize,
    pub(crate) loads: AtomicUsize,
    pub(crate) creates: AtomicUsize,
    pub(crate) analyzes: AtomicUsize,
    pub(crate) destroys: AtomicUsize,
    pub(crate) in_flight: AtomicUsize,
    pub(crate) max_in_flight: AtomicUsize,
    pub(crate) last_args: Mutex<Option<Vec<String>>>,
    pub(crate) last_call: Mutex<Option<(usize, usize)>>,
}

impl ScriptedEngine {
    /// Engine whose create succeeds and whose output echoes each character
    /// of the input as a nine-field noun line followed by `EOS`.
    pub(crate) fn new() -> Self {
        Self::with_responder(|input| {
            let mut out = String::new();
            for ch in input.chars().filter(|ch| !ch.is_whitespace()) {
                out.push_str(&format!("{ch}\t名詞,一般,*,*,*,*,{ch},{ch},{ch}\n"));
            }
            out.push_str("EOS\n");
            Some(out)
        })
    }

    pub(crate) fn with_responder(
        responder: impl Fn(&str) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        Self {
            create_script: Mutex::new(VecDeque::new()),
            responder: Box::new(responder),
            analyze_delay: None,
            next_handle: AtomicUsize::new(0x1000),
            loads: AtomicUsize::new(0),
            creates: AtomicUsize::new(0),
            analyzes: AtomicUsize::new(0),
            destroys: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            last_args: Mutex::new(None),
            last_call: Mutex::new(None),
        }
    }

    /// Makes the next `count` creates return a null handle.
    pub(crate) fn failing_creates(self, count: usize) -> Self {
        self.create_script
            .lock()
            .expect("script lock")
            .extend(std::iter::repeat(false).take(count));
        self
    }

    pub(crate) fn with_analyze_delay(mut self, delay: Duration) -> Self {
        self.analyze_delay = Some(delay);
        self
    }

    /// Arguments of the most recent create, empty if none ran.
    pub(crate) fn recorded_args(&self) -> Vec<String> {
        self.last_args
            .lock()
            .expect("args lock")
            .clone()
            .unwrap_or_default()
    }

    pub(crate) fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

impl EngineBinding for ScriptedEngine {
    fn load(&self, binary: &Location) -> Result<()> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        binary.local_path().map(|_| ())
    }

    fn create(&self, args: &[String]) -> Option<InstanceHandle> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        *self.last_args.lock().expect("args lock") = Some(args.to_vec());
        let succeed = self
            .create_script
            .lock()
            .expect("script lock")
            .pop_front()
            .unwrap_or(true);
        if !succeed {
            return None;
        }
        InstanceHandle::new(self.next_handle.fetch_add(1, Ordering::SeqCst))
    }

    fn analyze(
        &self,
        _instance: InstanceHandle,
        input: &CStr,
        input_len: usize,
        output: &mut [u8],
    ) -> Option<Range<usize>> {
        self.analyzes.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        *self.last_call.lock().expect("call lock") = Some((input_len, output.len()));
        if let Some(delay) = self.analyze_delay {
            std::thread::sleep(delay);
        }

        let text = input.to_string_lossy();
        let range = (self.responder)(&text).and_then(|response| {
            if output.is_empty() {
                return None;
            }
            let len = response.len().min(output.len() - 1);
            output[..len].copy_from_slice(&response.as_bytes()[..len]);
            output[len] = 0;
            Some(0..len)
        });

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        range
    }

    fn destroy(&self, _instance: InstanceHandle) -> Result<()> {
        self.destroys.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn version(&self) -> Option<String> {
        Some("0.996-scripted".to_string())
    }
}

/// Engine whose destroy always fails, for best-effort teardown paths.
pub(crate) struct StubbornEngine(pub(crate) ScriptedEngine);

impl EngineBinding for StubbornEngine {
    fn load(&self, binary: &Location) -> Result<()> {
        self.0.load(binary)
    }

    fn create(&self, args: &[String]) -> Option<InstanceHandle> {
        self.0.create(args)
    }

    fn analyze(
        &self,
        instance: InstanceHandle,
        input: &CStr,
        input_len: usize,
        output: &mut [u8],
    ) -> Option<Range<usize>> {
        self.0.analyze(instance, input, input_len, output)
    }

    fn destroy(&self, instance: InstanceHandle) -> Result<()> {
        self.0.destroy(instance)?;
        Err(MecabError::Engine("destroy refused".to_string()))
    }
}
