use std::ffi::CStr;
use std::fmt;
use std::num::NonZeroUsize;
use std::ops::Range;

use crate::error::Result;
use crate::locator::Location;

/// Opaque reference to one engine instance.
///
/// Never null: a binding reports a failed create as `None` instead.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstanceHandle(NonZeroUsize);

impl InstanceHandle {
    /// Wraps a raw handle value, rejecting zero.
    pub fn new(raw: usize) -> Option<Self> {
        NonZeroUsize::new(raw).map(Self)
    }

    /// Raw value as handed out by the engine.
    pub fn get(self) -> usize {
        self.0.get()
    }
}

impl fmt::Debug for InstanceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InstanceHandle({:#x})", self.0.get())
    }
}

/// Narrow foreign-call contract around the analyzer engine.
///
/// Implementations are not required to support concurrent `analyze` calls
/// on one instance; callers serialize access.
pub trait EngineBinding: Send + Sync {
    /// Makes the engine binary at `binary` callable. Runs on every load attempt.
    fn load(&self, binary: &Location) -> Result<()>;

    /// Creates an instance from engine arguments, one element per argument
    /// (program name excluded). `None` means the engine returned a null
    /// handle.
    fn create(&self, args: &[String]) -> Option<InstanceHandle>;

    /// Analyzes `input` into `output`.
    ///
    /// `input_len` is the encoded length including the terminating NUL.
    /// Returns the byte range of the result text inside `output`, or `None`
    /// when the engine reported no result.
    fn analyze(
        &self,
        instance: InstanceHandle,
        input: &CStr,
        input_len: usize,
        output: &mut [u8],
    ) -> Option<Range<usize>>;

    /// Releases an instance. Failures are reported but never fatal.
    fn destroy(&self, instance: InstanceHandle) -> Result<()>;

    /// Engine version string, when the binding can report one.
    fn version(&self) -> Option<String> {
        None
    }
}

/// Assets resolved for one load attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineAssets {
    /// Engine binary (shared library).
    pub binary: Location,
    /// System dictionary / model directory.
    pub data: Option<Location>,
    /// Additional user dictionary.
    pub user_dictionary: Option<Location>,
}

impl EngineAssets {
    /// Builds the argument vector handed to [`EngineBinding::create`].
    ///
    /// `base_args` is split on whitespace; dictionary paths are appended as
    /// single elements so paths containing spaces survive. Dictionary
    /// locations must be local paths.
    pub fn create_args(&self, base_args: &str) -> Result<Vec<String>> {
        let mut args: Vec<String> = base_args.split_whitespace().map(str::to_string).collect();
        if let Some(data) = &self.data {
            push_arg(&mut args, "-d", data)?;
        }
        if let Some(user_dictionary) = &self.user_dictionary {
            push_arg(&mut args, "-u", user_dictionary)?;
        }
        Ok(args)
    }
}

fn push_arg(args: &mut Vec<String>, flag: &str, location: &Location) -> Result<()> {
    let path = location.local_path()?;
    args.push(flag.to_string());
    args.push(path.to_string_lossy().into_owned());
    Ok(())
}
