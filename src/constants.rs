//! Constants describing MeCab's output format and client defaults.

/// Number of comma-separated feature slots in one MeCab output line.
pub const FEATURE_COUNT: usize = 9;

/// Value stored in a feature slot the engine did not emit.
pub const UNKNOWN_FEATURE: &str = "unknown";

/// Part of speech given to tokens synthesized for unsegmented foreign words.
pub const FOREIGN_PART_OF_SPEECH: &str = "foreign";

/// Separator between the surface form and the feature list.
pub const SURFACE_DELIMITER: char = '\t';

/// Separator between individual features.
pub const FEATURE_DELIMITER: char = ',';

/// End-of-sentence line emitted by MeCab's default output format.
pub const END_OF_SENTENCE_MARKER: &str = "EOS";

/// Default pattern for lines classified as foreign words.
pub const DEFAULT_FOREIGN_PATTERN: &str = "^[A-Za-z]+$";

/// Default delay between failed load attempts, in milliseconds.
pub const DEFAULT_RETRY_DELAY_MS: u64 = 20_000;

/// Smallest output buffer ever handed to the engine.
pub const DEFAULT_MIN_BUFFER_CAPACITY: usize = 4096;

/// Output bytes reserved per estimated token.
pub const DEFAULT_BYTES_PER_TOKEN: usize = 512;

/// Input bytes assumed to make up one token when estimating.
pub const DEFAULT_BYTES_PER_ESTIMATED_TOKEN: usize = 3;

/// Lower bound for the estimated token count.
pub const DEFAULT_MIN_ESTIMATED_TOKENS: usize = 10;

pub(crate) const LIFECYCLE_EVENT_CAPACITY: usize = 32;
