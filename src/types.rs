use std::time::Duration;

use crate::constants::{
    DEFAULT_BYTES_PER_ESTIMATED_TOKEN, DEFAULT_BYTES_PER_TOKEN, DEFAULT_MIN_BUFFER_CAPACITY,
    DEFAULT_MIN_ESTIMATED_TOKENS, DEFAULT_RETRY_DELAY_MS,
};
use crate::decoder::DecoderOptions;
use crate::error::{MecabError, Result};

/// How failed load attempts are retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Fixed delay between a failed attempt and the next one.
    pub delay: Duration,
    /// Attempt ceiling per loader run; `None` retries forever.
    pub max_attempts: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(DEFAULT_RETRY_DELAY_MS),
            max_attempts: None,
        }
    }
}

impl RetryPolicy {
    /// Sets the delay between attempts.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Sets the attempt ceiling; `None` retries forever.
    pub fn with_max_attempts(mut self, max_attempts: Option<u32>) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub(crate) fn allows_another_attempt(&self, attempts: u32) -> bool {
        self.max_attempts.map_or(true, |max| attempts < max)
    }
}

/// Output-buffer sizing for one query.
///
/// `capacity_for(n) = max(min_capacity, max(min_estimated_tokens,
/// ceil(n / bytes_per_estimated_token)) * bytes_per_token)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferPolicy {
    /// Floor for every buffer.
    pub min_capacity: usize,
    /// Bytes reserved per estimated token.
    pub bytes_per_token: usize,
    /// Input bytes assumed per token.
    pub bytes_per_estimated_token: usize,
    /// Floor for the token estimate.
    pub min_estimated_tokens: usize,
}

impl Default for BufferPolicy {
    fn default() -> Self {
        Self {
            min_capacity: DEFAULT_MIN_BUFFER_CAPACITY,
            bytes_per_token: DEFAULT_BYTES_PER_TOKEN,
            bytes_per_estimated_token: DEFAULT_BYTES_PER_ESTIMATED_TOKEN,
            min_estimated_tokens: DEFAULT_MIN_ESTIMATED_TOKENS,
        }
    }
}

impl BufferPolicy {
    /// Sets the capacity floor.
    pub fn with_min_capacity(mut self, min_capacity: usize) -> Self {
        self.min_capacity = min_capacity;
        self
    }

    /// Sets the bytes reserved per estimated token.
    pub fn with_bytes_per_token(mut self, bytes_per_token: usize) -> Self {
        self.bytes_per_token = bytes_per_token;
        self
    }

    /// Buffer capacity for an input of `byte_len` encoded bytes.
    pub fn capacity_for(&self, byte_len: usize) -> usize {
        let per_token = self.bytes_per_estimated_token.max(1);
        let estimated_tokens =
            (byte_len / per_token + usize::from(byte_len % per_token != 0))
                .max(self.min_estimated_tokens);
        estimated_tokens
            .saturating_mul(self.bytes_per_token)
            .max(self.min_capacity)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.min_capacity == 0 || self.bytes_per_token == 0 {
            return Err(MecabError::InvalidArgument(
                "BufferPolicy.min_capacity and bytes_per_token must be >= 1".to_string(),
            ));
        }
        if self.bytes_per_estimated_token == 0 {
            return Err(MecabError::InvalidArgument(
                "BufferPolicy.bytes_per_estimated_token must be >= 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Full client configuration.
#[derive(Debug, Clone, Default)]
pub struct MecabConfig {
    /// Base argument text for instance creation, split on whitespace.
    /// Dictionary flags resolved by the locator are appended as whole
    /// arguments, so their paths may contain spaces.
    pub create_args: String,
    /// Load retry behavior.
    pub retry: RetryPolicy,
    /// Output-buffer sizing.
    pub buffer: BufferPolicy,
    /// Output decoding options.
    pub decoder: DecoderOptions,
}

impl MecabConfig {
    /// Sets the base create arguments.
    pub fn with_create_args(mut self, create_args: impl Into<String>) -> Self {
        self.create_args = create_args.into();
        self
    }

    /// Replaces the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Sets only the retry delay.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry.delay = delay;
        self
    }

    /// Bounds load attempts per loader run.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.retry.max_attempts = Some(max_attempts);
        self
    }

    /// Replaces the buffer policy.
    pub fn with_buffer(mut self, buffer: BufferPolicy) -> Self {
        self.buffer = buffer;
        self
    }

    /// Replaces the decoder options.
    pub fn with_decoder(mut self, decoder: DecoderOptions) -> Self {
        self.decoder = decoder;
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.retry.max_attempts == Some(0) {
            return Err(MecabError::InvalidArgument(
                "RetryPolicy.max_attempts must be >= 1 when set".to_string(),
            ));
        }
        self.buffer.validate()
    }
}
