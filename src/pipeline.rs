//! One end-to-end analysis call: size a buffer, call the engine, decode.

use std::ffi::CString;
use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::decoder::OutputDecoder;
use crate::error::{MecabError, Result};
use crate::lifecycle::EngineLifecycle;
use crate::model::QueryResult;
use crate::types::BufferPolicy;

/// Zero-initialized output buffer owned by a single query.
///
/// Released on every exit path of [`QueryPipeline::analyze`].
pub(crate) struct OutputBuffer {
    bytes: Vec<u8>,
}

impl OutputBuffer {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            bytes: vec![0; capacity],
        }
    }

    pub(crate) fn capacity(&self) -> usize {
        self.bytes.len()
    }

    pub(crate) fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    pub(crate) fn as_slice(&self) -> &[u8] {
        &self.bytes
    }
}

impl Drop for OutputBuffer {
    fn drop(&mut self) {
        trace!(capacity = self.bytes.len(), "output buffer released");
    }
}

/// Runs queries against the lifecycle's engine instance.
pub struct QueryPipeline {
    lifecycle: Arc<EngineLifecycle>,
    buffer: BufferPolicy,
    decoder: OutputDecoder,
}

impl QueryPipeline {
    /// Creates a pipeline over a shared lifecycle.
    pub fn new(
        lifecycle: Arc<EngineLifecycle>,
        buffer: BufferPolicy,
        decoder: OutputDecoder,
    ) -> Self {
        Self {
            lifecycle,
            buffer,
            decoder,
        }
    }

    /// Analyzes `text`.
    ///
    /// Fails with [`MecabError::NotReady`] without touching the engine unless
    /// the lifecycle is [`EngineState::Ready`](crate::EngineState::Ready),
    /// and with [`MecabError::NulByte`] when `text` cannot cross the C
    /// boundary. An empty or null engine result resolves
    /// to the whole input marked unrecognized.
    ///
    /// Calls are serialized in FIFO order; the engine lock is held for the
    /// duration of the foreign call.
    pub async fn analyze(&self, text: &str) -> Result<QueryResult> {
        let input = CString::new(text)?;
        let input_len = input.as_bytes_with_nul().len();

        let guard = self.lifecycle.lock_instance().await;
        let Some(instance) = guard.instance() else {
            return Err(MecabError::NotReady);
        };

        let mut buffer = OutputBuffer::with_capacity(self.buffer.capacity_for(text.len()));
        debug!(
            input_bytes = input_len,
            capacity = buffer.capacity(),
            "analyzing text"
        );
        let range = guard
            .binding()
            .analyze(instance, &input, input_len, buffer.as_mut_slice());
        drop(guard);

        let Some(range) = range.filter(|range| !range.is_empty()) else {
            warn!(input_bytes = input_len, "engine returned no output");
            return Ok(QueryResult::unrecognized_input(text));
        };
        let Some(bytes) = buffer.as_slice().get(range.clone()) else {
            warn!(
                start = range.start,
                end = range.end,
                capacity = buffer.capacity(),
                "engine result lies outside the output buffer"
            );
            return Ok(QueryResult::unrecognized_input(text));
        };
        if range.end + 1 >= buffer.capacity() {
            warn!(
                capacity = buffer.capacity(),
                result_bytes = bytes.len(),
                "engine output reached the end of the buffer and may be truncated"
            );
        }

        Ok(self.decoder.decode(&String::from_utf8_lossy(bytes)))
    }
}
