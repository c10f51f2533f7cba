//! Background batch collector.
//!
//! Loop: wait for the first item, greedily take whatever else is already queued
//! (up to `batch_size`, without waiting per item), analyze the batch, publish the
//! result. Results leave in batch-formation order, which is enqueue order across
//! all producers.
//!
//! Publishing only waits on the consumer once the result stream has been taken.
//! Until then reports fill the result buffer and any overflow is discarded, so
//! draining never depends on someone reading results.
//!
//! The loop ends when the queue is completed and drained, or when the shutdown
//! token fires. On shutdown any items still queued are dropped and counted in
//! the log; that is the documented behaviour of teardown, not a failure.

use crate::analysis::{AnalysisError, AnalysisResult, Item, SequenceAnalyzer, Window};
use crate::cancel::CancelToken;
use crate::streaming::queue::QueueReceiver;
use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};

/// One analyzed batch, positioned within the overall stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchAnalysis {
    /// Zero-based index of the batch in formation order
    pub batch_index: u64,
    /// Stream position of the batch's first item
    pub stream_offset: u64,
    /// Number of items in the batch
    pub batch_len: usize,
    /// Analysis of the batch; windows are relative to the batch
    pub result: AnalysisResult,
}

impl BatchAnalysis {
    /// Translate a batch-relative window into stream positions.
    #[must_use]
    pub fn absolute(&self, window: Window) -> Range<u64> {
        let start = self.stream_offset + window.start as u64;
        start..start + window.len as u64
    }
}

pub(crate) struct BatchCollector<T: Item> {
    pub(crate) receiver: QueueReceiver<T>,
    pub(crate) analyzer: Arc<SequenceAnalyzer<T>>,
    pub(crate) batch_size: usize,
    pub(crate) results: mpsc::Sender<BatchAnalysis>,
    /// Set once the result stream has been handed to a consumer
    pub(crate) consumer_attached: Arc<AtomicBool>,
    pub(crate) shutdown: CancelToken,
}

impl<T: Item> BatchCollector<T> {
    pub(crate) async fn run(mut self) {
        let mut batch = self.analyzer.pool().rent(self.batch_size);
        let mut carried: Option<T> = None;
        let mut batch_index = 0u64;
        let mut stream_offset = 0u64;
        let mut unclaimed = 0u64;
        let mut consumer_gone = false;

        loop {
            let first = if let Some(item) = carried.take() {
                item
            } else {
                tokio::select! {
                    biased;
                    () = self.shutdown.cancelled() => break,
                    item = self.receiver.recv() => match item {
                        Some(item) => item,
                        None => break,
                    },
                }
            };

            batch.clear();
            let mut next = Some(first);
            while let Some(item) = next.take() {
                if let Err(rejected) = batch.try_push(item) {
                    carried = Some(rejected);
                    break;
                }
                if batch.len() < self.batch_size {
                    next = self.receiver.try_recv();
                }
            }

            debug!(batch_index, len = batch.len(), "batch formed");

            let result = match self.analyzer.analyze(batch.as_slice(), &self.shutdown).await {
                Ok(result) => result,
                Err(AnalysisError::Cancelled | AnalysisError::Disposed) => break,
            };

            let report = BatchAnalysis {
                batch_index,
                stream_offset,
                batch_len: batch.len(),
                result,
            };
            batch_index += 1;
            stream_offset += batch.len() as u64;

            if consumer_gone {
                continue;
            }

            // Without a consumer, reports buffer up to the channel bound and the
            // rest are discarded; intake must never wait on a stream nobody holds.
            if !self.consumer_attached.load(Ordering::Acquire) {
                match self.results.try_send(report) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => unclaimed += 1,
                    Err(TrySendError::Closed(_)) => consumer_gone = true,
                }
                continue;
            }

            let sent = tokio::select! {
                biased;
                () = self.shutdown.cancelled() => break,
                sent = self.results.send(report) => sent,
            };
            if sent.is_err() {
                warn!(batch_index, "result consumer dropped; analyzing remaining batches without publishing");
                consumer_gone = true;
            }
        }

        let dropped = self.receiver.depth() + usize::from(carried.is_some());
        if dropped > 0 {
            debug!(dropped, "collector stopped with items still queued");
        }
        if unclaimed > 0 {
            debug!(unclaimed, "reports discarded while no consumer held the result stream");
        }
        debug!(batches = batch_index, items = stream_offset, "collector finished");
    }
}
