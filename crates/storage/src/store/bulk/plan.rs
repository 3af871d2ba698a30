#![forbid(unsafe_code)]

use std::collections::VecDeque;

/// One contiguous slice `[start, start + len)` of a job's row offsets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) struct BatchRange {
    pub index: usize,
    pub start: usize,
    pub len: usize,
}

pub(super) fn plan_batches(count: usize, batch_size: usize) -> VecDeque<BatchRange> {
    let batch_size = batch_size.max(1);
    let mut out = VecDeque::with_capacity(count.div_ceil(batch_size));
    let mut start = 0usize;
    while start < count {
        let len = batch_size.min(count - start);
        out.push_back(BatchRange {
            index: out.len(),
            start,
            len,
        });
        start += len;
    }
    out
}
