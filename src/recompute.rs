//! Bin statistics recomputation
//!
//! Rebuilds a bin's summary from its full sounding chain:
//! - filtered statistics over valid soundings (not invalidated, not deleted)
//! - unfiltered statistics over every sounding that is not deleted
//! - sample standard deviation of the valid depths
//! - `DATA` set when at least one valid sounding exists
//! - bits in the propagation mask ORed up from the valid soundings

use crate::record::{BinRecord, DepthRecord, Validity};

/// New summary for `bin` computed from `soundings`.
///
/// Chain fields (count, head, tail) and bin attributes are carried over.
/// Validity bits outside `mask` and `DATA` are left as they were.
pub fn recompute(bin: &BinRecord, soundings: &[DepthRecord], mask: Validity, null_depth: f32) -> BinRecord {
    let mut out = bin.clone();

    let mut filtered = Accumulator::default();
    let mut unfiltered = Accumulator::default();
    let mut propagated = Validity::empty();

    for sounding in soundings {
        if sounding.validity.contains(Validity::DELETED) {
            continue;
        }
        let depth = sounding.xyz.z;
        unfiltered.add(depth);
        if sounding.validity.is_valid() {
            filtered.add(depth);
            propagated |= sounding.validity & mask;
        }
    }

    match filtered.summary() {
        Some(s) => {
            out.avg_filtered_depth = s.mean as f32;
            out.min_filtered_depth = s.min as f32;
            out.max_filtered_depth = s.max as f32;
            out.standard_dev = s.std_dev as f32;
        }
        None => {
            out.avg_filtered_depth = null_depth;
            out.min_filtered_depth = null_depth;
            out.max_filtered_depth = null_depth;
            out.standard_dev = 0.0;
        }
    }

    match unfiltered.summary() {
        Some(s) => {
            out.avg_depth = s.mean as f32;
            out.min_depth = s.min as f32;
            out.max_depth = s.max as f32;
        }
        None => {
            out.avg_depth = null_depth;
            out.min_depth = null_depth;
            out.max_depth = null_depth;
        }
    }

    let keep = !(mask | Validity::DATA);
    out.validity = (bin.validity & keep) | propagated;
    out.validity.set(Validity::DATA, filtered.count > 0);
    out
}

#[derive(Debug, Default)]
struct Accumulator {
    count: usize,
    sum: f64,
    sum_sq: f64,
    min: f64,
    max: f64,
}

struct Summary {
    mean: f64,
    min: f64,
    max: f64,
    std_dev: f64,
}

impl Accumulator {
    fn add(&mut self, value: f64) {
        if self.count == 0 {
            self.min = value;
            self.max = value;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
        }
        self.count += 1;
        self.sum += value;
        self.sum_sq += value * value;
    }

    fn summary(&self) -> Option<Summary> {
        if self.count == 0 {
            return None;
        }
        let n = self.count as f64;
        let mean = self.sum / n;
        let std_dev = if self.count > 1 {
            ((self.sum_sq - n * mean * mean) / (n - 1.0)).max(0.0).sqrt()
        } else {
            0.0
        };
        Some(Summary {
            mean,
            min: self.min,
            max: self.max,
            std_dev,
        })
    }
}
