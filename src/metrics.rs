//! Operation counters and intermediate-value traces
//!
//! Each sign or verify call returns its own [`Diagnostics`]. Engines also
//! keep a cumulative [`Metrics`] store built on atomics, so an engine can be
//! shared between threads.

use crate::elliptic_curve::Point;
use num_bigint::BigUint;
use serde::Serialize;
use serde::ser::{SerializeMap, Serializer};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Hash invocations per successful sign call, for both engines
pub const HASH_OPS_PER_SIGN: u64 = 1;

/// A counted primitive operation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpKind {
    Exponentiation,
    Multiplication,
    Inversion,
    Hash,
    PointMultiplication,
    PointAddition,
    /// A degenerate attempt thrown away by a retry loop
    Resample,
}

impl OpKind {
    pub const ALL: [OpKind; 7] = [
        OpKind::Exponentiation,
        OpKind::Multiplication,
        OpKind::Inversion,
        OpKind::Hash,
        OpKind::PointMultiplication,
        OpKind::PointAddition,
        OpKind::Resample,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

/// Counters for one call, or a snapshot of cumulative metrics
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct OpCounts {
    pub exponentiations: u64,
    pub multiplications: u64,
    pub inversions: u64,
    pub hashes: u64,
    pub point_multiplications: u64,
    pub point_additions: u64,
    pub resamples: u64,
}

impl OpCounts {
    pub fn get(&self, kind: OpKind) -> u64 {
        match kind {
            OpKind::Exponentiation => self.exponentiations,
            OpKind::Multiplication => self.multiplications,
            OpKind::Inversion => self.inversions,
            OpKind::Hash => self.hashes,
            OpKind::PointMultiplication => self.point_multiplications,
            OpKind::PointAddition => self.point_additions,
            OpKind::Resample => self.resamples,
        }
    }

    fn slot(&mut self, kind: OpKind) -> &mut u64 {
        match kind {
            OpKind::Exponentiation => &mut self.exponentiations,
            OpKind::Multiplication => &mut self.multiplications,
            OpKind::Inversion => &mut self.inversions,
            OpKind::Hash => &mut self.hashes,
            OpKind::PointMultiplication => &mut self.point_multiplications,
            OpKind::PointAddition => &mut self.point_additions,
            OpKind::Resample => &mut self.resamples,
        }
    }

    pub fn add(&mut self, kind: OpKind, n: u64) {
        *self.slot(kind) += n;
    }

    pub fn total(&self) -> u64 {
        OpKind::ALL.iter().map(|&k| self.get(k)).sum()
    }
}

/// Cumulative per-engine counters
///
/// Starts at zero for every new engine; only [`Metrics::reset`] lowers it.
#[derive(Debug, Default)]
pub struct Metrics {
    counters: [AtomicU64; 7],
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one call's counts into the totals
    pub fn record(&self, ops: &OpCounts) {
        for kind in OpKind::ALL {
            let n = ops.get(kind);
            if n > 0 {
                self.counters[kind.index()].fetch_add(n, Ordering::Relaxed);
            }
        }
    }

    pub fn snapshot(&self) -> OpCounts {
        let mut counts = OpCounts::default();
        for kind in OpKind::ALL {
            counts.add(kind, self.counters[kind.index()].load(Ordering::Relaxed));
        }
        counts
    }

    pub fn reset(&self) {
        for counter in &self.counters {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

/// A recorded intermediate value
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TraceValue {
    Scalar(BigUint),
    Point(Point),
    Flag(bool),
}

impl fmt::Display for TraceValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraceValue::Scalar(v) => write!(f, "{v}"),
            TraceValue::Point(p) => write!(f, "{p}"),
            TraceValue::Flag(b) => write!(f, "{b}"),
        }
    }
}

impl Serialize for TraceValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            TraceValue::Flag(b) => serializer.serialize_bool(*b),
            other => serializer.serialize_str(&other.to_string()),
        }
    }
}

impl From<BigUint> for TraceValue {
    fn from(v: BigUint) -> Self {
        TraceValue::Scalar(v)
    }
}

impl From<&BigUint> for TraceValue {
    fn from(v: &BigUint) -> Self {
        TraceValue::Scalar(v.clone())
    }
}

impl From<Point> for TraceValue {
    fn from(p: Point) -> Self {
        TraceValue::Point(p)
    }
}

impl From<&Point> for TraceValue {
    fn from(p: &Point) -> Self {
        TraceValue::Point(p.clone())
    }
}

impl From<bool> for TraceValue {
    fn from(b: bool) -> Self {
        TraceValue::Flag(b)
    }
}

/// Named intermediate values in recording order
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Trace {
    entries: Vec<(&'static str, TraceValue)>,
}

impl Trace {
    /// Records a value, replacing an earlier one with the same name
    pub fn record(&mut self, name: &'static str, value: impl Into<TraceValue>) {
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&TraceValue> {
        self.entries.iter().find(|(n, _)| *n == name).map(|(_, v)| v)
    }

    pub fn scalar(&self, name: &str) -> Option<&BigUint> {
        match self.get(name)? {
            TraceValue::Scalar(v) => Some(v),
            _ => None,
        }
    }

    pub fn point(&self, name: &str) -> Option<&Point> {
        match self.get(name)? {
            TraceValue::Point(p) => Some(p),
            _ => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &TraceValue)> {
        self.entries.iter().map(|(n, v)| (*n, v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl Serialize for Trace {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Operation counts and intermediate values of one call
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Diagnostics {
    pub ops: OpCounts,
    pub trace: Trace,
}

/// Per-attempt recorder used inside the engines
///
/// `discard` throws away a failed attempt's work and counts a resample;
/// `finish` hands back what the successful attempt recorded.
#[derive(Debug, Default)]
pub(crate) struct Meter {
    ops: OpCounts,
    trace: Trace,
    resamples: u64,
}

impl Meter {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn count(&mut self, kind: OpKind) {
        self.ops.add(kind, 1);
    }

    pub(crate) fn count_n(&mut self, kind: OpKind, n: u64) {
        self.ops.add(kind, n);
    }

    pub(crate) fn record(&mut self, name: &'static str, value: impl Into<TraceValue>) {
        self.trace.record(name, value);
    }

    pub(crate) fn discard(&mut self) {
        self.ops = OpCounts::default();
        self.trace.clear();
        self.resamples += 1;
    }

    pub(crate) fn finish(self) -> Diagnostics {
        let mut ops = self.ops;
        ops.resamples += self.resamples;
        Diagnostics {
            ops,
            trace: self.trace,
        }
    }
}
