//! Counters & timings: C5 from the design.
//!
//! Grounded in the teacher's `ProfilingTracer` (per-key `HashMap` counters
//! accumulated during a pass and read back as a report) generalized to the
//! richer shape `examples/original_source/common/counters/Counters.h`
//! describes: plain counters, two-level category counters, integer-bucketed
//! histograms, and flow-chained timings. Where the teacher picks one
//! zero-cost hook trait (`VmTracer`) for a single concern (VM tracing), this
//! module is the corresponding hook surface for the frontend's own
//! instrumentation (§4.4/§6.5), collected per-thread and merged on join
//! (§5) rather than dispatched through a trait object.

use std::cell::RefCell;
use std::collections::hash_map::Entry;
use std::hash::{Hash, Hasher};

use ahash::AHashMap;

/// A `&'static str` compared and hashed by pointer identity, matching
/// §4.4's "strings are stored by pointer identity for speed" — string
/// literals have a stable address for the life of the binary, so two
/// counter increments from the same call site collide in the map without
/// ever hashing the bytes. [`CounterState::canonicalize`] re-keys everything
/// by content for reporting.
#[derive(Debug, Clone, Copy)]
pub struct ConstStr(pub &'static str);

impl PartialEq for ConstStr {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.0, other.0)
    }
}

impl Eq for ConstStr {}

impl Hash for ConstStr {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.as_ptr().hash(state);
        self.0.len().hash(state);
    }
}

/// Chains a timing span to at most one relative: either it records its own
/// identity (`self_flow_id`, the root of a new flow) or a link back to a
/// parent span (`prev_flow_id`), never both (§4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FlowId(u64);

impl FlowId {
    pub const NONE: Self = Self(0);

    #[must_use]
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    #[must_use]
    pub fn exists(self) -> bool {
        self.0 != 0
    }
}

#[derive(Debug, Clone)]
pub struct TimingEvent {
    pub measure: ConstStr,
    pub start_us: u64,
    pub end_us: u64,
    pub args: Vec<(String, String)>,
    pub tags: Vec<String>,
    pub self_flow_id: FlowId,
    pub prev_flow_id: FlowId,
    pub buckets: Vec<i32>,
}

/// Raised by operations whose precondition a caller is expected to get
/// right but that aren't full invariant violations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CounterError {
    /// `timingAdd` was asked to set both `self_flow_id` and `prev_flow_id`.
    ConflictingFlowIds,
}

impl std::fmt::Display for CounterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ConflictingFlowIds => write!(f, "timingAdd: self_flow_id and prev_flow_id cannot both be set"),
        }
    }
}

impl std::error::Error for CounterError {}

/// One thread/worker's view of the process-wide counters (§4.4/§5). Workers
/// each own one, mutate it lock-free during their pass, and hand it to the
/// main thread on join via [`Self::consume`].
#[derive(Debug, Default)]
pub struct CounterState {
    counters: AHashMap<ConstStr, u64>,
    category_counters: AHashMap<ConstStr, AHashMap<ConstStr, u64>>,
    histograms: AHashMap<ConstStr, AHashMap<i32, u64>>,
    timings: Vec<TimingEvent>,
}

impl CounterState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn counter_inc(&mut self, name: ConstStr) {
        self.counter_add(name, 1);
    }

    pub fn counter_add(&mut self, name: ConstStr, value: u64) {
        *self.counters.entry(name).or_insert(0) += value;
    }

    pub fn category_counter_add(&mut self, category: ConstStr, counter: ConstStr, value: u64) {
        *self.category_counters.entry(category).or_default().entry(counter).or_insert(0) += value;
    }

    pub fn histogram_add(&mut self, name: ConstStr, bucket_key: i32, value: u64) {
        *self.histograms.entry(name).or_default().entry(bucket_key).or_insert(0) += value;
    }

    /// Records one timing span. Rejects a span that sets both flow-id slots
    /// (§4.4): a span either starts a flow or continues one, never both.
    pub fn timing_add(
        &mut self,
        measure: ConstStr,
        start_us: u64,
        end_us: u64,
        args: Vec<(String, String)>,
        tags: Vec<String>,
        self_flow_id: FlowId,
        prev_flow_id: FlowId,
        buckets: Vec<i32>,
    ) -> Result<(), CounterError> {
        if self_flow_id.exists() && prev_flow_id.exists() {
            return Err(CounterError::ConflictingFlowIds);
        }
        self.timings.push(TimingEvent {
            measure,
            start_us,
            end_us,
            args,
            tags,
            self_flow_id,
            prev_flow_id,
            buckets,
        });
        Ok(())
    }

    /// Merges `other` into `self`: sums matching counters/category-counters/
    /// histogram buckets, and appends all timings. Commutative and
    /// associative (§8) — summation and multiset union both are.
    pub fn consume(&mut self, other: Self) {
        for (name, value) in other.counters {
            *self.counters.entry(name).or_insert(0) += value;
        }
        for (category, counters) in other.category_counters {
            let entry = self.category_counters.entry(category).or_default();
            for (counter, value) in counters {
                *entry.entry(counter).or_insert(0) += value;
            }
        }
        for (name, buckets) in other.histograms {
            let entry = self.histograms.entry(name).or_default();
            for (bucket, value) in buckets {
                *entry.entry(bucket).or_insert(0) += value;
            }
        }
        self.timings.extend(other.timings);
    }

    /// Re-interns every `ConstStr` key by its byte content, collapsing
    /// entries that came from distinct string-literal addresses with equal
    /// text (§4.4). Call once, after all workers have been consumed, before
    /// handing counters to a telemetry sink.
    #[must_use]
    pub fn canonicalize(&self) -> CanonicalCounters {
        let mut counters: AHashMap<String, u64> = AHashMap::new();
        for (name, value) in &self.counters {
            *counters.entry(name.0.to_owned()).or_insert(0) += value;
        }

        let mut category_counters: AHashMap<String, AHashMap<String, u64>> = AHashMap::new();
        for (category, inner) in &self.category_counters {
            let entry = category_counters.entry(category.0.to_owned()).or_default();
            for (counter, value) in inner {
                *entry.entry(counter.0.to_owned()).or_insert(0) += value;
            }
        }

        let mut histograms: AHashMap<String, AHashMap<i32, u64>> = AHashMap::new();
        for (name, buckets) in &self.histograms {
            let entry = histograms.entry(name.0.to_owned()).or_default();
            for (bucket, value) in buckets {
                match entry.entry(*bucket) {
                    Entry::Occupied(mut o) => *o.get_mut() += value,
                    Entry::Vacant(v) => {
                        v.insert(*value);
                    }
                }
            }
        }

        CanonicalCounters {
            counters,
            category_counters,
            histograms,
            timings: self.timings.clone(),
        }
    }
}

/// The byte-keyed, reporting-ready view produced by [`CounterState::canonicalize`].
/// This is what a telemetry sink (external, per §6.5) actually serializes.
#[derive(Debug, Clone, Default)]
pub struct CanonicalCounters {
    pub counters: AHashMap<String, u64>,
    pub category_counters: AHashMap<String, AHashMap<String, u64>>,
    pub histograms: AHashMap<String, AHashMap<i32, u64>>,
    pub timings: Vec<TimingEvent>,
}

thread_local! {
    static THREAD_COUNTERS: RefCell<CounterState> = RefCell::new(CounterState::new());
}

/// Increments a thread-local counter. Convenience wrapper over the
/// thread-local [`CounterState`] for call sites that don't thread an
/// explicit state through (mirrors the ambient, no-argument feel of the
/// original's free functions).
pub fn counter_inc(name: ConstStr) {
    THREAD_COUNTERS.with(|c| c.borrow_mut().counter_inc(name));
}

pub fn counter_add(name: ConstStr, value: u64) {
    THREAD_COUNTERS.with(|c| c.borrow_mut().counter_add(name, value));
}

pub fn category_counter_add(category: ConstStr, counter: ConstStr, value: u64) {
    THREAD_COUNTERS.with(|c| c.borrow_mut().category_counter_add(category, counter, value));
}

pub fn histogram_add(name: ConstStr, bucket_key: i32, value: u64) {
    THREAD_COUNTERS.with(|c| c.borrow_mut().histogram_add(name, bucket_key, value));
}

/// Swaps out this thread's accumulated [`CounterState`] for an empty one,
/// returning what had accumulated — the "hand to the main thread on join"
/// step from §5.
pub fn take_thread_local() -> CounterState {
    THREAD_COUNTERS.with(|c| std::mem::take(&mut *c.borrow_mut()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_add_accumulates() {
        let mut s = CounterState::new();
        s.counter_inc(ConstStr("names.interned"));
        s.counter_add(ConstStr("names.interned"), 4);
        assert_eq!(*s.counters.get(&ConstStr("names.interned")).unwrap(), 5);
    }

    #[test]
    fn timing_add_rejects_conflicting_flow_ids() {
        let mut s = CounterState::new();
        let err = s
            .timing_add(
                ConstStr("desugar.file"),
                0,
                10,
                Vec::new(),
                Vec::new(),
                FlowId::new(1),
                FlowId::new(2),
                Vec::new(),
            )
            .unwrap_err();
        assert_eq!(err, CounterError::ConflictingFlowIds);
    }

    #[test]
    fn consume_is_commutative_on_canonical_view() {
        let mut a = CounterState::new();
        a.counter_add(ConstStr("x"), 3);
        a.histogram_add(ConstStr("h"), 1, 2);

        let mut b = CounterState::new();
        b.counter_add(ConstStr("x"), 5);
        b.histogram_add(ConstStr("h"), 1, 7);

        let mut ab = CounterState::new();
        ab.consume(a.clone_for_test());
        ab.consume(b.clone_for_test());

        let mut ba = CounterState::new();
        ba.consume(b.clone_for_test());
        ba.consume(a.clone_for_test());

        let ab_canon = ab.canonicalize();
        let ba_canon = ba.canonicalize();
        assert_eq!(ab_canon.counters.get("x"), ba_canon.counters.get("x"));
        assert_eq!(ab_canon.histograms.get("h"), ba_canon.histograms.get("h"));
    }

    #[test]
    fn canonicalize_merges_equal_content_distinct_addresses() {
        // Two distinct heap allocations holding the same bytes, leaked to get
        // `'static` lifetimes, simulate two different call sites that happen
        // to use the same counter name as separate string literals.
        let a: &'static str = Box::leak("shared.counter".to_owned().into_boxed_str());
        let b: &'static str = Box::leak("shared.counter".to_owned().into_boxed_str());
        assert!(!std::ptr::eq(a, b));

        let mut s = CounterState::new();
        s.counter_add(ConstStr(a), 10);
        s.counter_add(ConstStr(b), 20);
        assert_eq!(s.counters.len(), 2); // distinct by pointer identity pre-canonicalize

        let canon = s.canonicalize();
        assert_eq!(canon.counters.get("shared.counter"), Some(&30));
    }

    impl CounterState {
        fn clone_for_test(&self) -> Self {
            Self {
                counters: self.counters.clone(),
                category_counters: self.category_counters.clone(),
                histograms: self.histograms.clone(),
                timings: self.timings.clone(),
            }
        }
    }
}
