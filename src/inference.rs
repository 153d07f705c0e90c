//! Observation aggregator.
//!
//! Stream decoded JSON samples in and keep per-position kind counts. One
//! `Stats` node exists per semantic position: the top level, the shared
//! element slot of every array position, the pooled all-properties slot and
//! one child per property name of every object position.
//!
//! Design goals:
//! - No history besides sufficient statistics.
//! - Merge is associative/commutative → order-independent, so a corpus can be
//!   aggregated in parallel and reduced afterwards.
//! - Resolution (see [`crate::lower`]) only reads the tree.
pub mod num;
pub mod obj;
pub mod timestamp;

use rayon::prelude::*;
use serde::Serialize;
use serde_json::Value;

use crate::lower::{self, LowerOptions, Lowered};

pub use num::NumKind;
pub use obj::Properties;
pub use timestamp::{LayoutSet, TimestampFormat};

// ------------------------------ State ------------------------------------ //

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub arrays: u64,
    pub bools: u64,
    pub floats: u64,
    pub ints: u64,
    pub nulls: u64,
    pub objects: u64,
    pub strings: u64,
    /// `[]`, `false`, `0`, `0.0`, `""` and `{}`.
    pub empties: u64,
    /// Length of the timestamp streak; 0 once the streak is broken.
    pub times: u64,
    /// Layouts matched by the strings of the streak; empty once it breaks.
    #[serde(rename = "timestamp_layouts")]
    pub layouts: LayoutSet,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub element: Option<Box<Stats>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub all_properties: Option<Box<Stats>>,
    #[serde(skip_serializing_if = "Properties::is_empty")]
    pub properties: Properties,
}

impl Stats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_value(v: &Value) -> Self {
        let mut stats = Self::new();
        stats.observe(v);
        stats
    }

    /// Total observations at this position.
    ///
    /// Every `serde_json::Value` variant lands in exactly one kind bucket, so
    /// this is always the sum of the seven kind counts; there is no
    /// "observed but unclassified" remainder.
    pub fn observations(&self) -> u64 {
        self.arrays + self.bools + self.floats + self.ints + self.nulls + self.objects + self.strings
    }

    /// Number of kind buckets that are non-zero.
    pub fn distinct_kinds(&self) -> usize {
        [
            self.arrays,
            self.bools,
            self.floats,
            self.ints,
            self.nulls,
            self.objects,
            self.strings,
        ]
        .iter()
        .filter(|n| **n > 0)
        .count()
    }

    /// Every observed string parsed as a timestamp under some layout.
    pub fn is_time_streak(&self) -> bool {
        self.strings > 0 && self.times == self.strings
    }

    /// No string so far failed every layout.
    fn streak_intact(&self) -> bool {
        self.times == self.strings
    }

    /// Highest-priority layout matched while the streak holds.
    pub fn timestamp_format(&self) -> Option<TimestampFormat> {
        if self.is_time_streak() { self.layouts.first() } else { None }
    }

    pub fn element(&self) -> Option<&Stats> {
        self.element.as_deref()
    }

    pub fn all_properties(&self) -> Option<&Stats> {
        self.all_properties.as_deref()
    }

    // ---------------------------- Observe -------------------------------- //

    pub fn observe(&mut self, v: &Value) {
        match v {
            Value::Null => self.nulls += 1,
            Value::Bool(b) => {
                self.bools += 1;
                if !b {
                    self.empties += 1;
                }
            }
            Value::Number(n) => {
                match num::classify(n) {
                    NumKind::Int => self.ints += 1,
                    NumKind::Float => self.floats += 1,
                }
                if num::is_zero(n) {
                    self.empties += 1;
                }
            }
            Value::String(s) => self.observe_string(s),
            Value::Array(xs) => {
                self.arrays += 1;
                if xs.is_empty() {
                    self.empties += 1;
                }
                for el in xs {
                    self.element.get_or_insert_with(Default::default).observe(el);
                }
            }
            Value::Object(m) => {
                self.objects += 1;
                if m.is_empty() {
                    self.empties += 1;
                }
                for (k, v) in m {
                    self.all_properties.get_or_insert_with(Default::default).observe(v);
                    match self.properties.get_mut(k) {
                        Some(child) => child.observe(v),
                        None => {
                            self.properties.insert(k.clone(), Stats::from_value(v));
                        }
                    }
                }
            }
        }
    }

    fn observe_string(&mut self, s: &str) {
        if s.is_empty() {
            self.empties += 1;
        }
        // broken streaks are never re-checked
        if self.streak_intact() {
            let matched = LayoutSet::matching(s);
            if matched.is_empty() {
                self.times = 0;
                self.layouts = LayoutSet::EMPTY;
            } else {
                self.times += 1;
                self.layouts = self.layouts.union(matched);
            }
        }
        self.strings += 1;
    }

    // ----------------------------- Merge --------------------------------- //

    /// Combine two independently aggregated trees for the same position.
    pub fn merge(self, other: Stats) -> Stats {
        let (times, layouts) = if self.streak_intact() && other.streak_intact() {
            (self.times + other.times, self.layouts.union(other.layouts))
        } else {
            (0, LayoutSet::EMPTY)
        };
        Stats {
            arrays: self.arrays + other.arrays,
            bools: self.bools + other.bools,
            floats: self.floats + other.floats,
            ints: self.ints + other.ints,
            nulls: self.nulls + other.nulls,
            objects: self.objects + other.objects,
            strings: self.strings + other.strings,
            empties: self.empties + other.empties,
            times,
            layouts,
            element: obj::merge_child(self.element, other.element),
            all_properties: obj::merge_child(self.all_properties, other.all_properties),
            properties: obj::merge_properties(self.properties, other.properties),
        }
    }
}

// ------------------------------- Front API -------------------------------- //

#[derive(Debug, Default)]
pub struct Inference {
    state: Stats,
}

impl Inference {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe_value(&mut self, v: &Value) {
        self.state.observe(v);
    }

    pub fn stats(&self) -> &Stats {
        &self.state
    }

    pub fn into_stats(self) -> Stats {
        self.state
    }

    /// Resolve the top-level position.
    pub fn solve(&self, options: &LowerOptions) -> Lowered {
        lower::lower(&self.state, 0, options)
    }
}

pub fn infer_from_values<'a, I>(values: I) -> Stats
where
    I: IntoIterator<Item = &'a Value>,
{
    let mut st = Stats::new();
    for v in values {
        st.observe(v);
    }
    tracing::debug!(observations = st.observations(), "aggregated samples");
    st
}

/// Aggregate per worker and reduce with [`Stats::merge`].
pub fn par_infer_from_values(values: &[Value]) -> Stats {
    let st = values
        .par_iter()
        .fold(Stats::new, |mut st, v| {
            st.observe(v);
            st
        })
        .reduce(Stats::new, Stats::merge);
    tracing::debug!(observations = st.observations(), "aggregated samples in parallel");
    st
}

// ------------------------------- Tests ------------------------------------ //
