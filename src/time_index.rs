//! Discrete time steps over which the model is optimised.
//!
//! The time index is an ordered, contiguous run of integer steps, e.g. `1..=24` for a day of hourly
//! steps. There is no wraparound: the first step has no predecessor and the last has no successor.
use crate::input::is_sorted_and_unique;
use anyhow::{Result, ensure};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Index, IndexMut};

/// A single time step
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct TimeStep(pub u32);

impl fmt::Display for TimeStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An ordered, contiguous sequence of time steps
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimeIndex {
    first: TimeStep,
    len: u32,
}

impl TimeIndex {
    /// Create a time index from a list of steps.
    ///
    /// The steps must be non-empty, strictly increasing and contiguous.
    pub fn from_steps(steps: &[u32]) -> Result<Self> {
        ensure!(!steps.is_empty(), "Time index is empty");
        ensure!(
            is_sorted_and_unique(steps),
            "Time steps must be unique and in increasing order"
        );
        for (prev, cur) in steps.iter().zip(steps.iter().skip(1)) {
            ensure!(
                *cur == *prev + 1,
                "Time steps must be contiguous, but step {prev} is followed by {cur}"
            );
        }

        Self::from_first_and_len(steps[0], u32::try_from(steps.len())?)
    }

    /// Create a time index covering the steps `first..=last`
    pub fn new(first: u32, last: u32) -> Result<Self> {
        ensure!(last >= first, "Last time step {last} is before first {first}");
        Self::from_first_and_len(first, last - first + 1)
    }

    fn from_first_and_len(first: u32, len: u32) -> Result<Self> {
        ensure!(
            first.checked_add(len).is_some(),
            "Time steps must be less than {}",
            u32::MAX
        );

        Ok(Self {
            first: TimeStep(first),
            len,
        })
    }

    /// The first time step
    pub fn first(&self) -> TimeStep {
        self.first
    }

    /// The last time step
    pub fn last(&self) -> TimeStep {
        TimeStep(self.first.0 + self.len - 1)
    }

    /// The step before `t`, if any
    pub fn prev(&self, t: TimeStep) -> Option<TimeStep> {
        (self.contains(t) && t > self.first).then(|| TimeStep(t.0 - 1))
    }

    /// The step after `t`, if any
    pub fn next(&self, t: TimeStep) -> Option<TimeStep> {
        (self.contains(t) && t < self.last()).then(|| TimeStep(t.0 + 1))
    }

    /// Whether `t` lies within this index
    pub fn contains(&self, t: TimeStep) -> bool {
        t >= self.first && t <= self.last()
    }

    /// The number of time steps
    pub fn len(&self) -> usize {
        self.len as usize
    }

    /// Always false: a time index has at least one step
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Iterate over the time steps in order
    pub fn iter(&self) -> impl Iterator<Item = TimeStep> + use<> {
        let first = self.first.0;
        (first..first + self.len).map(TimeStep)
    }

    /// The zero-based position of `t` in the index
    ///
    /// # Panics
    ///
    /// If `t` is not in the index.
    fn position(&self, t: TimeStep) -> usize {
        assert!(self.contains(t), "Time step {t} is not in the time index");
        (t.0 - self.first.0) as usize
    }
}

/// One value per step of a [`TimeIndex`]
#[derive(Clone, Debug, PartialEq)]
pub struct StepMap<T> {
    index: TimeIndex,
    values: Vec<T>,
}

impl<T> StepMap<T> {
    /// Create a map by evaluating `f` for each step of `index`
    pub fn from_fn<F>(index: &TimeIndex, f: F) -> Self
    where
        F: FnMut(TimeStep) -> T,
    {
        Self {
            index: *index,
            values: index.iter().map(f).collect(),
        }
    }

    /// Create a map from values given in step order.
    ///
    /// The number of values must equal the number of steps in `index`.
    pub fn from_values(index: &TimeIndex, values: Vec<T>) -> Result<Self> {
        ensure!(
            values.len() == index.len(),
            "Expected {} values, one for each time step, but got {}",
            index.len(),
            values.len()
        );

        Ok(Self {
            index: *index,
            values,
        })
    }

    /// The time index this map covers
    pub fn time_index(&self) -> &TimeIndex {
        &self.index
    }

    /// Get the value for `t`, if `t` is in the index
    pub fn get(&self, t: TimeStep) -> Option<&T> {
        self.index
            .contains(t)
            .then(|| &self.values[self.index.position(t)])
    }

    /// Iterate over steps and values in order
    pub fn iter(&self) -> impl Iterator<Item = (TimeStep, &T)> {
        self.index.iter().zip(self.values.iter())
    }

    /// Iterate over values in step order
    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.values.iter()
    }
}

impl<T> Index<TimeStep> for StepMap<T> {
    type Output = T;

    fn index(&self, t: TimeStep) -> &T {
        &self.values[self.index.position(t)]
    }
}

impl<T> IndexMut<TimeStep> for StepMap<T> {
    fn index_mut(&mut self, t: TimeStep) -> &mut T {
        let pos = self.index.position(t);
        &mut self.values[pos]
    }
}
