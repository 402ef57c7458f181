use crate::error::{Error, Result};
use ordered_float::NotNan;
use std::cmp::Ordering;

/// Educts of a scheduled reaction.
///
/// Tie-breaking for deterministic ordering prefers `Unary` < `Binary` when times are equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Order-1 reaction of particle `i`.
    Unary { i: usize },
    /// Order-2 reaction between particles `i` and `j`.
    Binary { i: usize, j: usize },
}

impl EventKind {
    #[inline]
    fn order_key(&self) -> (u8, usize, usize) {
        match *self {
            EventKind::Unary { i } => (0, i, 0),
            EventKind::Binary { i, j } => (1, i, j),
        }
    }
}

/// A reaction scheduled to fire at `time` within the current step.
///
/// - `time`: firing time measured from the start of the step (finite, non-NaN).
/// - `reaction`: index into the resolved reaction list.
/// - `kind`: participating particles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    pub time: NotNan<f64>,
    pub reaction: usize,
    pub kind: EventKind,
}

impl Event {
    /// Create a new event, validating that time is finite and non-NaN.
    pub fn new(time: f64, reaction: usize, kind: EventKind) -> Result<Self> {
        if !time.is_finite() {
            return Err(Error::divergence(format!(
                "reaction event time must be finite, got {time}"
            )));
        }
        let time = NotNan::new(time)
            .map_err(|_| Error::divergence("reaction event time cannot be NaN"))?;
        Ok(Self {
            time,
            reaction,
            kind,
        })
    }

    #[inline]
    pub fn time_f64(&self) -> f64 {
        self.time.into_inner()
    }

    /// An event stays valid while none of its educts has been consumed by an earlier event.
    #[inline]
    pub fn is_valid(&self, consumed: &[bool]) -> bool {
        match self.kind {
            EventKind::Unary { i } => !consumed[i],
            EventKind::Binary { i, j } => !consumed[i] && !consumed[j],
        }
    }
}

impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        self.time
            .cmp(&other.time)
            .then_with(|| self.kind.order_key().cmp(&other.kind.order_key()))
            .then_with(|| self.reaction.cmp(&other.reaction))
    }
}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
