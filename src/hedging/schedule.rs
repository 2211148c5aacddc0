use std::time::Duration;

/// Delays for the hedge attempts of one race, each measured from the start of the race.
/// The primary attempt is not part of the schedule, so an empty schedule means no hedging.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schedule {
    delays: Vec<Duration>,
}

impl Schedule {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn from_millis<I: IntoIterator<Item = u64>>(millis: I) -> Self {
        Self {
            delays: millis.into_iter().map(Duration::from_millis).collect(),
        }
    }

    /// Total number of attempts a race with this schedule may start.
    pub fn attempts(&self) -> usize {
        1 + self.delays.len()
    }

    pub fn delays(&self) -> &[Duration] {
        &self.delays
    }

    pub fn is_empty(&self) -> bool {
        self.delays.is_empty()
    }

    /// Hedges as `(ordinal, delay)` pairs sorted by delay. Ordinals start at 2.
    pub(super) fn hedges(&self) -> Vec<(usize, Duration)> {
        let mut hedges: Vec<(usize, Duration)> = self
            .delays
            .iter()
            .enumerate()
            .map(|(i, delay)| (i + 2, *delay))
            .collect();
        hedges.sort_by_key(|(ordinal, delay)| (*delay, *ordinal));
        hedges
    }
}

impl From<Vec<Duration>> for Schedule {
    fn from(delays: Vec<Duration>) -> Self {
        Self { delays }
    }
}
