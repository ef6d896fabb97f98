use std::{collections::BTreeMap, time::Duration};

use ordered_float::OrderedFloat;
use parking_lot::Mutex;
use quanta::{Clock, Instant};

use super::{fastrand_unit, Reservoir};
use crate::Sample;

const DEFAULT_SIZE: usize = 1028;
const DEFAULT_ALPHA: f64 = 0.015;
const RESCALE_THRESHOLD: Duration = Duration::from_secs(60 * 60);

struct State {
    values: BTreeMap<OrderedFloat<f64>, i64>,
    // Seconds since `origin` that priorities are currently weighted against.
    landmark: u64,
    next_rescale: Instant,
}

/// An exponentially decaying reservoir.
///
/// Uses Cormode et al.'s [forward decay][forward_decay] priority sampling: every value is assigned a
/// priority of `exp(alpha * age) / u` with `u` drawn uniformly from `(0, 1]`, and the reservoir keeps
/// the `size` values with the highest priorities.  Recent values therefore dominate the sample,
/// which with the default `alpha` of `0.015` roughly represents the last five minutes of data.
///
/// Priorities are periodically rescaled against a new landmark so that the weights never
/// overflow.
///
/// [forward_decay]: http://dimacs.rutgers.edu/~graham/pubs/papers/fwddecay.pdf
pub struct ExponentiallyDecayingReservoir {
    size: usize,
    alpha: f64,
    clock: Clock,
    origin: Instant,
    state: Mutex<State>,
}

impl ExponentiallyDecayingReservoir {
    /// Creates a reservoir with the default size (1028) and alpha (0.015).
    pub fn new(clock: Clock) -> Self {
        Self::with_parameters(DEFAULT_SIZE, DEFAULT_ALPHA, clock)
    }

    /// Creates a reservoir holding up to `size` values, decaying at the given `alpha`.
    ///
    /// A size of zero is raised to one.
    pub fn with_parameters(size: usize, alpha: f64, clock: Clock) -> Self {
        let origin = clock.now();
        let state = State { values: BTreeMap::new(), landmark: 0, next_rescale: origin + RESCALE_THRESHOLD };

        Self { size: size.max(1), alpha, clock, origin, state: Mutex::new(state) }
    }

    fn weight(&self, age_secs: u64) -> f64 {
        (self.alpha * age_secs as f64).exp()
    }

    fn seconds_since_origin(&self, now: Instant) -> u64 {
        now.saturating_duration_since(self.origin).as_secs()
    }

    fn rescale_if_needed(&self, state: &mut State, now: Instant) {
        if now < state.next_rescale {
            return;
        }

        let old_landmark = state.landmark;
        let new_landmark = self.seconds_since_origin(now);
        let factor = (-self.alpha * (new_landmark - old_landmark) as f64).exp();

        state.values = std::mem::take(&mut state.values)
            .into_iter()
            .map(|(priority, value)| (OrderedFloat(priority.0 * factor), value))
            .collect();
        state.landmark = new_landmark;
        state.next_rescale = now + RESCALE_THRESHOLD;
    }
}

impl Reservoir for ExponentiallyDecayingReservoir {
    fn update(&self, value: i64) {
        let now = self.clock.now();
        let mut state = self.state.lock();
        self.rescale_if_needed(&mut state, now);

        let age = self.seconds_since_origin(now).saturating_sub(state.landmark);
        let priority = OrderedFloat(self.weight(age) / fastrand_unit());

        if state.values.len() < self.size {
            state.values.entry(priority).or_insert(value);
            return;
        }

        let lowest = state.values.first_key_value().map(|(k, _)| *k);
        if let Some(lowest) = lowest {
            if lowest < priority && !state.values.contains_key(&priority) {
                state.values.insert(priority, value);
                state.values.pop_first();
            }
        }
    }

    fn size(&self) -> usize {
        self.state.lock().values.len()
    }

    fn snapshot(&self) -> Sample {
        let now = self.clock.now();
        let mut state = self.state.lock();
        self.rescale_if_needed(&mut state, now);

        Sample::new(state.values.values().copied().collect())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use approx::assert_relative_eq;
    use quanta::Clock;

    use super::ExponentiallyDecayingReservoir;
    use crate::Reservoir;

    #[test]
    fn test_small_streams_are_kept_whole() {
        let (clock, _mock) = Clock::mock();
        let reservoir = ExponentiallyDecayingReservoir::new(clock);
        for v in 1..=10 {
            reservoir.update(v);
        }

        let snapshot = reservoir.snapshot();
        assert_eq!(snapshot.len(), 10);
        assert_eq!(snapshot.min(), 1);
        assert_eq!(snapshot.max(), 10);
        assert_relative_eq!(snapshot.quantile(0.5), 5.5);
    }

    #[test]
    fn test_size_is_bounded() {
        let (clock, _mock) = Clock::mock();
        let reservoir = ExponentiallyDecayingReservoir::with_parameters(100, 0.99, clock);
        for v in 0..1000 {
            reservoir.update(v);
        }

        assert_eq!(reservoir.size(), 100);
        assert_eq!(reservoir.snapshot().len(), 100);
    }

    #[test]
    fn test_recent_values_dominate() {
        let (clock, mock) = Clock::mock();
        let reservoir = ExponentiallyDecayingReservoir::with_parameters(10, 0.015, clock);

        for _ in 0..100 {
            reservoir.update(1000);
        }

        // Far enough ahead that new priorities outweigh every old one, but without crossing the
        // rescale threshold.
        mock.increment(Duration::from_secs(50 * 60));
        for _ in 0..100 {
            reservoir.update(2000);
        }

        let snapshot = reservoir.snapshot();
        assert_eq!(snapshot.len(), 10);
        assert!(snapshot.values().iter().all(|v| *v == 2000));
    }

    #[test]
    fn test_rescale_preserves_values() {
        let (clock, mock) = Clock::mock();
        let reservoir = ExponentiallyDecayingReservoir::with_parameters(10, 0.015, clock);
        for v in 0..5 {
            reservoir.update(v);
        }

        mock.increment(Duration::from_secs(2 * 60 * 60));
        reservoir.update(5);

        let snapshot = reservoir.snapshot();
        assert_eq!(snapshot.values(), &[0, 1, 2, 3, 4, 5]);
    }
}
