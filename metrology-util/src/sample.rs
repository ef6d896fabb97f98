use crate::Quantile;

/// A point-in-time, sorted copy of the values held by a reservoir.
///
/// Quantiles are estimated by linear interpolation between the two samples nearest to the
/// position `q * (n + 1)`, clamped to the smallest and largest sample at either end.  For the
/// values `1..=10`, this gives a median of `5.5`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Sample {
    values: Vec<i64>,
}

impl Sample {
    /// Creates a new `Sample` from an unordered collection of values.
    pub fn new(mut values: Vec<i64>) -> Self {
        values.sort_unstable();
        Self { values }
    }

    /// Number of values in the sample.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if the sample holds no values.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The sorted values.
    pub fn values(&self) -> &[i64] {
        &self.values
    }

    /// Smallest value, or `0` when empty.
    pub fn min(&self) -> i64 {
        self.values.first().copied().unwrap_or(0)
    }

    /// Largest value, or `0` when empty.
    pub fn max(&self) -> i64 {
        self.values.last().copied().unwrap_or(0)
    }

    /// Arithmetic mean, or `0.0` when empty.
    pub fn mean(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }

        let sum: f64 = self.values.iter().map(|v| *v as f64).sum();
        sum / self.values.len() as f64
    }

    /// Sample standard deviation (Bessel-corrected), or `0.0` with fewer than two values.
    pub fn std_dev(&self) -> f64 {
        let n = self.values.len();
        if n <= 1 {
            return 0.0;
        }

        let mean = self.mean();
        let sum_sq: f64 = self
            .values
            .iter()
            .map(|v| {
                let diff = *v as f64 - mean;
                diff * diff
            })
            .sum();

        (sum_sq / (n - 1) as f64).sqrt()
    }

    /// Estimates the value at the given quantile.
    ///
    /// `quantile` is clamped to `[0.0, 1.0]`, with NaN read as `0.0`.  Returns `0.0` when empty.
    pub fn quantile(&self, quantile: f64) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }

        let quantile = if quantile.is_nan() { 0.0 } else { quantile.clamp(0.0, 1.0) };
        let n = self.values.len();
        let pos = quantile * (n + 1) as f64;

        if pos < 1.0 {
            return self.values[0] as f64;
        }
        if pos >= n as f64 {
            return self.values[n - 1] as f64;
        }

        let lower = self.values[pos as usize - 1] as f64;
        let upper = self.values[pos as usize] as f64;
        lower + (pos - pos.floor()) * (upper - lower)
    }

    /// Estimates the value for each of the given quantiles, in order.
    pub fn quantiles<'a, I>(&self, quantiles: I) -> Vec<(&'a Quantile, f64)>
    where
        I: IntoIterator<Item = &'a Quantile>,
    {
        quantiles.into_iter().map(|q| (q, self.quantile(q.value()))).collect()
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use proptest::{collection::vec as arb_vec, prelude::*};

    use super::Sample;
    use crate::Quantile;

    #[test]
    fn test_empty_sample() {
        let sample = Sample::new(Vec::new());
        assert!(sample.is_empty());
        assert_eq!(sample.min(), 0);
        assert_eq!(sample.max(), 0);
        assert_eq!(sample.mean(), 0.0);
        assert_eq!(sample.std_dev(), 0.0);
        assert_eq!(sample.quantile(0.5), 0.0);
    }

    #[test]
    fn test_nan_quantile_reads_as_min() {
        let sample = Sample::new(vec![3, 1, 2]);
        assert_eq!(sample.quantile(f64::NAN), 1.0);
        assert_eq!(sample.quantile(-1.0), 1.0);
        assert_eq!(sample.quantile(2.0), 3.0);
    }

    #[test]
    fn test_one_through_ten() {
        let sample = Sample::new((1..=10).rev().collect());
        assert_eq!(sample.len(), 10);
        assert_eq!(sample.min(), 1);
        assert_eq!(sample.max(), 10);
        assert_relative_eq!(sample.mean(), 5.5);
        assert_relative_eq!(sample.quantile(0.5), 5.5);
        assert_relative_eq!(sample.quantile(0.75), 8.25);
        assert_relative_eq!(sample.quantile(0.99), 10.0);
        assert_relative_eq!(sample.quantile(0.0), 1.0);
        assert_relative_eq!(sample.std_dev(), 3.0276503540974917, epsilon = 1e-12);
    }

    #[test]
    fn test_single_value() {
        let sample = Sample::new(vec![42]);
        assert_eq!(sample.quantile(0.5), 42.0);
        assert_eq!(sample.quantile(0.999), 42.0);
        assert_eq!(sample.std_dev(), 0.0);
    }

    #[test]
    fn test_labelled_quantiles() {
        let sample = Sample::new((1..=100).collect());
        let quantiles = [Quantile::new(0.5), Quantile::new(0.95)];
        let results = sample.quantiles(&quantiles);

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0.label(), "p50");
        assert_relative_eq!(results[0].1, 50.5);
        assert_eq!(results[1].0.label(), "p95");
        assert_relative_eq!(results[1].1, 95.95, epsilon = 1e-9);
    }

    proptest! {
        #[test]
        fn test_quantiles_stay_within_bounds(
            values in arb_vec(-1_000_000i64..1_000_000, 1..256),
            q in 0.0f64..=1.0,
        ) {
            let sample = Sample::new(values);
            let estimate = sample.quantile(q);
            prop_assert!(estimate >= sample.min() as f64);
            prop_assert!(estimate <= sample.max() as f64);
        }
    }
}
