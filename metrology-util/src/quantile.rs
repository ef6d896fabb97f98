/// A quantile, along with the labels it is displayed under.
///
/// Labels are derived from the equivalent percentile, in two forms: a short form suitable for
/// metric names (`0.99` is `p99`, `0.999` is `p999`) and a percent form for human-readable output
/// (`99%`, `99.9%`).  The extremes are labelled `min` and `max` in both forms.
#[derive(Clone, Debug, PartialEq)]
pub struct Quantile {
    value: f64,
    label: String,
    percent_label: String,
}

impl Quantile {
    /// Creates a quantile, clamping `quantile` to `[0.0, 1.0]`.  NaN is read as `0.0`.
    pub fn new(quantile: f64) -> Self {
        let value = if quantile.is_nan() { 0.0 } else { quantile.clamp(0.0, 1.0) };
        let (label, percent_label) = if value == 0.0 {
            ("min".to_string(), "min".to_string())
        } else if value == 1.0 {
            ("max".to_string(), "max".to_string())
        } else {
            // Rounded so that `0.999` reads as `99.9` rather than `99.90000000000001`.
            let percent = (value * 100_000.0).round() / 1_000.0;
            (format!("p{}", percent).replace('.', ""), format!("{}%", percent))
        };

        Self { value, label, percent_label }
    }

    /// The quantile, in `[0.0, 1.0]`.
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Short label, such as `p99`.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Percent label, such as `99%`.
    pub fn percent_label(&self) -> &str {
        &self.percent_label
    }
}

#[cfg(test)]
mod tests {
    use super::Quantile;

    #[test]
    fn test_labels() {
        let cases = [
            (0.0, "min", "min"),
            (0.5, "p50", "50%"),
            (0.75, "p75", "75%"),
            (0.98, "p98", "98%"),
            (0.999, "p999", "99.9%"),
            (0.9999, "p9999", "99.99%"),
            (1.0, "max", "max"),
        ];
        for (value, label, percent_label) in cases {
            let quantile = Quantile::new(value);
            assert_eq!(quantile.value(), value);
            assert_eq!(quantile.label(), label);
            assert_eq!(quantile.percent_label(), percent_label);
        }
    }

    #[test]
    fn test_out_of_range_is_clamped() {
        assert_eq!(Quantile::new(1.2), Quantile::new(1.0));
        assert_eq!(Quantile::new(-0.5).label(), "min");
        assert_eq!(Quantile::new(f64::NAN), Quantile::new(0.0));
    }
}
