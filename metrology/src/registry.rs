use std::{
    collections::BTreeMap,
    sync::{PoisonError, RwLock},
};

use hashbrown::{hash_map::EntryRef, HashMap};
use quanta::Clock;

use crate::{
    Counter, Error, Gauge, Histogram, Meter, Metric, MetricKind, ReservoirKind, Timer, Value,
};

/// A named collection of live instruments.
///
/// Names form a flat namespace, and each name is bound to at most one instrument.  Counters,
/// histograms, meters and timers are get-or-create: asking for a name that is already bound to an
/// instrument of the same kind returns that instrument.  Gauges are register-once, since their
/// accessor is supplied at creation and a second accessor for the same name would be ambiguous.
///
/// Every instrument created by a registry measures time with the registry's clock.
///
/// `Registry` is optimized for reads.
pub struct Registry {
    metrics: RwLock<HashMap<String, Metric>>,
    clock: Clock,
}

impl Registry {
    /// Creates an empty registry backed by the system clock.
    pub fn new() -> Self {
        Self::with_clock(Clock::new())
    }

    /// Creates an empty registry whose instruments measure time with `clock`.
    pub fn with_clock(clock: Clock) -> Self {
        Self { metrics: RwLock::new(HashMap::new()), clock }
    }

    /// The clock handed to instruments created by this registry.
    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    /// Registers `metric` under `name`.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::AlreadyRegistered`] if `name` is already bound.
    pub fn register<M>(&self, name: &str, metric: M) -> Result<Metric, Error>
    where
        M: Into<Metric>,
    {
        let metric = metric.into();
        let mut metrics = self.metrics.write().unwrap_or_else(PoisonError::into_inner);
        match metrics.entry_ref(name) {
            EntryRef::Occupied(entry) => Err(Error::AlreadyRegistered {
                name: name.to_string(),
                existing: entry.get().kind(),
                requested: metric.kind(),
            }),
            EntryRef::Vacant(entry) => Ok(entry.insert(metric).clone()),
        }
    }

    /// Registers a gauge reading `accessor`.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::AlreadyRegistered`] if `name` is already bound, even to a gauge.
    pub fn gauge<F, T>(&self, name: &str, accessor: F) -> Result<Gauge, Error>
    where
        F: Fn() -> T + Send + Sync + 'static,
        T: Into<Value>,
    {
        self.register_gauge(name, Gauge::new(accessor))
    }

    /// Registers a gauge reading `numerator() / denominator()`.
    ///
    /// See [`Gauge::ratio`].
    ///
    /// # Errors
    ///
    /// Fails with [`Error::AlreadyRegistered`] if `name` is already bound.
    pub fn ratio<N, D, TN, TD>(&self, name: &str, numerator: N, denominator: D) -> Result<Gauge, Error>
    where
        N: Fn() -> TN + Send + Sync + 'static,
        D: Fn() -> TD + Send + Sync + 'static,
        TN: Into<Value>,
        TD: Into<Value>,
    {
        self.register_gauge(name, Gauge::ratio(numerator, denominator))
    }

    /// Registers a gauge reading `transform(source.value())`.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::AlreadyRegistered`] if `name` is already bound.
    pub fn derive_gauge<F, T>(&self, name: &str, source: &Gauge, transform: F) -> Result<Gauge, Error>
    where
        F: Fn(Value) -> T + Send + Sync + 'static,
        T: Into<Value>,
    {
        self.register_gauge(name, Gauge::derive(source, transform))
    }

    fn register_gauge(&self, name: &str, gauge: Gauge) -> Result<Gauge, Error> {
        self.register(name, gauge.clone())?;
        Ok(gauge)
    }

    /// Gets or creates the counter named `name`.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::AlreadyRegistered`] if `name` is bound to another kind of metric.
    pub fn counter(&self, name: &str) -> Result<Counter, Error> {
        self.get_or_create(name, MetricKind::Counter, || Counter::new().into())
            .map(|metric| match metric {
                Metric::Counter(counter) => counter,
                _ => unreachable!("kind checked on lookup"),
            })
    }

    /// Gets or creates the histogram named `name`, sampling with the default reservoir.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::AlreadyRegistered`] if `name` is bound to another kind of metric.
    pub fn histogram(&self, name: &str) -> Result<Histogram, Error> {
        self.histogram_with(name, ReservoirKind::default())
    }

    /// Gets or creates the histogram named `name`.
    ///
    /// `kind` only applies when the histogram is created; an existing histogram keeps its
    /// reservoir.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::AlreadyRegistered`] if `name` is bound to another kind of metric.
    pub fn histogram_with(&self, name: &str, kind: ReservoirKind) -> Result<Histogram, Error> {
        self.get_or_create(name, MetricKind::Histogram, || {
            Histogram::with_kind(kind, &self.clock).into()
        })
        .map(|metric| match metric {
            Metric::Histogram(histogram) => histogram,
            _ => unreachable!("kind checked on lookup"),
        })
    }

    /// Gets or creates the meter named `name`.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::AlreadyRegistered`] if `name` is bound to another kind of metric.
    pub fn meter(&self, name: &str) -> Result<Meter, Error> {
        self.get_or_create(name, MetricKind::Meter, || Meter::new(self.clock.clone()).into())
            .map(|metric| match metric {
                Metric::Meter(meter) => meter,
                _ => unreachable!("kind checked on lookup"),
            })
    }

    /// Gets or creates the timer named `name`.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::AlreadyRegistered`] if `name` is bound to another kind of metric.
    pub fn timer(&self, name: &str) -> Result<Timer, Error> {
        self.get_or_create(name, MetricKind::Timer, || Timer::new(self.clock.clone()).into())
            .map(|metric| match metric {
                Metric::Timer(timer) => timer,
                _ => unreachable!("kind checked on lookup"),
            })
    }

    fn get_or_create<F>(&self, name: &str, kind: MetricKind, create: F) -> Result<Metric, Error>
    where
        F: FnOnce() -> Metric,
    {
        let check = |metric: &Metric| {
            if metric.kind() == kind {
                Ok(metric.clone())
            } else {
                Err(Error::AlreadyRegistered {
                    name: name.to_string(),
                    existing: metric.kind(),
                    requested: kind,
                })
            }
        };

        // Check our mapping table first.
        if let Some(metric) =
            self.metrics.read().unwrap_or_else(PoisonError::into_inner).get(name)
        {
            return check(metric);
        }

        // Check again under the write lock, in case someone just inserted what we need.
        let mut metrics = self.metrics.write().unwrap_or_else(PoisonError::into_inner);
        check(&*metrics.entry_ref(name).or_insert_with(create))
    }

    /// Looks up the metric bound to `name`.
    pub fn get(&self, name: &str) -> Option<Metric> {
        self.metrics.read().unwrap_or_else(PoisonError::into_inner).get(name).cloned()
    }

    /// Gets every registered metric, ordered by name.
    ///
    /// The returned map is a copy of the bindings at the time of the call; the metrics
    /// themselves are live.
    pub fn metrics(&self) -> BTreeMap<String, Metric> {
        let metrics = self.metrics.read().unwrap_or_else(PoisonError::into_inner);
        metrics.iter().map(|(name, metric)| (name.clone(), metric.clone())).collect()
    }

    /// Gets every registered name, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> =
            self.metrics.read().unwrap_or_else(PoisonError::into_inner).keys().cloned().collect();
        names.sort_unstable();
        names
    }

    /// Unbinds `name`, returning the metric that was bound to it.
    ///
    /// Handles to the metric held elsewhere keep working, but are no longer reported.
    pub fn remove(&self, name: &str) -> Option<Metric> {
        self.metrics.write().unwrap_or_else(PoisonError::into_inner).remove(name)
    }

    /// Unbinds every name.
    pub fn clear(&self) {
        self.metrics.write().unwrap_or_else(PoisonError::into_inner).clear();
    }

    /// Number of registered metrics.
    pub fn len(&self) -> usize {
        self.metrics.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether no metrics are registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry").field("names", &self.names()).finish_non_exhaustive()
    }
}
