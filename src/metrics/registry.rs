//! Process-wide metrics registry with Prometheus text exposition.
//!
//! [`MetricsRegistry`] owns every instrument for the lifetime of the
//! process. Instruments are registered once with a closed set of label
//! keys; label *values* are open and each new combination becomes a new
//! series. Mutations take a short, non-async lock on a single instrument,
//! so recording never suspends and never blocks on another instrument.

use std::fmt::{self, Write};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};

use super::histogram::HistogramSeries;
use crate::error::TrackerError;

/// Content type of [`MetricsRegistry::render_exposition`] output.
pub const EXPOSITION_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Kind of metric instrument.
#[derive(Debug, Clone, PartialEq)]
pub enum InstrumentKind {
    /// Monotonically increasing total.
    Counter,
    /// Point-in-time value; each set overwrites the previous one.
    Gauge,
    /// Observation counts in fixed, strictly increasing buckets.
    Histogram {
        /// Upper bounds of the buckets, excluding `+Inf`.
        buckets: Vec<f64>,
    },
}

impl InstrumentKind {
    const fn type_name(&self) -> &'static str {
        match self {
            Self::Counter => "counter",
            Self::Gauge => "gauge",
            Self::Histogram { .. } => "histogram",
        }
    }
}

impl fmt::Display for InstrumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

#[derive(Debug)]
enum Series {
    Value(f64),
    Histogram(HistogramSeries),
}

#[derive(Debug)]
struct Instrument {
    name: String,
    help: String,
    kind: InstrumentKind,
    label_keys: Vec<String>,
    /// Label values in declared key order, kept in first-seen order.
    series: Mutex<IndexMap<Vec<String>, Series>>,
}

impl Instrument {
    /// Orders `labels` by the declared keys.
    fn resolve_labels(&self, labels: &[(&str, &str)]) -> Result<Vec<String>, TrackerError> {
        let mismatch = || TrackerError::LabelCardinality {
            name: self.name.clone(),
            expected: self.label_keys.join(","),
            actual: labels.iter().map(|(k, _)| *k).collect::<Vec<_>>().join(","),
        };
        if labels.len() != self.label_keys.len() {
            return Err(mismatch());
        }
        self.label_keys
            .iter()
            .map(|key| {
                labels
                    .iter()
                    .find(|(k, _)| *k == key.as_str())
                    .map(|(_, v)| (*v).to_string())
                    .ok_or_else(mismatch)
            })
            .collect()
    }

    fn render_labels(&self, values: &[String]) -> String {
        let mut out = String::new();
        for (i, (key, value)) in self.label_keys.iter().zip(values).enumerate() {
            if i > 0 {
                out.push(',');
            }
            let _ = write!(out, "{key}=\"{}\"", escape_label_value(value));
        }
        out
    }

    fn write_exposition(&self, out: &mut String) {
        let _ = writeln!(out, "# HELP {} {}", self.name, escape_help(&self.help));
        let _ = writeln!(out, "# TYPE {} {}", self.name, self.kind);
        let series = self.series.lock();
        for (values, sample) in series.iter() {
            let labels = self.render_labels(values);
            match (sample, &self.kind) {
                (Series::Value(v), _) if labels.is_empty() => {
                    let _ = writeln!(out, "{} {}", self.name, format_value(*v));
                }
                (Series::Value(v), _) => {
                    let _ = writeln!(out, "{}{{{labels}}} {}", self.name, format_value(*v));
                }
                (Series::Histogram(h), InstrumentKind::Histogram { buckets }) => {
                    h.write_exposition(out, &self.name, &labels, buckets);
                }
                (Series::Histogram(_), _) => {}
            }
        }
    }
}

/// Registry of all metric instruments in the process.
///
/// Construct one at startup and share it behind an [`Arc`]. Rendering
/// lists instruments in registration order and, within an instrument,
/// series in the order their label combination was first recorded.
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    instruments: RwLock<IndexMap<String, Arc<Instrument>>>,
}

impl MetricsRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new instrument.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::DuplicateInstrument`] if `name` is already
    /// registered, or [`TrackerError::InvalidArgument`] if the name, a label
    /// key, or the histogram buckets are malformed.
    pub fn register_instrument(
        &self,
        kind: InstrumentKind,
        name: &str,
        help: &str,
        label_keys: &[&str],
    ) -> Result<(), TrackerError> {
        if !is_valid_name(name, true) {
            return Err(TrackerError::InvalidArgument(format!(
                "invalid metric name: {name:?}"
            )));
        }
        for (i, key) in label_keys.iter().enumerate() {
            if !is_valid_name(key, false) || *key == "le" {
                return Err(TrackerError::InvalidArgument(format!(
                    "invalid label key {key:?} for {name}"
                )));
            }
            if label_keys.iter().take(i).any(|k| k == key) {
                return Err(TrackerError::InvalidArgument(format!(
                    "label key {key:?} declared twice for {name}"
                )));
            }
        }
        if let InstrumentKind::Histogram { buckets } = &kind {
            let increasing = buckets.windows(2).all(|w| matches!(w, [a, b] if a < b));
            if buckets.is_empty() || !increasing || buckets.iter().any(|b| !b.is_finite()) {
                return Err(TrackerError::InvalidArgument(format!(
                    "histogram {name} needs finite, strictly increasing buckets"
                )));
            }
        }

        let mut instruments = self.instruments.write();
        if instruments.contains_key(name) {
            return Err(TrackerError::DuplicateInstrument(name.to_string()));
        }
        instruments.insert(
            name.to_string(),
            Arc::new(Instrument {
                name: name.to_string(),
                help: help.to_string(),
                kind,
                label_keys: label_keys.iter().map(|k| (*k).to_string()).collect(),
                series: Mutex::new(IndexMap::new()),
            }),
        );
        Ok(())
    }

    /// Adds `amount` to a counter series.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::UnknownInstrument`] if no counter named
    /// `name` exists, [`TrackerError::LabelCardinality`] if the label keys
    /// differ from the declared ones, or [`TrackerError::InvalidArgument`]
    /// for a negative or non-finite amount.
    pub fn increment_counter(
        &self,
        name: &str,
        labels: &[(&str, &str)],
        amount: f64,
    ) -> Result<(), TrackerError> {
        if !amount.is_finite() || amount < 0.0 {
            return Err(TrackerError::InvalidArgument(format!(
                "counter {name} cannot be incremented by {amount}"
            )));
        }
        let instrument = self.lookup(name, |k| matches!(k, InstrumentKind::Counter))?;
        let key = instrument.resolve_labels(labels)?;
        let mut series = instrument.series.lock();
        match series.entry(key).or_insert(Series::Value(0.0)) {
            Series::Value(v) => *v += amount,
            Series::Histogram(_) => {}
        }
        Ok(())
    }

    /// Overwrites a gauge series with `value`.
    ///
    /// Concurrent writers to the same series race; the last one wins.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::UnknownInstrument`] if no gauge named `name`
    /// exists, or [`TrackerError::LabelCardinality`] if the label keys
    /// differ from the declared ones.
    pub fn set_gauge(
        &self,
        name: &str,
        labels: &[(&str, &str)],
        value: f64,
    ) -> Result<(), TrackerError> {
        let instrument = self.lookup(name, |k| matches!(k, InstrumentKind::Gauge))?;
        let key = instrument.resolve_labels(labels)?;
        instrument.series.lock().insert(key, Series::Value(value));
        Ok(())
    }

    /// Records one observation in a histogram series.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::UnknownInstrument`] if no histogram named
    /// `name` exists, or [`TrackerError::LabelCardinality`] if the label
    /// keys differ from the declared ones.
    pub fn observe_histogram(
        &self,
        name: &str,
        labels: &[(&str, &str)],
        value: f64,
    ) -> Result<(), TrackerError> {
        let instrument = self.lookup(name, |k| matches!(k, InstrumentKind::Histogram { .. }))?;
        let InstrumentKind::Histogram { buckets } = &instrument.kind else {
            return Err(TrackerError::UnknownInstrument(name.to_string()));
        };
        let key = instrument.resolve_labels(labels)?;
        let mut series = instrument.series.lock();
        let entry = series
            .entry(key)
            .or_insert_with(|| Series::Histogram(HistogramSeries::new(buckets.len())));
        if let Series::Histogram(h) = entry {
            h.observe(buckets, value);
        }
        Ok(())
    }

    /// Returns the current value of a counter or gauge series, or the
    /// observation count of a histogram series. `None` means the label
    /// combination has not been recorded yet.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::UnknownInstrument`] or
    /// [`TrackerError::LabelCardinality`] as the mutators do.
    pub fn value(&self, name: &str, labels: &[(&str, &str)]) -> Result<Option<f64>, TrackerError> {
        let instrument = self.lookup(name, |_| true)?;
        let key = instrument.resolve_labels(labels)?;
        let series = instrument.series.lock();
        Ok(series.get(&key).map(|s| match s {
            Series::Value(v) => *v,
            #[allow(clippy::cast_precision_loss)]
            Series::Histogram(h) => h.count() as f64,
        }))
    }

    /// Names of all registered instruments, in registration order.
    #[must_use]
    pub fn instrument_names(&self) -> Vec<String> {
        self.instruments.read().keys().cloned().collect()
    }

    /// Renders every instrument in the Prometheus text exposition format.
    #[must_use]
    pub fn render_exposition(&self) -> String {
        let instruments: Vec<Arc<Instrument>> =
            self.instruments.read().values().map(Arc::clone).collect();
        let mut out = String::with_capacity(256 * instruments.len().max(1));
        for (i, instrument) in instruments.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            instrument.write_exposition(&mut out);
        }
        out
    }

    fn lookup(
        &self,
        name: &str,
        accepts: impl Fn(&InstrumentKind) -> bool,
    ) -> Result<Arc<Instrument>, TrackerError> {
        self.instruments
            .read()
            .get(name)
            .filter(|i| accepts(&i.kind))
            .map(Arc::clone)
            .ok_or_else(|| TrackerError::UnknownInstrument(name.to_string()))
    }
}

/// Formats a sample value the way Prometheus parsers expect.
pub(crate) fn format_value(v: f64) -> String {
    if v.is_nan() {
        "NaN".to_string()
    } else if v.is_infinite() {
        if v > 0.0 { "+Inf" } else { "-Inf" }.to_string()
    } else {
        v.to_string()
    }
}

fn escape_label_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            c => out.push(c),
        }
    }
    out
}

fn escape_help(help: &str) -> String {
    help.replace('\\', "\\\\").replace('\n', "\\n")
}

/// Metric names may contain `:`; label keys may not.
fn is_valid_name(name: &str, allow_colon: bool) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    let head_ok = first.is_ascii_alphabetic() || first == '_' || (allow_colon && first == ':');
    head_ok && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || (allow_colon && c == ':'))
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn registry_with_counter() -> MetricsRegistry {
        let registry = MetricsRegistry::new();
        let result = registry.register_instrument(
            InstrumentKind::Counter,
            "events_total",
            "Total events",
            &["level", "service"],
        );
        assert!(result.is_ok());
        registry
    }

    #[test]
    fn duplicate_registration_fails() {
        let registry = registry_with_counter();
        let again =
            registry.register_instrument(InstrumentKind::Gauge, "events_total", "dup", &[]);
        assert!(matches!(again, Err(TrackerError::DuplicateInstrument(n)) if n == "events_total"));
    }

    #[test]
    fn unknown_instrument_fails() {
        let registry = MetricsRegistry::new();
        let result = registry.increment_counter("missing_total", &[], 1.0);
        assert!(matches!(result, Err(TrackerError::UnknownInstrument(_))));
        let result = registry.set_gauge("missing", &[], 1.0);
        assert!(matches!(result, Err(TrackerError::UnknownInstrument(_))));
        let result = registry.observe_histogram("missing", &[], 1.0);
        assert!(matches!(result, Err(TrackerError::UnknownInstrument(_))));
    }

    #[test]
    fn wrong_kind_is_unknown() {
        let registry = registry_with_counter();
        let result = registry.set_gauge("events_total", &[("level", "INFO"), ("service", "api")], 1.0);
        assert!(matches!(result, Err(TrackerError::UnknownInstrument(_))));
    }

    #[test]
    fn label_keys_must_match_declaration() {
        let registry = registry_with_counter();
        let missing = registry.increment_counter("events_total", &[("level", "INFO")], 1.0);
        assert!(matches!(missing, Err(TrackerError::LabelCardinality { .. })));

        let renamed = registry.increment_counter(
            "events_total",
            &[("level", "INFO"), ("host", "a")],
            1.0,
        );
        assert!(matches!(renamed, Err(TrackerError::LabelCardinality { .. })));

        let extra = registry.increment_counter(
            "events_total",
            &[("level", "INFO"), ("service", "api"), ("host", "a")],
            1.0,
        );
        assert!(matches!(extra, Err(TrackerError::LabelCardinality { .. })));
    }

    #[test]
    fn label_order_does_not_matter() {
        let registry = registry_with_counter();
        let a = registry.increment_counter("events_total", &[("level", "INFO"), ("service", "api")], 1.0);
        let b = registry.increment_counter("events_total", &[("service", "api"), ("level", "INFO")], 2.0);
        assert!(a.is_ok() && b.is_ok());
        let value = registry.value("events_total", &[("level", "INFO"), ("service", "api")]);
        assert!(matches!(value, Ok(Some(v)) if (v - 3.0).abs() < f64::EPSILON));
    }

    #[test]
    fn negative_counter_increment_rejected() {
        let registry = registry_with_counter();
        let result = registry.increment_counter(
            "events_total",
            &[("level", "INFO"), ("service", "api")],
            -1.0,
        );
        assert!(matches!(result, Err(TrackerError::InvalidArgument(_))));
    }

    #[test]
    fn invalid_names_rejected() {
        let registry = MetricsRegistry::new();
        let bad_name = registry.register_instrument(InstrumentKind::Counter, "1bad", "", &[]);
        assert!(matches!(bad_name, Err(TrackerError::InvalidArgument(_))));
        let bad_key = registry.register_instrument(InstrumentKind::Counter, "ok", "", &["a-b"]);
        assert!(matches!(bad_key, Err(TrackerError::InvalidArgument(_))));
        let reserved = registry.register_instrument(
            InstrumentKind::Histogram { buckets: vec![1.0] },
            "h",
            "",
            &["le"],
        );
        assert!(matches!(reserved, Err(TrackerError::InvalidArgument(_))));
        let unordered = registry.register_instrument(
            InstrumentKind::Histogram { buckets: vec![2.0, 1.0] },
            "h2",
            "",
            &[],
        );
        assert!(matches!(unordered, Err(TrackerError::InvalidArgument(_))));
        assert!(registry.instrument_names().is_empty());
    }

    #[test]
    fn gauge_last_write_wins() {
        let registry = MetricsRegistry::new();
        let _ = registry.register_instrument(InstrumentKind::Gauge, "temp", "Temperature", &["room"]);
        let _ = registry.set_gauge("temp", &[("room", "a")], 20.0);
        let _ = registry.set_gauge("temp", &[("room", "a")], 18.5);
        let value = registry.value("temp", &[("room", "a")]);
        assert!(matches!(value, Ok(Some(v)) if (v - 18.5).abs() < f64::EPSILON));
    }

    #[test]
    fn unseen_series_has_no_value() {
        let registry = registry_with_counter();
        let value = registry.value("events_total", &[("level", "WARN"), ("service", "auth")]);
        assert!(matches!(value, Ok(None)));
    }

    #[test]
    fn render_follows_registration_then_insertion_order() {
        let registry = MetricsRegistry::new();
        let _ = registry.register_instrument(InstrumentKind::Gauge, "zeta", "Last alphabetically", &["k"]);
        let _ = registry.register_instrument(InstrumentKind::Counter, "alpha_total", "First alphabetically", &[]);
        let _ = registry.set_gauge("zeta", &[("k", "b")], 2.0);
        let _ = registry.set_gauge("zeta", &[("k", "a")], 1.0);
        let _ = registry.increment_counter("alpha_total", &[], 1.0);

        let text = registry.render_exposition();
        let expected = "# HELP zeta Last alphabetically\n\
                        # TYPE zeta gauge\n\
                        zeta{k=\"b\"} 2\n\
                        zeta{k=\"a\"} 1\n\
                        \n\
                        # HELP alpha_total First alphabetically\n\
                        # TYPE alpha_total counter\n\
                        alpha_total 1\n";
        assert_eq!(text, expected);
    }

    #[test]
    fn registered_but_unused_instrument_renders_header_only() {
        let registry = registry_with_counter();
        assert_eq!(
            registry.render_exposition(),
            "# HELP events_total Total events\n# TYPE events_total counter\n"
        );
    }

    #[test]
    fn label_values_are_escaped() {
        let registry = MetricsRegistry::new();
        let _ = registry.register_instrument(InstrumentKind::Gauge, "g", "help", &["path"]);
        let _ = registry.set_gauge("g", &[("path", "a\"b\\c\nd")], 1.0);
        let text = registry.render_exposition();
        assert!(text.contains("g{path=\"a\\\"b\\\\c\\nd\"} 1\n"));
    }

    #[test]
    fn histogram_renders_buckets() {
        let registry = MetricsRegistry::new();
        let _ = registry.register_instrument(
            InstrumentKind::Histogram { buckets: vec![0.1, 1.0] },
            "latency_seconds",
            "Latency",
            &["op"],
        );
        let _ = registry.observe_histogram("latency_seconds", &[("op", "select")], 0.05);
        let text = registry.render_exposition();
        assert!(text.contains("# TYPE latency_seconds histogram\n"));
        assert!(text.contains("latency_seconds_bucket{op=\"select\",le=\"0.1\"} 1\n"));
        assert!(text.contains("latency_seconds_bucket{op=\"select\",le=\"+Inf\"} 1\n"));
        assert!(text.contains("latency_seconds_count{op=\"select\"} 1\n"));
    }

    #[test]
    fn special_values_format() {
        assert_eq!(format_value(f64::INFINITY), "+Inf");
        assert_eq!(format_value(f64::NEG_INFINITY), "-Inf");
        assert_eq!(format_value(f64::NAN), "NaN");
        assert_eq!(format_value(45.2), "45.2");
        assert_eq!(format_value(120.0), "120");
    }

    #[test]
    fn concurrent_counter_increments_accumulate() {
        use std::thread;

        let registry = Arc::new(registry_with_counter());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || {
                    let service = if t % 2 == 0 { "api" } else { "auth" };
                    for _ in 0..1000 {
                        let _ = registry.increment_counter(
                            "events_total",
                            &[("level", "INFO"), ("service", service)],
                            1.0,
                        );
                    }
                })
            })
            .collect();
        for handle in handles {
            assert!(handle.join().is_ok());
        }

        for service in ["api", "auth"] {
            let value = registry.value("events_total", &[("level", "INFO"), ("service", service)]);
            assert!(matches!(value, Ok(Some(v)) if (v - 4000.0).abs() < f64::EPSILON));
        }
    }
}
