//! Prometheus text exposition of the samples of one cycle.

use crate::sample::Sample;
use eyre::{
    Result,
    WrapErr as _,
};
use prometheus::{
    proto::{
        Gauge,
        LabelPair,
        Metric,
        MetricFamily,
        MetricType,
    },
    Encoder as _,
    TextEncoder,
};
use std::collections::BTreeMap;

/// Content type of [`encode_text`] output.
pub const TEXT_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

/// Renders the samples grouped by metric family, every family typed as a gauge.
///
/// Families are sorted by name, samples within a family by their labels.
pub fn encode_text<'a>(samples: impl IntoIterator<Item = &'a Sample>) -> Result<String> {
    let mut grouped: BTreeMap<&str, Vec<&Sample>> = BTreeMap::new();
    for sample in samples {
        grouped.entry(sample.name()).or_default().push(sample);
    }

    let families: Vec<MetricFamily> = grouped.into_values().map(family).collect();
    let mut out = String::new();
    TextEncoder::new()
        .encode_utf8(&families, &mut out)
        .wrap_err("Failed to encode metric families")?;
    Ok(out)
}

fn family(samples: Vec<&Sample>) -> MetricFamily {
    let mut family = MetricFamily::default();
    if let Some(first) = samples.first() {
        family.set_name(first.name().to_string());
        family.set_help(first.desc().help().to_string());
    }
    family.set_field_type(MetricType::GAUGE);

    let mut metrics: Vec<(Vec<(&str, &str)>, f64)> = samples
        .iter()
        .map(|sample| {
            let mut labels: Vec<_> = sample.labels().collect();
            labels.sort_by_key(|(name, _)| *name);
            (labels, sample.value())
        })
        .collect();
    metrics.sort_by(|(a, _), (b, _)| a.cmp(b));

    let metrics: Vec<Metric> = metrics.into_iter().map(|(labels, value)| metric(labels, value)).collect();
    family.set_metric(metrics.into());
    family
}

fn metric(labels: Vec<(&str, &str)>, value: f64) -> Metric {
    let labels: Vec<LabelPair> = labels
        .into_iter()
        .map(|(name, value)| {
            let mut pair = LabelPair::default();
            pair.set_name(name.to_string());
            pair.set_value(value.to_string());
            pair
        })
        .collect();

    let mut gauge = Gauge::default();
    gauge.set_value(value);

    let mut metric = Metric::default();
    metric.set_label(labels.into());
    metric.set_gauge(gauge);
    metric
}
