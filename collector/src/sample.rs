use prometheus::Opts;
use std::{
    collections::HashMap,
    sync::Arc,
};
use thiserror::Error;

/// Prefix shared by every metric of the exporter.
pub const NAMESPACE: &str = "brigade";

/// Joins the non-empty parts with `_`, e.g. `brigade_build_duration_seconds`.
pub fn fq_name(namespace: &str, subsystem: &str, name: &str) -> String {
    Opts::new(name, "").namespace(namespace).subsystem(subsystem).fq_name()
}

#[derive(Debug, Error)]
pub enum MetricError {
    #[error("invalid metric description for {metric:?}")]
    InvalidDesc {
        metric: String,
        #[source]
        source: prometheus::Error,
    },
    #[error("{metric} takes {expected} label values, got {got}")]
    LabelCount {
        metric: String,
        expected: usize,
        got: usize,
    },
}

/// Describes a metric family: its name, help text and label names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Desc {
    fq_name: String,
    help: String,
    label_names: Vec<&'static str>,
}

impl Desc {
    /// Fails on names, help texts or label names Prometheus would not accept.
    pub fn new(
        fq_name: impl Into<String>,
        help: impl Into<String>,
        label_names: &[&'static str],
    ) -> Result<Self, MetricError> {
        let fq_name = fq_name.into();
        let help = help.into();
        prometheus::core::Desc::new(
            fq_name.clone(),
            help.clone(),
            label_names.iter().map(|name| name.to_string()).collect(),
            HashMap::new(),
        )
        .map_err(|source| MetricError::InvalidDesc {
            metric: fq_name.clone(),
            source,
        })?;

        Ok(Self {
            fq_name,
            help,
            label_names: label_names.to_vec(),
        })
    }

    pub fn fq_name(&self) -> &str {
        &self.fq_name
    }

    pub fn help(&self) -> &str {
        &self.help
    }

    pub fn label_names(&self) -> &[&'static str] {
        &self.label_names
    }
}

/// One gauge measurement of a metric family.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    desc: Arc<Desc>,
    label_values: Vec<String>,
    value: f64,
}

impl Sample {
    /// `label_values` are matched positionally with the label names of `desc`.
    pub fn new<V: Into<String>>(
        desc: Arc<Desc>,
        value: f64,
        label_values: impl IntoIterator<Item = V>,
    ) -> Result<Self, MetricError> {
        let label_values: Vec<String> = label_values.into_iter().map(Into::into).collect();
        if label_values.len() != desc.label_names.len() {
            return Err(MetricError::LabelCount {
                metric: desc.fq_name.clone(),
                expected: desc.label_names.len(),
                got: label_values.len(),
            });
        }
        Ok(Self {
            desc,
            label_values,
            value,
        })
    }

    pub fn desc(&self) -> &Desc {
        &self.desc
    }

    pub fn name(&self) -> &str {
        self.desc.fq_name()
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn labels(&self) -> impl Iterator<Item = (&'static str, &str)> + '_ {
        self.desc
            .label_names
            .iter()
            .copied()
            .zip(self.label_values.iter().map(String::as_str))
    }

    pub fn label(&self, name: &str) -> Option<&str> {
        self.labels().find(|(label, _)| *label == name).map(|(_, value)| value)
    }
}
