//! The `aggregation` algorithm: sum a numeric metric into fixed-width time
//! buckets.
//!

use anyhow::{bail, Result};
use bytes::Bytes;

use super::filter::Filter;
use crate::pb::loggregator::Envelope;
use crate::pb::v1::{analyst_filter, AggregateInfo};
use crate::utils::{f64_from_bytes, f64_to_bytes};
use crate::*;

#[derive(Debug, Clone)]
enum Metric {
    CounterTotal,
    Gauge(String),
}

/// Keys each matching record by its bucket and emits the extracted metric
/// as a little-endian `f64`.
#[derive(Debug, Clone)]
pub struct Aggregation {
    filter: Filter,
    metric: Metric,
    bucket_width_ns: i64,
}

impl Aggregation {
    pub fn new(info: &AggregateInfo, filter: Filter) -> Result<Self> {
        let metric = match info.filter().and_then(|f| f.envelopes.as_ref()) {
            Some(analyst_filter::Envelopes::Counter(_)) => Metric::CounterTotal,
            Some(analyst_filter::Envelopes::Gauge(gauge)) => {
                if gauge.name.is_empty() {
                    bail!("missing name field");
                }
                Metric::Gauge(gauge.name.clone())
            }
            Some(analyst_filter::Envelopes::Log(_)) => bail!("invalid filter: log"),
            None => bail!("a counter or gauge filter is required"),
        };

        if info.bucket_width_ns <= 0 {
            bail!("invalid bucket_width_ns: {}", info.bucket_width_ns);
        }

        Ok(Self {
            filter,
            metric,
            bucket_width_ns: info.bucket_width_ns,
        })
    }

    // A gauge record missing the metric contributes 0.
    fn extract(&self, e: &Envelope) -> f64 {
        match &self.metric {
            Metric::CounterTotal => e.counter().map(|c| c.total as f64).unwrap_or_default(),
            Metric::Gauge(name) => e
                .gauge()
                .and_then(|g| g.metrics.get(name))
                .map(|v| v.value)
                .unwrap_or_default(),
        }
    }

    /// Truncating division, so negative timestamps round toward zero.
    fn bucket(&self, timestamp: i64) -> i64 {
        timestamp / self.bucket_width_ns * self.bucket_width_ns
    }
}

impl Mapper for Aggregation {
    fn map(&self, value: Bytes) -> MapOutput {
        let Some(e) = self.filter.decode_matching(&value)? else {
            return Ok(None);
        };
        let key = self.bucket(e.timestamp).to_string();
        Ok(Some(KeyValue::new(key, f64_to_bytes(self.extract(&e)))))
    }
}

/// Sums little-endian `f64` values.
#[derive(Debug, Clone, Copy, Default)]
pub struct SumF;

impl Reducer for SumF {
    fn reduce(&self, values: Box<dyn Iterator<Item = Bytes> + '_>) -> Result<Vec<Bytes>> {
        let mut total = 0f64;
        for value in values {
            total += f64_from_bytes(&value)?;
        }
        Ok(vec![f64_to_bytes(total)])
    }
}

pub fn build(info: &AggregateInfo) -> Result<Algorithm> {
    let filter = Filter::from_info(info)?;
    let mapper = Aggregation::new(info, filter)?;
    Ok(Algorithm::new(mapper, SumF))
}
