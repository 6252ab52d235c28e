//! The predicate that decides whether a stored envelope matches a request.
//!

use std::collections::HashMap;

use anyhow::{bail, Context, Result};
use prost::Message;
use regex::bytes::Regex;

use crate::pb::loggregator::Envelope;
use crate::pb::v1::{analyst_filter, log_filter, AggregateInfo, AnalystFilter};

/// A compiled request filter.
///
/// Every configured check must pass for an envelope to match. Checks that
/// were not configured always pass.
#[derive(Debug, Clone)]
pub struct Filter {
    source_id: String,
    time_range: Option<(i64, i64)>,
    envelopes: Option<EnvelopeFilter>,
}

#[derive(Debug, Clone)]
enum EnvelopeFilter {
    Counter {
        name: String,
    },
    Gauge {
        constraints: HashMap<String, Option<f64>>,
    },
    Log(LogMatch),
}

#[derive(Debug, Clone)]
enum LogMatch {
    Any,
    Exact(Vec<u8>),
    Pattern(Regex),
}

impl Filter {
    /// Compiles the filter of an [`AggregateInfo`]. A missing filter only
    /// matches envelopes without a source id.
    pub fn from_info(info: &AggregateInfo) -> Result<Self> {
        let default = AnalystFilter::default();
        Self::new(info.filter().unwrap_or(&default))
    }

    pub fn new(filter: &AnalystFilter) -> Result<Self> {
        let envelopes = match &filter.envelopes {
            None => None,
            Some(analyst_filter::Envelopes::Counter(counter)) => Some(EnvelopeFilter::Counter {
                name: counter.name.clone(),
            }),
            Some(analyst_filter::Envelopes::Gauge(gauge)) => {
                if !gauge.name.is_empty()
                    && !gauge.filter.is_empty()
                    && !gauge.filter.contains_key(&gauge.name)
                {
                    bail!("gauge filter map must include name `{}`", gauge.name);
                }
                let constraints = gauge
                    .filter
                    .iter()
                    .map(|(name, value)| (name.clone(), value.value))
                    .collect();
                Some(EnvelopeFilter::Gauge { constraints })
            }
            Some(analyst_filter::Envelopes::Log(log)) => {
                let matcher = match &log.payload {
                    Some(log_filter::Payload::Match(bytes)) if !bytes.is_empty() => {
                        LogMatch::Exact(bytes.clone())
                    }
                    Some(log_filter::Payload::Regexp(pattern)) if !pattern.is_empty() => {
                        let regex = Regex::new(pattern)
                            .with_context(|| format!("invalid regexp `{pattern}`"))?;
                        LogMatch::Pattern(regex)
                    }
                    _ => LogMatch::Any,
                };
                Some(EnvelopeFilter::Log(matcher))
            }
        };

        Ok(Self {
            source_id: filter.source_id.clone(),
            time_range: filter.time_range.as_ref().map(|r| (r.start, r.end)),
            envelopes,
        })
    }

    /// Decodes a raw stored record and returns it only if it matches.
    pub fn decode_matching(&self, raw: &[u8]) -> Result<Option<Envelope>> {
        let e = Envelope::decode(raw)
            .with_context(|| format!("malformed envelope (len={})", raw.len()))?;
        Ok(self.matches(&e).then_some(e))
    }

    pub fn matches(&self, e: &Envelope) -> bool {
        self.source_id == e.source_id && self.within_time_range(e) && self.matches_payload(e)
    }

    fn within_time_range(&self, e: &Envelope) -> bool {
        match self.time_range {
            None => true,
            Some((start, end)) => start <= e.timestamp && e.timestamp < end,
        }
    }

    fn matches_payload(&self, e: &Envelope) -> bool {
        match &self.envelopes {
            None => true,
            Some(EnvelopeFilter::Counter { name }) => match e.counter() {
                Some(counter) => name.is_empty() || *name == counter.name,
                None => false,
            },
            Some(EnvelopeFilter::Log(matcher)) => match e.log() {
                Some(log) => match matcher {
                    LogMatch::Any => true,
                    LogMatch::Exact(expected) => *expected == log.payload,
                    LogMatch::Pattern(regex) => regex.is_match(&log.payload),
                },
                None => false,
            },
            Some(EnvelopeFilter::Gauge { constraints }) => match e.gauge() {
                Some(gauge) => constraints.iter().all(|(name, expected)| {
                    match (gauge.metrics.get(name), expected) {
                        (None, _) => false,
                        (Some(_), None) => true,
                        (Some(actual), Some(expected)) => actual.value == *expected,
                    }
                }),
                None => false,
            },
        }
    }
}
