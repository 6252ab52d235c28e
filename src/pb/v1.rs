//! The public `analyst.v1.Analyst` service.

use std::collections::HashMap;

use super::loggregator::Envelope;

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AnalystFilter {
    #[prost(string, tag = "1")]
    pub source_id: String,
    #[prost(message, optional, tag = "2")]
    pub time_range: Option<TimeRange>,
    #[prost(oneof = "analyst_filter::Envelopes", tags = "3, 4, 5")]
    pub envelopes: Option<analyst_filter::Envelopes>,
}

pub mod analyst_filter {
    /// The payload-specific part of a filter. At most one is set.
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Envelopes {
        #[prost(message, tag = "3")]
        Counter(super::CounterFilter),
        #[prost(message, tag = "4")]
        Log(super::LogFilter),
        #[prost(message, tag = "5")]
        Gauge(super::GaugeFilter),
    }
}

/// Half-open `[start, end)` interval in nanoseconds.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TimeRange {
    #[prost(int64, tag = "1")]
    pub start: i64,
    #[prost(int64, tag = "2")]
    pub end: i64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CounterFilter {
    #[prost(string, tag = "1")]
    pub name: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GaugeFilter {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(map = "string, message", tag = "2")]
    pub filter: HashMap<String, GaugeFilterValue>,
}

/// A gauge constraint. An unset `value` only requires the metric to exist.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GaugeFilterValue {
    #[prost(double, optional, tag = "1")]
    pub value: Option<f64>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct LogFilter {
    #[prost(oneof = "log_filter::Payload", tags = "1, 2")]
    pub payload: Option<log_filter::Payload>,
}

pub mod log_filter {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Payload {
        #[prost(bytes, tag = "1")]
        Match(Vec<u8>),
        #[prost(string, tag = "2")]
        Regexp(String),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct QueryInfo {
    #[prost(message, optional, tag = "1")]
    pub filter: Option<AnalystFilter>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct QueryResponse {
    #[prost(message, repeated, tag = "1")]
    pub envelopes: Vec<Envelope>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AggregateInfo {
    #[prost(message, optional, tag = "1")]
    pub query: Option<QueryInfo>,
    #[prost(int64, tag = "2")]
    pub bucket_width_ns: i64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AggregateResponse {
    #[prost(map = "int64, double", tag = "1")]
    pub results: HashMap<i64, f64>,
}

impl QueryInfo {
    pub fn filter(&self) -> Option<&AnalystFilter> {
        self.filter.as_ref()
    }

    /// The routing key of the request, empty when no filter was given.
    pub fn source_id(&self) -> &str {
        self.filter().map(|f| f.source_id.as_str()).unwrap_or_default()
    }
}

impl AggregateInfo {
    pub fn filter(&self) -> Option<&AnalystFilter> {
        self.query.as_ref().and_then(QueryInfo::filter)
    }

    pub fn source_id(&self) -> &str {
        self.query
            .as_ref()
            .map(QueryInfo::source_id)
            .unwrap_or_default()
    }
}

include!(concat!(env!("OUT_DIR"), "/analyst.v1.Analyst.rs"));
