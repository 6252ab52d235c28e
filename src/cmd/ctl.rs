use std::collections::HashMap;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::pb::v1::{
    analyst_filter, log_filter, AggregateInfo, AnalystFilter, CounterFilter, GaugeFilter,
    GaugeFilterValue, LogFilter, QueryInfo, TimeRange,
};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    #[clap(subcommand)]
    pub command: Commands,
    /// Public address of any analyst
    #[clap(short = 'J', long, default_value = "127.0.0.1:50051")]
    pub host: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch the envelopes that match a filter
    Query {
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Sum a counter or gauge into time buckets
    Aggregate {
        #[command(flatten)]
        filter: FilterArgs,

        /// Bucket width in nanoseconds
        #[arg(short, long)]
        width: i64,
    },
}

#[derive(clap::Args, Debug)]
pub struct FilterArgs {
    /// Source id to read, also used for routing
    #[arg(short, long)]
    pub source_id: String,

    /// Start of the time range (inclusive), in nanoseconds
    #[arg(long)]
    pub start: Option<i64>,

    /// End of the time range (exclusive), in nanoseconds
    #[arg(long)]
    pub end: Option<i64>,

    /// Only counters, optionally only the one with this name
    #[arg(long, num_args = 0..=1, default_missing_value = "", group = "envelopes")]
    pub counter: Option<String>,

    /// Only gauges; aggregations sum the metric with this name
    #[arg(long, num_args = 0..=1, default_missing_value = "", group = "envelopes")]
    pub gauge: Option<String>,

    /// Gauge metrics that must be present, as NAME or NAME=VALUE
    #[arg(long = "metric", requires = "gauge")]
    pub metrics: Vec<String>,

    /// Only logs whose payload is exactly this
    #[arg(long, group = "envelopes")]
    pub log_match: Option<String>,

    /// Only logs whose payload matches this regular expression
    #[arg(long, group = "envelopes")]
    pub log_regexp: Option<String>,
}

impl FilterArgs {
    pub fn to_filter(&self) -> Result<AnalystFilter> {
        let time_range = match (self.start, self.end) {
            (None, None) => None,
            (start, end) => Some(TimeRange {
                start: start.unwrap_or(i64::MIN),
                end: end.unwrap_or(i64::MAX),
            }),
        };

        let envelopes = if let Some(name) = &self.counter {
            Some(analyst_filter::Envelopes::Counter(CounterFilter { name: name.clone() }))
        } else if let Some(name) = &self.gauge {
            let filter = self
                .metrics
                .iter()
                .map(|m| parse_metric(m))
                .collect::<Result<HashMap<_, _>>>()?;
            Some(analyst_filter::Envelopes::Gauge(GaugeFilter {
                name: name.clone(),
                filter,
            }))
        } else if let Some(payload) = &self.log_match {
            Some(analyst_filter::Envelopes::Log(LogFilter {
                payload: Some(log_filter::Payload::Match(payload.clone().into_bytes())),
            }))
        } else {
            self.log_regexp.as_ref().map(|pattern| {
                analyst_filter::Envelopes::Log(LogFilter {
                    payload: Some(log_filter::Payload::Regexp(pattern.clone())),
                })
            })
        };

        Ok(AnalystFilter {
            source_id: self.source_id.clone(),
            time_range,
            envelopes,
        })
    }

    pub fn to_query(&self) -> Result<QueryInfo> {
        Ok(QueryInfo {
            filter: Some(self.to_filter()?),
        })
    }

    pub fn to_aggregate(&self, bucket_width_ns: i64) -> Result<AggregateInfo> {
        Ok(AggregateInfo {
            query: Some(self.to_query()?),
            bucket_width_ns,
        })
    }
}

fn parse_metric(metric: &str) -> Result<(String, GaugeFilterValue)> {
    match metric.split_once('=') {
        None => Ok((metric.to_string(), GaugeFilterValue { value: None })),
        Some((name, value)) => {
            let value = value
                .parse()
                .with_context(|| format!("invalid value for metric `{name}`"))?;
            Ok((name.to_string(), GaugeFilterValue { value: Some(value) }))
        }
    }
}
