//! The public `analyst.v1.Analyst` service.
//!
//! Requests are validated here, turned into algorithm parameters and handed
//! to a [`Calculator`]. The merged byte results are decoded back into typed
//! responses; entries that fail to decode are logged and left out.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use prost::Message;
use tonic::{Request, Response, Status};
use tracing::warn;

use super::to_status;
use crate::mapreduce::{Calculator, Results};
use crate::pb::loggregator::Envelope;
use crate::pb::v1::analyst_server::Analyst;
use crate::pb::v1::{analyst_filter, AggregateInfo, AggregateResponse, QueryInfo, QueryResponse};
use crate::utils::f64_from_bytes;
use crate::workload::{AGGREGATION, TIMERANGE};

pub struct AnalystService {
    calculator: Arc<dyn Calculator>,
}

impl AnalystService {
    pub fn new(calculator: Arc<dyn Calculator>) -> Self {
        Self { calculator }
    }

    /// Runs `alg` over every shard `params` routes to. Filters that cannot
    /// be compiled come back as `invalid_argument`.
    async fn run(&self, alg: &str, params: &AggregateInfo) -> Result<Results, Status> {
        let meta = params.encode_to_vec();
        self.calculator
            .calculate(params.source_id(), alg, &meta)
            .await
            .map_err(to_status)
    }
}

#[tonic::async_trait]
impl Analyst for AnalystService {
    async fn query(&self, request: Request<QueryInfo>) -> Result<Response<QueryResponse>, Status> {
        let info = request.into_inner();
        if info.source_id().is_empty() {
            return Err(Status::invalid_argument("source_id is required"));
        }

        let params = AggregateInfo {
            query: Some(info),
            bucket_width_ns: 0,
        };
        let results = self.run(TIMERANGE, &params).await?;

        Ok(Response::new(QueryResponse {
            envelopes: to_envelopes(results),
        }))
    }

    async fn aggregate(
        &self,
        request: Request<AggregateInfo>,
    ) -> Result<Response<AggregateResponse>, Status> {
        let info = request.into_inner();
        if info.source_id().is_empty() {
            return Err(Status::invalid_argument("source_id is required"));
        }
        match info.filter().and_then(|f| f.envelopes.as_ref()) {
            Some(analyst_filter::Envelopes::Counter(_) | analyst_filter::Envelopes::Gauge(_)) => {}
            _ => return Err(Status::invalid_argument("a counter or gauge filter is required")),
        }
        if info.bucket_width_ns == 0 {
            return Err(Status::invalid_argument("bucket_width_ns is required"));
        }

        let results = self.run(AGGREGATION, &info).await?;

        Ok(Response::new(AggregateResponse {
            results: to_buckets(results),
        }))
    }
}

fn to_envelopes(results: Results) -> Vec<Envelope> {
    let total = results.len();
    let envelopes: Vec<Envelope> = results
        .into_iter()
        .filter_map(|(key, raw)| match Envelope::decode(raw.as_slice()) {
            Ok(e) => Some(e),
            Err(err) => {
                warn!(%key, len = raw.len(), %err, "dropping undecodable envelope");
                None
            }
        })
        .collect();

    if envelopes.len() < total {
        warn!(dropped = total - envelopes.len(), total, "incomplete query result");
    }
    envelopes
}

fn to_buckets(results: Results) -> HashMap<i64, f64> {
    let total = results.len();
    let mut buckets = HashMap::with_capacity(total);
    for (key, raw) in results {
        match to_bucket(&key, &raw) {
            Ok((timestamp, value)) => {
                buckets.insert(timestamp, value);
            }
            Err(err) => warn!(%key, "dropping bucket: {err:#}"),
        }
    }

    if buckets.len() < total {
        warn!(dropped = total - buckets.len(), total, "incomplete aggregate result");
    }
    buckets
}

fn to_bucket(key: &str, raw: &[u8]) -> Result<(i64, f64)> {
    let timestamp = key
        .parse()
        .with_context(|| format!("invalid bucket key `{key}`"))?;
    Ok((timestamp, f64_from_bytes(raw)?))
}
