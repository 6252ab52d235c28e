//! The `timerange` algorithm: hand back every matching envelope verbatim.
//!

use anyhow::Result;
use bytes::Bytes;

use super::filter::Filter;
use crate::pb::v1::AggregateInfo;
use crate::*;

/// Keys each matching record by its timestamp and keeps the raw bytes as
/// the value, so the client gets the stored record back unchanged.
#[derive(Debug, Clone)]
pub struct Query {
    filter: Filter,
}

impl Query {
    pub fn new(filter: Filter) -> Self {
        Self { filter }
    }
}

impl Mapper for Query {
    fn map(&self, value: Bytes) -> MapOutput {
        let Some(e) = self.filter.decode_matching(&value)? else {
            return Ok(None);
        };
        Ok(Some(KeyValue::new(e.timestamp.to_string(), value)))
    }
}

/// Keeps one representative value per key.
///
/// Which value survives depends on the order the shards answered in.
#[derive(Debug, Clone, Copy, Default)]
pub struct First;

impl Reducer for First {
    fn reduce(&self, mut values: Box<dyn Iterator<Item = Bytes> + '_>) -> Result<Vec<Bytes>> {
        Ok(values.next().into_iter().collect())
    }
}

pub fn build(info: &AggregateInfo) -> Result<Algorithm> {
    let filter = Filter::from_info(info)?;
    Ok(Algorithm::new(Query::new(filter), First))
}
