//! Converts algorithm names and serialized request parameters into
//! runnable [`Algorithm`]s.
//!
//! # Example
//!
//! ```
//! # use anyhow::Result;
//! use mranalyst::workload::{Registry, TIMERANGE};
//! use mranalyst::pb::v1::AggregateInfo;
//! use prost::Message;
//! # fn main() -> Result<()> {
//! let registry = Registry::default();
//! let meta = AggregateInfo::default().encode_to_vec();
//! let alg = registry.build(TIMERANGE, &meta)?;
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::error::Error;
use std::fmt;

use anyhow::{bail, Context, Result};
use prost::Message;

use crate::pb::v1::AggregateInfo;
use crate::Algorithm;

pub mod aggregation;
pub mod filter;
pub mod timerange;

/// Passes every matching envelope through, one per timestamp.
pub const TIMERANGE: &str = "timerange";
/// Sums a counter or gauge into time buckets.
pub const AGGREGATION: &str = "aggregation";

/// Builds an [`Algorithm`] from deserialized request parameters.
pub type AlgBuilder = fn(&AggregateInfo) -> Result<Algorithm>;

/// The fixed table of algorithms this node knows how to run.
#[derive(Clone)]
pub struct Registry {
    builders: HashMap<&'static str, AlgBuilder>,
}

impl Registry {
    pub fn new(builders: impl IntoIterator<Item = (&'static str, AlgBuilder)>) -> Self {
        Self {
            builders: builders.into_iter().collect(),
        }
    }

    /// Gets the builder named `name`.
    ///
    /// Returns [`None`] if no algorithm with the given name was found.
    pub fn try_named(&self, name: &str) -> Option<AlgBuilder> {
        self.builders.get(name).copied()
    }

    /// Gets the builder named `name`.
    ///
    /// Returns an [`anyhow::Error`] if no algorithm with the given name was found.
    pub fn named(&self, name: &str) -> Result<AlgBuilder> {
        match self.try_named(name) {
            Some(builder) => Ok(builder),
            None => bail!("unknown alg `{}`", name),
        }
    }

    /// Decodes `meta` as an [`AggregateInfo`] and builds the algorithm
    /// `name` from it.
    ///
    /// Every failure is reported as a [`BuildError`], so callers can tell a
    /// bad request apart from a failure while running it.
    pub fn build(&self, name: &str, meta: &[u8]) -> Result<Algorithm> {
        self.try_build(name, meta).map_err(|source| {
            anyhow::Error::new(BuildError {
                name: name.to_string(),
                source,
            })
        })
    }

    fn try_build(&self, name: &str, meta: &[u8]) -> Result<Algorithm> {
        let builder = self.named(name)?;
        let info = AggregateInfo::decode(meta)
            .with_context(|| format!("malformed parameters (len={})", meta.len()))?;
        builder(&info)
    }
}

/// An algorithm could not be built from a request.
#[derive(Debug)]
pub struct BuildError {
    name: String,
    source: anyhow::Error,
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unable to build `{}`", self.name)
    }
}

impl Error for BuildError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&*self.source)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new([
            (TIMERANGE, timerange::build as AlgBuilder),
            (AGGREGATION, aggregation::build as AlgBuilder),
        ])
    }
}
