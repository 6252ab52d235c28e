use std::collections::HashMap;

use anyhow::Result;
use clap::Parser;
use tonic::Request;

use mranalyst::cmd::ctl::{Args, Commands};
use mranalyst::pb::loggregator::{envelope, Envelope};
use mranalyst::pb::v1::analyst_client::AnalystClient;

fn display_envelopes(mut envelopes: Vec<Envelope>) {
    if envelopes.is_empty() {
        println!("No matching envelopes");
        return;
    }
    envelopes.sort_by_key(|e| e.timestamp);
    for e in envelopes {
        let payload = match &e.message {
            Some(envelope::Message::Log(log)) => {
                format!("LOG: [{}]", String::from_utf8_lossy(&log.payload))
            }
            Some(envelope::Message::Counter(c)) => {
                format!("COUNTER: [{}]\tTOTAL: [{}]\tDELTA: [{}]", c.name, c.total, c.delta)
            }
            Some(envelope::Message::Gauge(g)) => {
                let mut metrics: Vec<_> = g.metrics.iter().collect();
                metrics.sort_by(|a, b| a.0.cmp(b.0));
                let metrics: Vec<String> = metrics
                    .into_iter()
                    .map(|(name, v)| format!("{name}={}{}", v.value, v.unit))
                    .collect();
                format!("GAUGE: [{}]", metrics.join(", "))
            }
            None => "EMPTY".to_string(),
        };
        println!("[{}]\tSOURCE: [{}]\t{}", e.timestamp, e.source_id, payload);
    }
}

fn display_buckets(results: HashMap<i64, f64>) {
    if results.is_empty() {
        println!("No matching buckets");
        return;
    }
    let mut buckets: Vec<_> = results.into_iter().collect();
    buckets.sort_by_key(|(bucket, _)| *bucket);
    for (bucket, value) in buckets {
        println!("[{bucket}]\t{value}");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let mut client = AnalystClient::connect(format!("http://{}", args.host)).await?;

    match args.command {
        Commands::Query { filter } => {
            let response = client.query(Request::new(filter.to_query()?)).await?;
            display_envelopes(response.into_inner().envelopes);
        }
        Commands::Aggregate { filter, width } => {
            let response = client
                .aggregate(Request::new(filter.to_aggregate(width)?))
                .await?;
            display_buckets(response.into_inner().results);
        }
    }

    Ok(())
}
