//! The stored record format (`loggregator.v2.Envelope`).

use std::collections::HashMap;

/// One stored unit of log or metric data.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Envelope {
    #[prost(int64, tag = "1")]
    pub timestamp: i64,
    #[prost(string, tag = "2")]
    pub source_id: String,
    #[prost(string, tag = "8")]
    pub instance_id: String,
    #[prost(map = "string, string", tag = "9")]
    pub tags: HashMap<String, String>,
    #[prost(oneof = "envelope::Message", tags = "4, 5, 6")]
    pub message: Option<envelope::Message>,
}

pub mod envelope {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Message {
        #[prost(message, tag = "4")]
        Log(super::Log),
        #[prost(message, tag = "5")]
        Counter(super::Counter),
        #[prost(message, tag = "6")]
        Gauge(super::Gauge),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Log {
    #[prost(bytes = "vec", tag = "1")]
    pub payload: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Counter {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(uint64, tag = "2")]
    pub delta: u64,
    #[prost(int64, tag = "3")]
    pub total: i64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Gauge {
    #[prost(map = "string, message", tag = "1")]
    pub metrics: HashMap<String, GaugeValue>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GaugeValue {
    #[prost(string, tag = "1")]
    pub unit: String,
    #[prost(double, tag = "2")]
    pub value: f64,
}

impl Envelope {
    pub fn log(&self) -> Option<&Log> {
        match &self.message {
            Some(envelope::Message::Log(log)) => Some(log),
            _ => None,
        }
    }

    pub fn counter(&self) -> Option<&Counter> {
        match &self.message {
            Some(envelope::Message::Counter(counter)) => Some(counter),
            _ => None,
        }
    }

    pub fn gauge(&self) -> Option<&Gauge> {
        match &self.message {
            Some(envelope::Message::Gauge(gauge)) => Some(gauge),
            _ => None,
        }
    }
}
