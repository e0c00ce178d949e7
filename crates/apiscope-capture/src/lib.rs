//! Traffic correlation pipeline — filters browser network events,
//! decodes bodies, and merges request/response halves into endpoint
//! records ready for documentation synthesis.

pub mod codec;
pub mod correlator;
pub mod filter;
pub mod types;
pub mod urlnorm;

pub use correlator::TrafficCorrelator;
pub use types::{
    header_value, CorrelationKey, EndpointRecord, Headers, NetworkEvent, ParamDescriptor,
    RequestStarted, ResourceType, ResponseReceived,
};
