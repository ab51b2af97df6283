//! Remote fulfillment API: order client and its transport.

pub mod client;
pub mod transport;

pub use client::{CancelOutcome, RemoteError, RemoteOrderClient, SubmissionResult};
pub use transport::{ApiResponse, HttpOrderTransport, ACCESS_TOKEN_HEADER, OrderTransport, TransportError};
