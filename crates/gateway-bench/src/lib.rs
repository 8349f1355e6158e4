//! gateway-bench — measures round-trip latency of the order gateway's
//! `AddOrder` RPC.

pub mod bench;
pub mod proto;
pub mod stats;

pub use bench::{run, BenchConfig, OrderSender};
pub use proto::GatewayClient;
pub use stats::LatencySummary;
