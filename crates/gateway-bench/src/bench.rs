//! The probe loop: one `AddOrder` call at a time, timed end to end.

use std::io::Write;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::debug;

use crate::proto::{GatewayClient, Order, OrderResponse, OrderType};
use crate::stats::LatencySummary;

/// Anything that can submit an order and wait for its response.
#[async_trait]
pub trait OrderSender: Send {
    async fn send(&mut self, order: Order) -> Result<OrderResponse, tonic::Status>;
}

#[async_trait]
impl OrderSender for GatewayClient {
    async fn send(&mut self, order: Order) -> Result<OrderResponse, tonic::Status> {
        self.add_order(order).await.map(tonic::Response::into_inner)
    }
}

/// What to send and how many times.
#[derive(Debug, Clone)]
pub struct BenchConfig {
    pub count: u32,
    pub market_id: String,
    pub wallet: String,
    pub amount: u64,
    pub price: String,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            count: 1000,
            market_id: "BTC/ETH".to_string(),
            wallet: "0x0000000000000000000000000000000000000001".to_string(),
            amount: 1_000,
            price: "17.5".to_string(),
        }
    }
}

impl BenchConfig {
    /// The `i`-th order of a run. Sides alternate so the book stays
    /// roughly balanced.
    pub fn order(&self, i: u32) -> Order {
        let side = if i % 2 == 0 {
            OrderType::LimitBuy
        } else {
            OrderType::LimitSell
        };
        Order {
            guid: rand::random::<i64>(),
            market_id: self.market_id.clone(),
            amount: self.amount,
            price: self.price.clone(),
            wallet: self.wallet.clone(),
            r#type: side as i32,
        }
    }
}

/// Send `config.count` orders sequentially, writing one line per call to
/// `out`. Failed calls are reported and counted, not retried.
pub async fn run(
    sender: &mut dyn OrderSender,
    config: &BenchConfig,
    out: &mut dyn Write,
) -> anyhow::Result<LatencySummary> {
    let mut samples: Vec<Duration> = Vec::with_capacity(config.count as usize);
    let mut errors = 0usize;

    for i in 0..config.count {
        let order = config.order(i);
        let guid = order.guid;

        let started = Instant::now();
        let result = sender.send(order).await;
        let elapsed = started.elapsed();

        match result {
            Ok(response) => {
                samples.push(elapsed);
                if response.guid != guid {
                    debug!(sent = guid, received = response.guid, "response guid mismatch");
                }
                writeln!(
                    out,
                    "{i}: {elapsed:?} disposition={:?} sequence={} gateway={:?}",
                    response.disposition(),
                    response.sequence,
                    Duration::from_nanos(response.processing_time.max(0) as u64),
                )?;
            }
            Err(status) => {
                errors += 1;
                writeln!(
                    out,
                    "{i}: {elapsed:?} error code={:?} message={}",
                    status.code(),
                    status.message()
                )?;
            }
        }
    }

    Ok(LatencySummary::from_samples(&samples, errors))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::OrderDisposition;

    /// Accepts every order, failing every `fail_every`-th call.
    struct FakeGateway {
        calls: u32,
        fail_every: Option<u32>,
        sent: Vec<Order>,
    }

    #[async_trait]
    impl OrderSender for FakeGateway {
        async fn send(&mut self, order: Order) -> Result<OrderResponse, tonic::Status> {
            self.calls += 1;
            if self.fail_every.is_some_and(|n| self.calls % n == 0) {
                return Err(tonic::Status::unavailable("sequencer down"));
            }
            let response = OrderResponse {
                guid: order.guid,
                disposition: OrderDisposition::Accepted as i32,
                sequence: i64::from(self.calls),
                processing_time: 12_000,
            };
            self.sent.push(order);
            Ok(response)
        }
    }

    fn config(count: u32) -> BenchConfig {
        BenchConfig {
            count,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn runs_every_call_and_prints_a_line_each() {
        let mut gateway = FakeGateway {
            calls: 0,
            fail_every: None,
            sent: Vec::new(),
        };
        let mut out = Vec::new();

        let summary = run(&mut gateway, &config(4), &mut out).await.unwrap();

        assert_eq!(summary.count, 4);
        assert_eq!(summary.errors, 0);
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().count(), 4);
        assert!(text.lines().next().unwrap().contains("disposition=Accepted"));
        assert!(text.contains("gateway=12µs"));

        let sides: Vec<OrderType> = gateway.sent.iter().map(|o| o.r#type()).collect();
        assert_eq!(
            sides,
            vec![
                OrderType::LimitBuy,
                OrderType::LimitSell,
                OrderType::LimitBuy,
                OrderType::LimitSell
            ]
        );
    }

    #[tokio::test]
    async fn failures_are_counted_and_the_loop_continues() {
        let mut gateway = FakeGateway {
            calls: 0,
            fail_every: Some(3),
            sent: Vec::new(),
        };
        let mut out = Vec::new();

        let summary = run(&mut gateway, &config(6), &mut out).await.unwrap();

        assert_eq!(summary.count, 4);
        assert_eq!(summary.errors, 2);
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.matches("code=Unavailable").count(), 2);
    }

    #[test]
    fn orders_carry_config() {
        let cfg = BenchConfig {
            market_id: "ETH/USDC".to_string(),
            amount: 7,
            ..Default::default()
        };
        let order = cfg.order(1);
        assert_eq!(order.market_id, "ETH/USDC");
        assert_eq!(order.amount, 7);
        assert_eq!(order.r#type(), OrderType::LimitSell);
    }
}
