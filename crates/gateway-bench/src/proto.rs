//! Generated types and client for the `sequencer.Gateway` service
//! (`proto/gateway.proto`).

tonic::include_proto!("sequencer");

/// Gateway client over a tonic channel.
pub type GatewayClient = gateway_client::GatewayClient<tonic::transport::Channel>;

#[cfg(test)]
mod tests {
    use super::*;
    use prost::Message;

    #[test]
    fn order_encodes_known_fields() {
        let order = Order {
            guid: 42,
            market_id: "BTC/ETH".to_string(),
            amount: 1_000,
            price: "17.5".to_string(),
            wallet: "0xabc".to_string(),
            r#type: OrderType::LimitBuy as i32,
        };

        let bytes = order.encode_to_vec();
        let decoded = Order::decode(bytes.as_slice()).unwrap();
        assert_eq!(decoded.r#type(), OrderType::LimitBuy);
        assert_eq!(decoded.market_id, "BTC/ETH");
    }

    #[test]
    fn unknown_disposition_falls_back_to_default() {
        let response = OrderResponse {
            disposition: 99,
            ..Default::default()
        };
        assert_eq!(response.disposition(), OrderDisposition::Accepted);
    }
}
