//! Wire format shared by the shop and its clients.
//!
//! A batch is a contiguous run of `(customer_id, x, y)` triples of native
//! endian `i32`, sent in one write. The shop answers with [`ACKNOWLEDGMENT`]
//! once everything is delivered; a client aborts by sending [`CANCEL_TOKEN`].

use crate::types::Order;

/// Bytes per encoded order.
pub const ORDER_WIRE_SIZE: usize = 3 * std::mem::size_of::<i32>();
/// Largest batch accepted in one session.
pub const MAX_BATCH_ORDERS: usize = 1024;
/// Sent once a session delivered every order.
pub const ACKNOWLEDGMENT: &str = "Thank you for your order\n";
/// Sent by a client to abandon its session.
pub const CANCEL_TOKEN: &[u8] = b"CANCEL";

/// Why an inbound batch could not be turned into orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchError {
    /// The read ended in the middle of an order.
    Truncated { bytes: usize },
    TooLarge { orders: usize },
}

pub fn encode_batch(orders: &[Order]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(orders.len() * ORDER_WIRE_SIZE);
    for order in orders {
        bytes.extend_from_slice(&order.customer_id.to_ne_bytes());
        bytes.extend_from_slice(&order.destination.x.to_ne_bytes());
        bytes.extend_from_slice(&order.destination.y.to_ne_bytes());
    }
    bytes
}

pub fn parse_batch(bytes: &[u8]) -> Result<Vec<Order>, BatchError> {
    if bytes.len() % ORDER_WIRE_SIZE != 0 {
        return Err(BatchError::Truncated { bytes: bytes.len() });
    }
    let count = bytes.len() / ORDER_WIRE_SIZE;
    if count > MAX_BATCH_ORDERS {
        return Err(BatchError::TooLarge { orders: count });
    }
    let orders = bytes
        .chunks_exact(ORDER_WIRE_SIZE)
        .map(|chunk| {
            let field = |at: usize| {
                let mut raw = [0u8; 4];
                raw.copy_from_slice(&chunk[at..at + 4]);
                i32::from_ne_bytes(raw)
            };
            Order::new(field(0), field(4), field(8))
        })
        .collect();
    Ok(orders)
}

/// Whether a mid-session message asks to cancel.
pub fn is_cancel(message: &[u8]) -> bool {
    message.starts_with(CANCEL_TOKEN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_native_endian_triples() {
        let mut bytes = Vec::new();
        for value in [7i32, -3, 12, 8, 0, 1] {
            bytes.extend_from_slice(&value.to_ne_bytes());
        }
        let orders = parse_batch(&bytes).expect("valid batch");
        assert_eq!(orders, vec![Order::new(7, -3, 12), Order::new(8, 0, 1)]);
    }

    #[test]
    fn encoded_batch_parses_back() {
        let orders = vec![Order::new(1, 10, 20), Order::new(2, 999, 0)];
        let bytes = encode_batch(&orders);
        assert_eq!(bytes.len(), 2 * ORDER_WIRE_SIZE);
        assert_eq!(parse_batch(&bytes), Ok(orders));
    }

    #[test]
    fn empty_batch_has_no_orders() {
        assert_eq!(parse_batch(&[]), Ok(Vec::new()));
    }

    #[test]
    fn partial_order_is_truncated() {
        let mut bytes = encode_batch(&[Order::new(1, 2, 3)]);
        bytes.extend_from_slice(&5i32.to_ne_bytes());
        assert_eq!(
            parse_batch(&bytes),
            Err(BatchError::Truncated { bytes: 16 })
        );
    }

    #[test]
    fn oversized_batch_is_rejected() {
        let orders: Vec<Order> = (0..=MAX_BATCH_ORDERS as i32)
            .map(|id| Order::new(id, 0, 0))
            .collect();
        assert_eq!(
            parse_batch(&encode_batch(&orders)),
            Err(BatchError::TooLarge {
                orders: MAX_BATCH_ORDERS + 1
            })
        );
    }

    #[test]
    fn recognizes_cancel_token() {
        assert!(is_cancel(b"CANCEL"));
        assert!(is_cancel(b"CANCEL\n"));
        assert!(!is_cancel(b"CANCE"));
        assert!(!is_cancel(b"hello"));
    }
}
