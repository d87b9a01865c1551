//! Client-side order identifiers.
//!
//! The identifier is a UUID v5 over the order's composite key, matching the
//! dYdX indexer's scheme. It is known before the order reaches the chain, so
//! cancels and status queries never wait on a server-assigned id.

use crate::expiry::OrderFlags;
use crate::order::ClientOrderId;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Namespace used by the dYdX indexer for order and subaccount ids.
pub const DEFAULT_ORDER_NAMESPACE: Uuid = Uuid::from_u128(0x0f9da948_a6fb_4c45_9edc_4685c3f3317d);

/// Deterministic order identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderIdentity(Uuid);

impl OrderIdentity {
    /// Derive the id for an order.
    ///
    /// ```text
    /// subaccount = uuid5(ns, "{address}-{subaccount}")
    /// order      = uuid5(ns, "{subaccount}-{client_id}-{pair_id}-{flags}")
    /// ```
    pub fn derive(
        namespace: &Uuid,
        address: &str,
        subaccount: u32,
        client_id: ClientOrderId,
        flags: OrderFlags,
        pair_id: u32,
    ) -> Self {
        let subaccount_id = subaccount_uuid(namespace, address, subaccount);
        let name = format!(
            "{subaccount_id}-{}-{pair_id}-{}",
            client_id.value(),
            flags.value()
        );
        Self(Uuid::new_v5(namespace, name.as_bytes()))
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Hyperliquid client order id: `0x` followed by 32 hex digits.
    pub fn to_cloid(&self) -> String {
        format!("0x{}", self.0.simple())
    }
}

impl fmt::Display for OrderIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Indexer id of a subaccount.
pub fn subaccount_uuid(namespace: &Uuid, address: &str, subaccount: u32) -> Uuid {
    Uuid::new_v5(namespace, format!("{address}-{subaccount}").as_bytes())
}
