//! Hyperliquid action wire format.
//!
//! L1 actions are hashed as msgpack maps, so struct field order is part of
//! the signature: it must match the exchange's reference encoder exactly.
//! `Option` fields use `skip_serializing_if`; a serialized `nil` would
//! change the hash.

use alloy::primitives::{keccak256, Address, B256};
use dexsig_core::ActionKind;
use serde::Serialize;

use crate::error::Result;

/// Grouping for plain order lists.
pub const GROUPING_NA: &str = "na";

// =============================================================================
// Orders
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderWire {
    /// Asset index
    #[serde(rename = "a")]
    pub asset: u32,

    #[serde(rename = "b")]
    pub is_buy: bool,

    #[serde(rename = "p")]
    pub limit_px: String,

    #[serde(rename = "s")]
    pub sz: String,

    #[serde(rename = "r")]
    pub reduce_only: bool,

    #[serde(rename = "t")]
    pub order_type: OrderTypeWire,

    #[serde(rename = "c", skip_serializing_if = "Option::is_none")]
    pub cloid: Option<String>,
}

/// `{"limit": {"tif": ...}}` or `{"trigger": {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum OrderTypeWire {
    Limit { limit: LimitOrderType },
    Trigger { trigger: TriggerOrderType },
}

impl OrderTypeWire {
    fn limit(tif: &str) -> Self {
        Self::Limit {
            limit: LimitOrderType {
                tif: tif.to_string(),
            },
        }
    }

    pub fn ioc() -> Self {
        Self::limit("Ioc")
    }

    pub fn gtc() -> Self {
        Self::limit("Gtc")
    }

    /// Add-liquidity-only (post-only).
    pub fn alo() -> Self {
        Self::limit("Alo")
    }

    pub fn trigger(is_market: bool, trigger_px: impl Into<String>, tpsl: &str) -> Self {
        Self::Trigger {
            trigger: TriggerOrderType {
                is_market,
                trigger_px: trigger_px.into(),
                tpsl: tpsl.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LimitOrderType {
    /// "Gtc", "Ioc" or "Alo"
    pub tif: String,
}

/// Field order: isMarket, triggerPx, tpsl.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TriggerOrderType {
    #[serde(rename = "isMarket")]
    pub is_market: bool,

    #[serde(rename = "triggerPx")]
    pub trigger_px: String,

    /// "tp" or "sl"
    pub tpsl: String,
}

// =============================================================================
// Cancels and modifies
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CancelWire {
    #[serde(rename = "a")]
    pub asset: u32,

    #[serde(rename = "o")]
    pub oid: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CancelByCloidWire {
    pub asset: u32,
    pub cloid: String,
}

/// Exchange order id or client order id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum OrderRef {
    Oid(u64),
    Cloid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModifyWire {
    pub oid: OrderRef,
    pub order: OrderWire,
}

// =============================================================================
// User-signed actions
// =============================================================================

/// Body of `usdSend` and `withdraw3`. Signed as EIP-712 typed data, not
/// through the L1 action hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserTransferWire {
    /// Hex chain id the signature is bound to, e.g. "0x66eee".
    pub signature_chain_id: String,
    /// "Mainnet" or "Testnet"
    pub hyperliquid_chain: String,
    pub destination: String,
    pub amount: String,
    /// Milliseconds; doubles as the nonce.
    pub time: u64,
}

// =============================================================================
// Action
// =============================================================================

/// Every action this crate posts to `/exchange`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum Action {
    #[serde(rename = "order")]
    Order {
        orders: Vec<OrderWire>,
        grouping: String,
    },

    #[serde(rename = "cancel")]
    Cancel { cancels: Vec<CancelWire> },

    #[serde(rename = "cancelByCloid")]
    CancelByCloid { cancels: Vec<CancelByCloidWire> },

    #[serde(rename = "batchModify")]
    BatchModify { modifies: Vec<ModifyWire> },

    #[serde(rename = "updateLeverage")]
    UpdateLeverage {
        asset: u32,
        #[serde(rename = "isCross")]
        is_cross: bool,
        leverage: u32,
    },

    #[serde(rename = "updateIsolatedMargin")]
    UpdateIsolatedMargin {
        asset: u32,
        #[serde(rename = "isBuy")]
        is_buy: bool,
        /// USDC in 6-decimal units; negative removes margin.
        ntli: i64,
    },

    #[serde(rename = "usdSend")]
    UsdSend(UserTransferWire),

    #[serde(rename = "withdraw3")]
    Withdraw3(UserTransferWire),
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Self::Order { .. } => ActionKind::PlaceOrder,
            Self::Cancel { cancels } if cancels.len() > 1 => ActionKind::CancelBatch,
            Self::CancelByCloid { cancels } if cancels.len() > 1 => ActionKind::CancelBatch,
            Self::Cancel { .. } | Self::CancelByCloid { .. } => ActionKind::CancelOrder,
            Self::BatchModify { .. } => ActionKind::ModifyOrder,
            Self::UpdateLeverage { .. } => ActionKind::UpdateLeverage,
            Self::UpdateIsolatedMargin { .. } => ActionKind::UpdateMargin,
            Self::UsdSend(_) => ActionKind::Transfer,
            Self::Withdraw3(_) => ActionKind::Withdraw,
        }
    }

    /// True for actions signed as EIP-712 typed data by the wallet itself.
    pub fn is_user_signed(&self) -> bool {
        matches!(self, Self::UsdSend(_) | Self::Withdraw3(_))
    }

    /// msgpack map encoding used in the action hash.
    pub fn to_msgpack(&self) -> Result<Vec<u8>> {
        Ok(rmp_serde::to_vec_named(self)?)
    }
}

// =============================================================================
// SigningInput and action_hash
// =============================================================================

/// Everything the L1 action hash commits to.
#[derive(Debug, Clone)]
pub struct SigningInput<'a> {
    pub action: &'a Action,
    pub nonce: u64,
    /// `None` for the wallet's own account.
    pub vault_address: Option<Address>,
    pub expires_after: Option<u64>,
}

impl SigningInput<'_> {
    /// `msgpack(action) || nonce_be || vault_tag [|| 0x00 || expires_be]`
    ///
    /// The vault tag is always present (`0x00`, or `0x01` + address); the
    /// expiry suffix only when set.
    pub fn preimage(&self) -> Result<Vec<u8>> {
        let mut data = self.action.to_msgpack()?;
        data.extend_from_slice(&self.nonce.to_be_bytes());
        match &self.vault_address {
            None => data.push(0x00),
            Some(addr) => {
                data.push(0x01);
                data.extend_from_slice(addr.as_slice());
            }
        }
        if let Some(expires) = self.expires_after {
            data.push(0x00);
            data.extend_from_slice(&expires.to_be_bytes());
        }
        Ok(data)
    }

    /// The phantom agent's `connectionId`.
    pub fn action_hash(&self) -> Result<B256> {
        Ok(keccak256(self.preimage()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference_order() -> Action {
        Action::Order {
            orders: vec![OrderWire {
                asset: 110027,
                is_buy: true,
                limit_px: "105.00".to_string(),
                sz: "0.2".to_string(),
                reduce_only: false,
                order_type: OrderTypeWire::ioc(),
                cloid: Some("0x0de3e244a8f44fc28a6b7bc852d66d19".to_string()),
            }],
            grouping: GROUPING_NA.to_string(),
        }
    }

    #[test]
    fn test_order_type_wire_serialization() {
        let json = serde_json::to_string(&OrderTypeWire::alo()).unwrap();
        assert_eq!(json, r#"{"limit":{"tif":"Alo"}}"#);

        let json = serde_json::to_string(&OrderTypeWire::trigger(true, "100", "sl")).unwrap();
        assert_eq!(json, r#"{"trigger":{"isMarket":true,"triggerPx":"100","tpsl":"sl"}}"#);
    }

    /// Field order changes the hash, so the bytes are pinned to the
    /// exchange reference encoder's output.
    #[test]
    fn test_msgpack_field_order() {
        let bytes = reference_order().to_msgpack().unwrap();
        let expected = "83a474797065a56f72646572a66f72646572739187a161ce0001adcba162c3a170a63130352e3030a173a3302e32a172c2a17481a56c696d697481a3746966a3496f63a163d92230783064653365323434613866343466633238613662376263383532643636643139a867726f7570696e67a26e61";
        assert_eq!(hex::encode(&bytes), expected);

        let action = reference_order();
        let input = SigningInput {
            action: &action,
            nonce: 1769339470576,
            vault_address: None,
            expires_after: None,
        };
        assert_eq!(
            hex::encode(input.action_hash().unwrap()),
            "904c57b8f4b75ac9da005b49298dc39af735ed8c3a89b241f5f1e061e0207868"
        );
    }

    #[test]
    fn test_json_starts_with_type() {
        let json = serde_json::to_string(&reference_order()).unwrap();
        assert!(json.starts_with(r#"{"type":"order","orders":"#));
        assert!(json.ends_with(r#""grouping":"na"}"#));
    }

    #[test]
    fn test_cancel_by_cloid_json() {
        let action = Action::CancelByCloid {
            cancels: vec![CancelByCloidWire {
                asset: 3,
                cloid: "0xabc".to_string(),
            }],
        };
        assert_eq!(
            serde_json::to_string(&action).unwrap(),
            r#"{"type":"cancelByCloid","cancels":[{"asset":3,"cloid":"0xabc"}]}"#
        );
        assert_eq!(action.kind(), ActionKind::CancelOrder);
    }

    #[test]
    fn test_update_actions_json() {
        let leverage = Action::UpdateLeverage {
            asset: 1,
            is_cross: false,
            leverage: 10,
        };
        assert_eq!(
            serde_json::to_string(&leverage).unwrap(),
            r#"{"type":"updateLeverage","asset":1,"isCross":false,"leverage":10}"#
        );

        let margin = Action::UpdateIsolatedMargin {
            asset: 1,
            is_buy: true,
            ntli: -2_500_000,
        };
        assert_eq!(
            serde_json::to_string(&margin).unwrap(),
            r#"{"type":"updateIsolatedMargin","asset":1,"isBuy":true,"ntli":-2500000}"#
        );
        assert_eq!(margin.kind(), ActionKind::UpdateMargin);
    }

    #[test]
    fn test_modify_accepts_oid_or_cloid() {
        let order = match reference_order() {
            Action::Order { orders, .. } => orders[0].clone(),
            _ => unreachable!(),
        };
        let action = Action::BatchModify {
            modifies: vec![
                ModifyWire {
                    oid: OrderRef::Oid(42),
                    order: order.clone(),
                },
                ModifyWire {
                    oid: OrderRef::Cloid("0x01".to_string()),
                    order,
                },
            ],
        };
        let json = serde_json::to_string(&action).unwrap();
        assert!(json.contains(r#"{"oid":42,"order":"#));
        assert!(json.contains(r#"{"oid":"0x01","order":"#));
        assert_eq!(action.kind(), ActionKind::ModifyOrder);
    }

    #[test]
    fn test_user_signed_json() {
        let action = Action::UsdSend(UserTransferWire {
            signature_chain_id: "0x66eee".to_string(),
            hyperliquid_chain: "Testnet".to_string(),
            destination: "0x0000000000000000000000000000000000000001".to_string(),
            amount: "1.5".to_string(),
            time: 1_700_000_000_000,
        });
        let json = serde_json::to_string(&action).unwrap();
        assert!(json.starts_with(r#"{"type":"usdSend","signatureChainId":"0x66eee","hyperliquidChain":"Testnet""#));
        assert!(action.is_user_signed());
        assert!(!reference_order().is_user_signed());
    }

    #[test]
    fn test_action_hash_with_vault() {
        let action = Action::Cancel {
            cancels: vec![CancelWire { asset: 5, oid: 123 }],
        };
        let with_vault = SigningInput {
            action: &action,
            nonce: 1000,
            vault_address: Some(Address::repeat_byte(0x42)),
            expires_after: None,
        };
        let without = SigningInput {
            vault_address: None,
            ..with_vault.clone()
        };

        let preimage = with_vault.preimage().unwrap();
        assert_eq!(preimage[preimage.len() - 21], 0x01);
        assert_eq!(*without.preimage().unwrap().last().unwrap(), 0x00);
        assert_ne!(with_vault.action_hash().unwrap(), without.action_hash().unwrap());
    }

    #[test]
    fn test_action_hash_with_expires() {
        let action = Action::Order {
            orders: vec![],
            grouping: GROUPING_NA.to_string(),
        };
        let plain = SigningInput {
            action: &action,
            nonce: 1000,
            vault_address: None,
            expires_after: None,
        };
        let expiring = SigningInput {
            expires_after: Some(1_700_000_000),
            ..plain.clone()
        };

        assert_eq!(expiring.preimage().unwrap().len(), plain.preimage().unwrap().len() + 9);
        assert_ne!(plain.action_hash().unwrap(), expiring.action_hash().unwrap());
    }
}
