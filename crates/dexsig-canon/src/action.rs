//! Chain-native action with its tag.

use dexsig_core::ActionKind;

use crate::dydx::DydxMsg;
use crate::hyperliquid::Action;

/// Chain-native message body.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionBody {
    /// Protobuf message placed in a cosmos `TxBody`.
    Dydx(DydxMsg),
    /// msgpack/JSON action posted to `/exchange`.
    Hyperliquid(Action),
}

/// A canonical action, ready to be signed.
///
/// Only the canonicalizers in this crate construct one, and only from
/// validated requests.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainAction {
    kind: ActionKind,
    body: ActionBody,
}

impl ChainAction {
    pub(crate) fn dydx(msg: DydxMsg) -> Self {
        Self {
            kind: msg.kind(),
            body: ActionBody::Dydx(msg),
        }
    }

    pub(crate) fn hyperliquid(action: Action) -> Self {
        Self {
            kind: action.kind(),
            body: ActionBody::Hyperliquid(action),
        }
    }

    pub fn kind(&self) -> ActionKind {
        self.kind
    }

    pub fn body(&self) -> &ActionBody {
        &self.body
    }

    pub fn into_body(self) -> ActionBody {
        self.body
    }

    /// Chain label used in logs and metrics.
    pub fn chain(&self) -> &'static str {
        match self.body {
            ActionBody::Dydx(_) => "dydx",
            ActionBody::Hyperliquid(_) => "hyperliquid",
        }
    }
}
