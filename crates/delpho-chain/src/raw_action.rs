//! CoreWriter raw action encoding.
//!
//! Wire layout: `version (1 byte) || action id (3 bytes, big-endian) || abi.encode(params)`.

use alloy::primitives::{Address, Bytes};
use alloy::sol_types::SolValue;
use delpho_core::constants::{
    ACTION_LIMIT_ORDER, ACTION_SPOT_SEND, ACTION_USD_CLASS_TRANSFER, ENCODING_VERSION,
};
use delpho_core::{ActionId, MarketId, TokenId};

/// Time-in-force codes understood by CoreWriter limit orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TimeInForce {
    /// Add liquidity only (post-only).
    Alo = 1,
    Gtc = 2,
    Ioc = 3,
}

/// Action relayed to HyperCore via `sendRawAction`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawAction {
    LimitOrder {
        asset: MarketId,
        is_buy: bool,
        /// Limit price scaled by 1e8.
        limit_px: u64,
        /// Size scaled by 1e8.
        sz: u64,
        reduce_only: bool,
        tif: TimeInForce,
        /// Client order id; 0 for none.
        cloid: u128,
    },
    SpotSend {
        destination: Address,
        token: TokenId,
        wei_amount: u64,
    },
    UsdClassTransfer {
        /// USDC amount scaled by 1e6.
        ntl: u64,
        to_perp: bool,
    },
}

impl RawAction {
    pub fn action_id(&self) -> ActionId {
        match self {
            Self::LimitOrder { .. } => ACTION_LIMIT_ORDER,
            Self::SpotSend { .. } => ACTION_SPOT_SEND,
            Self::UsdClassTransfer { .. } => ACTION_USD_CLASS_TRANSFER,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::LimitOrder { .. } => "limitOrder",
            Self::SpotSend { .. } => "spotSend",
            Self::UsdClassTransfer { .. } => "usdClassTransfer",
        }
    }

    fn encode_params(&self) -> Vec<u8> {
        match *self {
            Self::LimitOrder {
                asset,
                is_buy,
                limit_px,
                sz,
                reduce_only,
                tif,
                cloid,
            } => (
                asset.index(),
                is_buy,
                limit_px,
                sz,
                reduce_only,
                u16::from(tif as u8),
                cloid,
            )
                .abi_encode_params(),
            Self::SpotSend {
                destination,
                token,
                wei_amount,
            } => (destination, token.0, wei_amount).abi_encode_params(),
            Self::UsdClassTransfer { ntl, to_perp } => (ntl, to_perp).abi_encode_params(),
        }
    }

    /// Full payload for `sendRawAction`.
    pub fn encode(&self) -> Bytes {
        let params = self.encode_params();
        let mut out = Vec::with_capacity(4 + params.len());
        out.push(ENCODING_VERSION);
        out.extend_from_slice(&self.action_id().to_be_bytes3());
        out.extend_from_slice(&params);
        Bytes::from(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::U256;
    use delpho_core::constants::{MARKET_HYPE_PERP, TOKEN_USDT};

    fn word(data: &[u8], index: usize) -> U256 {
        let start = 4 + index * 32;
        U256::from_be_slice(&data[start..start + 32])
    }

    #[test]
    fn test_header_bytes() {
        let encoded = RawAction::UsdClassTransfer {
            ntl: 1_000_000,
            to_perp: true,
        }
        .encode();
        assert_eq!(&encoded[..4], &[0x01, 0x00, 0x00, 0x07]);
        assert_eq!(encoded.len(), 4 + 2 * 32);
        assert_eq!(word(&encoded, 0), U256::from(1_000_000u64));
        assert_eq!(word(&encoded, 1), U256::from(1u64));
    }

    #[test]
    fn test_spot_send_layout() {
        let destination = Address::repeat_byte(0xab);
        let encoded = RawAction::SpotSend {
            destination,
            token: TOKEN_USDT,
            wei_amount: 42,
        }
        .encode();

        assert_eq!(&encoded[..4], &[0x01, 0x00, 0x00, 0x06]);
        // address is left-padded to 32 bytes
        assert_eq!(&encoded[4 + 12..4 + 32], destination.as_slice());
        assert_eq!(word(&encoded, 1), U256::from(1105u64));
        assert_eq!(word(&encoded, 2), U256::from(42u64));
    }

    #[test]
    fn test_limit_order_layout() {
        let action = RawAction::LimitOrder {
            asset: MARKET_HYPE_PERP,
            is_buy: false,
            limit_px: 4_000_000_000,
            sz: 25_000_000,
            reduce_only: false,
            tif: TimeInForce::Ioc,
            cloid: 0,
        };
        let encoded = action.encode();

        assert_eq!(action.action_id(), ACTION_LIMIT_ORDER);
        assert_eq!(&encoded[..4], &[0x01, 0x00, 0x00, 0x01]);
        assert_eq!(encoded.len(), 4 + 7 * 32);
        assert_eq!(word(&encoded, 0), U256::from(135u64));
        assert_eq!(word(&encoded, 1), U256::ZERO);
        assert_eq!(word(&encoded, 2), U256::from(4_000_000_000u64));
        assert_eq!(word(&encoded, 5), U256::from(3u64));
    }
}
