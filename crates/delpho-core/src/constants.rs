//! Compiled-in protocol constants.

use crate::market::{ActionId, AssetPrecision, MarketId, TokenId};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// System contract that relays raw actions from HyperEVM to HyperCore.
pub const CORE_WRITER_ADDRESS: &str = "0x3333333333333333333333333333333333333333";

/// Raw action encoding version byte.
pub const ENCODING_VERSION: u8 = 1;

pub const ACTION_LIMIT_ORDER: ActionId = ActionId(1);
pub const ACTION_SPOT_SEND: ActionId = ActionId(6);
pub const ACTION_USD_CLASS_TRANSFER: ActionId = ActionId(7);

pub const TOKEN_USDT: TokenId = TokenId(1105);

pub const MARKET_USDT_USDC_SPOT: MarketId = MarketId(11115);
pub const MARKET_HYPE_PERP: MarketId = MarketId(135);

/// Venue-side minimum notional, in quote units, below which orders are rejected.
pub const MIN_ORDER_NOTIONAL: Decimal = dec!(10.1);

/// USDC class transfers are denominated in 6-decimal units.
pub const USDC_TRANSFER_DECIMALS: u32 = 6;

/// Default slippage offered by the trade wizard (0.1%).
pub const DEFAULT_WIZARD_SLIPPAGE: Decimal = dec!(0.001);

/// Fallback precision when token details cannot be fetched.
pub const DEFAULT_PRECISION: AssetPrecision = AssetPrecision::new(4, 2, 8);

/// Spot coin names as reported by the venue.
pub const COIN_USDC: &str = "USDC";
pub const COIN_USDT: &str = "USDT0";
pub const COIN_HYPE: &str = "HYPE";

/// HyperEVM network selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    Mainnet,
    Testnet,
}

impl Network {
    pub fn chain_id(&self) -> u64 {
        match self {
            Self::Mainnet => 999,
            Self::Testnet => 998,
        }
    }

    pub fn rpc_url(&self) -> &'static str {
        match self {
            Self::Mainnet => "https://rpc.hyperliquid.xyz/evm",
            Self::Testnet => "https://rpc.hyperliquid-testnet.xyz/evm",
        }
    }

    /// Info endpoint of the order-book/perp data API.
    pub fn info_url(&self) -> &'static str {
        match self {
            Self::Mainnet => "https://api.hyperliquid.xyz/info",
            Self::Testnet => "https://api.hyperliquid-testnet.xyz/info",
        }
    }

    pub fn explorer_url(&self) -> &'static str {
        match self {
            Self::Mainnet => "https://purrsec.com/",
            Self::Testnet => "https://testnet.purrsec.com/",
        }
    }
}
