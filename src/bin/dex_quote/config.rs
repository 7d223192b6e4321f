//! Configuration for the quote tool.
//!
//! Configuration comes from two sources:
//! - Environment variables (via .env file or shell): network policy
//! - CLI arguments: the trade and the reserves to quote it against

use alloy::primitives::{Address, Bytes, U256};
use clap::Parser;
use dex_aggregator::{
    num::{Converter, ETH_DECIMALS},
    types::{BlockContext, Bps, ETH_ADDRESS, ReserveType},
};
use fastnum::{UD256, decimal::Context};

/// Environment configuration (network policy).
#[derive(Debug, serde::Deserialize)]
pub struct EnvConfig {
    /// Network fee in bps (default: 25)
    pub network_fee_bps: Option<Bps>,

    /// Rates within this many bps of the best count as ties (default: 0)
    pub negligible_rate_diff_bps: Option<Bps>,

    /// Comma-separated reserve types paying the network fee
    /// (default: "fpr,apr,custom,orderbook")
    pub fee_paying_types: Option<String>,
}

impl EnvConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, envy::Error> {
        envy::from_env()
    }

    /// Fee paying flag per type in [`ReserveType::ALL`] order.
    pub fn fee_paying(&self) -> Result<[bool; 6], ConfigError> {
        let types = self
            .fee_paying_types
            .as_deref()
            .unwrap_or("fpr,apr,custom,orderbook");
        let mut table = [false; 6];
        for name in types.split(',').map(str::trim).filter(|name| !name.is_empty()) {
            let reserve_type = parse_reserve_type(name)?;
            if let Some(slot) = ReserveType::ALL.iter().position(|t| *t == reserve_type) {
                table[slot] = true;
            }
        }
        Ok(table)
    }
}

/// CLI arguments describing the quote.
#[derive(Debug, Parser)]
#[command(name = "dex-quote")]
#[command(about = "Quotes a trade against an in-memory set of reserves")]
pub struct CliConfig {
    /// Source token address, or "eth"
    #[arg(long)]
    pub src: String,

    /// Destination token address, or "eth"
    #[arg(long)]
    pub dest: String,

    /// Amount of source token in whole units (e.g., "1.5")
    #[arg(long)]
    pub amount: String,

    /// Decimals of the source token
    #[arg(long, default_value_t = ETH_DECIMALS)]
    pub src_decimals: u8,

    /// Decimals of the destination token
    #[arg(long, default_value_t = ETH_DECIMALS)]
    pub dest_decimals: u8,

    /// Platform fee in bps
    #[arg(long, default_value_t = 0)]
    pub platform_fee_bps: Bps,

    /// Hex encoded trade hint
    #[arg(long, default_value = "0x")]
    pub hint: String,

    /// Fixed rate reserve "address:token:buy_rate:sell_rate:inventory",
    /// rates in destination per source unit, inventory in whole tokens
    #[arg(long = "fixed")]
    pub fixed: Vec<String>,

    /// Constant product pool "address:token:eth_balance:token_balance:fee_bps"
    #[arg(long = "pool")]
    pub pools: Vec<String>,

    /// Block number the quote is evaluated at
    #[arg(long, default_value_t = 0)]
    pub block_number: u64,

    /// Block timestamp the quote is evaluated at
    #[arg(long, default_value_t = 0)]
    pub block_timestamp: u64,
}

/// Fixed rate reserve listed for a single token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FixedReserveConfig {
    pub address: Address,
    pub token: Address,
    pub buy_rate: U256,
    pub sell_rate: U256,
    /// Token inventory, ETH inventory is the same amount of ETH units.
    pub inventory: UD256,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PoolConfig {
    pub address: Address,
    pub token: Address,
    pub eth_balance: UD256,
    pub token_balance: UD256,
    pub fee_bps: Bps,
}

/// Fully parsed quote request.
#[derive(Clone, Debug)]
pub struct QuoteConfig {
    pub src: Address,
    pub dest: Address,
    pub src_qty: U256,
    pub src_decimals: u8,
    pub dest_decimals: u8,
    pub platform_fee_bps: Bps,
    pub hint: Bytes,
    pub fixed: Vec<FixedReserveConfig>,
    pub pools: Vec<PoolConfig>,
    pub block: BlockContext,
}

impl QuoteConfig {
    /// Decimals of `token` as given on the command line.
    pub fn decimals_of(&self, token: Address) -> u8 {
        if token == self.src {
            self.src_decimals
        } else if token == self.dest {
            self.dest_decimals
        } else {
            ETH_DECIMALS
        }
    }
}

impl CliConfig {
    pub fn to_quote_config(&self) -> Result<QuoteConfig, ConfigError> {
        let src = parse_token(&self.src)?;
        let dest = parse_token(&self.dest)?;
        let src_decimals = if src == ETH_ADDRESS {
            ETH_DECIMALS
        } else {
            self.src_decimals
        };
        let dest_decimals = if dest == ETH_ADDRESS {
            ETH_DECIMALS
        } else {
            self.dest_decimals
        };
        let src_qty = Converter::new(src_decimals).to_unsigned(parse_decimal(&self.amount)?);
        if src_qty.is_zero() {
            return Err(ConfigError::ZeroAmount);
        }
        let hint = self
            .hint
            .parse()
            .map_err(|_| ConfigError::InvalidHint(self.hint.clone()))?;

        let fixed = self
            .fixed
            .iter()
            .map(|spec| parse_fixed(spec))
            .collect::<Result<_, _>>()?;
        let pools = self
            .pools
            .iter()
            .map(|spec| parse_pool(spec))
            .collect::<Result<_, _>>()?;

        Ok(QuoteConfig {
            src,
            dest,
            src_qty,
            src_decimals,
            dest_decimals,
            platform_fee_bps: self.platform_fee_bps,
            hint,
            fixed,
            pools,
            block: BlockContext::new(self.block_number, self.block_timestamp),
        })
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid token {0}")]
    InvalidToken(String),

    #[error("Invalid decimal value {0}")]
    InvalidDecimal(String),

    #[error("Amount cannot be zero")]
    ZeroAmount,

    #[error("Invalid hint {0}")]
    InvalidHint(String),

    #[error("Invalid reserve spec {0}")]
    InvalidReserveSpec(String),

    #[error("Unknown reserve type {0}")]
    UnknownReserveType(String),
}

fn parse_token(value: &str) -> Result<Address, ConfigError> {
    if value.eq_ignore_ascii_case("eth") {
        return Ok(ETH_ADDRESS);
    }
    value
        .parse()
        .map_err(|_| ConfigError::InvalidToken(value.to_string()))
}

fn parse_decimal(value: &str) -> Result<UD256, ConfigError> {
    UD256::from_str(value, Context::default())
        .map_err(|_| ConfigError::InvalidDecimal(value.to_string()))
}

fn parse_reserve_type(name: &str) -> Result<ReserveType, ConfigError> {
    match name.to_ascii_lowercase().as_str() {
        "fpr" => Ok(ReserveType::Fpr),
        "apr" => Ok(ReserveType::Apr),
        "bridge" => Ok(ReserveType::Bridge),
        "utility" => Ok(ReserveType::Utility),
        "custom" => Ok(ReserveType::Custom),
        "orderbook" => Ok(ReserveType::Orderbook),
        _ => Err(ConfigError::UnknownReserveType(name.to_string())),
    }
}

fn spec_parts<const N: usize>(spec: &str) -> Result<[&str; N], ConfigError> {
    let parts: Vec<&str> = spec.split(':').map(str::trim).collect();
    parts
        .try_into()
        .map_err(|_| ConfigError::InvalidReserveSpec(spec.to_string()))
}

fn parse_fixed(spec: &str) -> Result<FixedReserveConfig, ConfigError> {
    let [address, token, buy_rate, sell_rate, inventory] = spec_parts(spec)?;
    let rate = Converter::rate();
    Ok(FixedReserveConfig {
        address: parse_token(address)?,
        token: parse_token(token)?,
        buy_rate: rate.to_unsigned(parse_decimal(buy_rate)?),
        sell_rate: rate.to_unsigned(parse_decimal(sell_rate)?),
        inventory: parse_decimal(inventory)?,
    })
}

fn parse_pool(spec: &str) -> Result<PoolConfig, ConfigError> {
    let [address, token, eth_balance, token_balance, fee_bps] = spec_parts(spec)?;
    Ok(PoolConfig {
        address: parse_token(address)?,
        token: parse_token(token)?,
        eth_balance: parse_decimal(eth_balance)?,
        token_balance: parse_decimal(token_balance)?,
        fee_bps: fee_bps
            .parse()
            .map_err(|_| ConfigError::InvalidReserveSpec(spec.to_string()))?,
    })
}
