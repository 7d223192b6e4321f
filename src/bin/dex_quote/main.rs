//! Quote tool for the DEX aggregation core.
//!
//! Builds an in-memory network from the reserves given on the command line
//! and prints the rates and reserve selection for a single trade.

mod config;
mod error;

use std::process::exit;

use alloy::primitives::{Address, U256};
use clap::Parser;
use dex_aggregator::{
    engine::{BlockEntropy, MatchingEngine},
    network::Network,
    num::{Converter, ETH_DECIMALS},
    reserve::{ConstantProductReserve, FixedRateReserve},
    types::{ETH_ADDRESS, ReserveType, reserve_id},
};
use fastnum::UD256;
use tracing::{error, info};

use config::{CliConfig, EnvConfig, QuoteConfig};

/// Ledger account of the quoting network, never funded.
const NETWORK_ADDRESS: Address = Address::with_last_byte(0x01);

fn main() {
    // Load .env file
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("Warning: Failed to load .env file: {}", e);
    }

    let env_config = match EnvConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to parse environment configuration: {}", e);
            exit(1);
        }
    };

    let cli_config = CliConfig::parse();
    let quote_config = match cli_config.to_quote_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            exit(1);
        }
    };

    // Set up logging
    if std::env::var("RUST_LOG").is_err() {
        unsafe {
            std::env::set_var("RUST_LOG", "info");
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    if let Err(e) = run(&env_config, &quote_config) {
        error!(%e, "Quote failed");
        exit(1);
    }
}

fn run(env: &EnvConfig, config: &QuoteConfig) -> error::Result<()> {
    let network = build_network(env, config)?;
    let rates = network.calc_rates_and_amounts(
        config.src,
        config.dest,
        config.src_qty,
        config.platform_fee_bps,
        &config.hint,
        config.block,
    )?;

    if rates.actual_dest_amount.is_zero() {
        println!("no liquidity for {} -> {}", config.src, config.dest);
        return Ok(());
    }

    let rate = Converter::rate();
    let eth = Converter::new(ETH_DECIMALS);
    let dest = Converter::new(config.dest_decimals);
    println!(
        "dest amount:           {}",
        display(dest, rates.actual_dest_amount)
    );
    println!(
        "rate with network fee: {}",
        display(rate, rates.rate_with_network_fee)
    );
    println!(
        "rate with all fees:    {}",
        display(rate, rates.rate_with_all_fees)
    );
    println!("trade wei:             {}", display(eth, rates.trade_wei));
    println!("network fee:           {}", display(eth, rates.network_fee_wei));
    println!("platform fee:          {}", display(eth, rates.platform_fee_wei));
    for slice in rates.reserves() {
        println!(
            "reserve {} ({}): {} bps, src {}, dest {}",
            slice.id, slice.address, slice.split_bps, slice.src_amount, slice.dest_amount
        );
    }
    Ok(())
}

fn build_network(env: &EnvConfig, config: &QuoteConfig) -> error::Result<Network> {
    let mut engine = MatchingEngine::new(BlockEntropy);
    engine
        .set_negligible_rate_diff_bps(env.negligible_rate_diff_bps.unwrap_or(0))
        .map_err(|e| error::Error::Dex(e.into()))?;
    let mut network = Network::new(
        NETWORK_ADDRESS,
        engine,
        env.network_fee_bps.unwrap_or(25),
        Address::ZERO,
    )?;

    let [fpr, apr, bridge, utility, custom, orderbook] = env.fee_paying()?;
    network
        .registry_mut()
        .set_fee_paying_per_reserve_type(fpr, apr, bridge, utility, custom, orderbook);
    for token in [config.src, config.dest] {
        if token != ETH_ADDRESS {
            network.set_token_decimals(token, config.decimals_of(token));
        }
    }

    for spec in &config.fixed {
        let decimals = config.decimals_of(spec.token);
        let mut reserve = FixedRateReserve::new(spec.address);
        reserve.set_rates(spec.token, decimals, spec.buy_rate, spec.sell_rate);
        reserve.deposit(spec.token, Converter::new(decimals).to_unsigned(spec.inventory));
        reserve.deposit(ETH_ADDRESS, Converter::new(ETH_DECIMALS).to_unsigned(spec.inventory));
        let id = reserve_id(ReserveType::Fpr as u8, spec.address);
        network.add_reserve(reserve, id, ReserveType::Fpr)?;
        network
            .registry_mut()
            .list_pair_for_reserve(spec.address, spec.token, true, true, true)?;
        info!(address = %spec.address, token = %spec.token, %id, "fixed rate reserve added");
    }

    for spec in &config.pools {
        let decimals = config.decimals_of(spec.token);
        let reserve = ConstantProductReserve::new(
            spec.address,
            spec.token,
            decimals,
            Converter::new(ETH_DECIMALS).to_unsigned(spec.eth_balance),
            Converter::new(decimals).to_unsigned(spec.token_balance),
            spec.fee_bps,
        );
        let id = reserve_id(ReserveType::Apr as u8, spec.address);
        network.add_reserve(reserve, id, ReserveType::Apr)?;
        network
            .registry_mut()
            .list_pair_for_reserve(spec.address, spec.token, true, true, true)?;
        info!(address = %spec.address, token = %spec.token, %id, "pool added");
    }
    Ok(network)
}

fn display(converter: Converter, value: U256) -> String {
    converter
        .from_unsigned::<4>(value)
        .map(|value: UD256| value.to_string())
        .unwrap_or_else(|| value.to_string())
}
