//! Wallet valuation against the live price table
//!
//! Quote-asset balances count at face value; every other balance is
//! priced at the table's latest entry, or zero when the table has none.

use rust_decimal::Decimal;

use crate::api::Wallet;

use super::price_table::PriceSnapshot;

/// Value of a single wallet in the quote asset
pub fn wallet_value(wallet: &Wallet, prices: &PriceSnapshot, quote_asset: &str) -> Decimal {
    if wallet.currency.trim().eq_ignore_ascii_case(quote_asset) {
        return wallet.balance;
    }
    prices
        .get(&wallet.currency)
        .map(|entry| wallet.balance * entry.price)
        .unwrap_or(Decimal::ZERO)
}

/// Total portfolio value in the quote asset
pub fn total_value(wallets: &[Wallet], prices: &PriceSnapshot, quote_asset: &str) -> Decimal {
    wallets
        .iter()
        .map(|w| wallet_value(w, prices, quote_asset))
        .sum()
}

/// Currencies held with a non-zero balance that the table cannot price
pub fn unpriced_currencies<'a>(
    wallets: &'a [Wallet],
    prices: &PriceSnapshot,
    quote_asset: &str,
) -> Vec<&'a str> {
    wallets
        .iter()
        .filter(|w| !w.balance.is_zero())
        .filter(|w| !w.currency.trim().eq_ignore_ascii_case(quote_asset))
        .filter(|w| prices.get(&w.currency).is_none())
        .map(|w| w.currency.as_str())
        .collect()
}
