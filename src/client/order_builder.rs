//! Order amount calculation
//!
//! The exchange works in 6-decimal base units. For buys the maker side is
//! USDC (max 2 decimals) and the taker side is outcome shares (max 4 decimals).

use crate::error::{BotError, Result};
use crate::types::BookLevel;
use ethers::types::U256;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

/// Decimals of USDC and of conditional tokens
pub const TOKEN_DECIMALS: u32 = 6;

const MAKER_DECIMALS: u32 = 2;
const TAKER_DECIMALS: u32 = 4;

/// Maker/taker amounts of a buy, in whole units
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuyAmounts {
    /// USDC paid
    pub maker: Decimal,
    /// Shares received
    pub taker: Decimal,
}

impl BuyAmounts {
    /// GTC/GTD buy of `size` shares at `price`
    pub fn limit(price: Decimal, size: Decimal) -> Result<Self> {
        let taker = truncate(size, TAKER_DECIMALS);
        let cost = taker
            .checked_mul(price)
            .ok_or_else(|| out_of_range(format!("{} shares at {}", size, price)))?;
        Self::checked(truncate(cost, MAKER_DECIMALS), taker)
    }

    /// Market buy spending `amount` USD at worst price `price`
    pub fn market(amount: Decimal, price: Decimal) -> Result<Self> {
        if price <= Decimal::ZERO {
            return Err(BotError::InvalidInput(format!("Invalid price {}", price)));
        }
        let maker = truncate(amount, MAKER_DECIMALS);
        let shares = maker
            .checked_div(price)
            .ok_or_else(|| out_of_range(format!("{} USD at {}", amount, price)))?;
        Self::checked(maker, truncate(shares, TAKER_DECIMALS))
    }

    fn checked(maker: Decimal, taker: Decimal) -> Result<Self> {
        if maker <= Decimal::ZERO || taker <= Decimal::ZERO {
            return Err(BotError::InvalidInput(format!(
                "Order too small: pays {} USDC for {} shares",
                maker, taker
            )));
        }
        Ok(Self { maker, taker })
    }

    pub fn maker_units(&self) -> Result<U256> {
        to_base_units(self.maker)
    }

    pub fn taker_units(&self) -> Result<U256> {
        to_base_units(self.taker)
    }
}

fn out_of_range(what: String) -> BotError {
    BotError::InvalidInput(format!("Amount out of range: {}", what))
}

fn truncate(value: Decimal, dp: u32) -> Decimal {
    value.round_dp_with_strategy(dp, RoundingStrategy::ToZero)
}

/// Whole units to 6-decimal base units, dropping anything finer
pub fn to_base_units(value: Decimal) -> Result<U256> {
    value
        .checked_mul(Decimal::from(10u64.pow(TOKEN_DECIMALS)))
        .map(|scaled| scaled.trunc())
        .and_then(|scaled| scaled.to_u128())
        .map(U256::from)
        .ok_or_else(|| out_of_range(value.to_string()))
}

/// Worst ask price needed to fill a market buy of `amount` USD.
///
/// Walks the asks from the cheapest level up, accumulating `price * size`,
/// and returns the price of the level at which the amount is covered.
pub fn market_buy_price(asks: &[BookLevel], amount: Decimal) -> Result<Decimal> {
    let mut levels: Vec<&BookLevel> = asks.iter().collect();
    levels.sort_by(|a, b| a.price.cmp(&b.price));

    let mut covered = Decimal::ZERO;
    for level in levels {
        covered = covered.saturating_add(level.liquidity());
        if covered >= amount {
            return Ok(level.price);
        }
    }

    Err(BotError::Execution(format!(
        "no match: book only offers {:.2} USD of liquidity",
        covered
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn level(price: Decimal, size: Decimal) -> BookLevel {
        BookLevel { price, size }
    }

    #[test]
    fn test_limit_amounts_truncate() {
        let amounts = BuyAmounts::limit(dec!(0.55), dec!(10.123456)).unwrap();
        assert_eq!(amounts.taker, dec!(10.1234));
        // 10.1234 * 0.55 = 5.56787 -> 5.56
        assert_eq!(amounts.maker, dec!(5.56));
    }

    #[test]
    fn test_market_amounts() {
        let amounts = BuyAmounts::market(dec!(25), dec!(0.40)).unwrap();
        assert_eq!(amounts.maker, dec!(25));
        assert_eq!(amounts.taker, dec!(62.5));
    }

    #[test]
    fn test_order_too_small() {
        assert!(BuyAmounts::limit(dec!(0.01), dec!(0.5)).is_err());
        assert!(BuyAmounts::market(dec!(0.001), dec!(0.5)).is_err());
    }

    #[test]
    fn test_to_base_units() {
        assert_eq!(to_base_units(dec!(5.56)).unwrap(), U256::from(5_560_000u64));
        assert_eq!(to_base_units(dec!(0.0000019)).unwrap(), U256::from(1u64));
        assert!(to_base_units(dec!(-1)).is_err());
    }

    #[test]
    fn test_huge_amounts_are_rejected() {
        let huge = Decimal::from_str_exact("100000000000000000000000").unwrap();
        let amounts = BuyAmounts::limit(dec!(0.5), huge).unwrap();
        assert!(matches!(amounts.taker_units(), Err(BotError::InvalidInput(_))));
        assert!(to_base_units(Decimal::MAX).is_err());
        assert!(BuyAmounts::limit(Decimal::MAX, Decimal::MAX).is_err());
        assert!(BuyAmounts::market(Decimal::MAX, dec!(0.0000000001)).is_err());
    }

    #[test]
    fn test_market_buy_price_walks_asks() {
        // Deliberately unsorted, the way the API returns asks (worst first)
        let asks = vec![
            level(dec!(0.60), dec!(100)),
            level(dec!(0.52), dec!(10)),
            level(dec!(0.50), dec!(20)),
        ];
        // 0.50 * 20 = 10 USD at the best level
        assert_eq!(market_buy_price(&asks, dec!(10)).unwrap(), dec!(0.50));
        // + 0.52 * 10 = 15.2 USD after the second level
        assert_eq!(market_buy_price(&asks, dec!(15)).unwrap(), dec!(0.52));
        assert_eq!(market_buy_price(&asks, dec!(40)).unwrap(), dec!(0.60));
    }

    #[test]
    fn test_market_buy_price_no_match() {
        let asks = vec![level(dec!(0.50), dec!(2))];
        let err = market_buy_price(&asks, dec!(5)).unwrap_err();
        assert!(err.to_string().contains("no match"));
        assert!(market_buy_price(&[], dec!(1)).is_err());
    }
}
