//! Value objects: equality by value, not identity.

use core::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Marker trait for value objects.
///
/// Value objects are **immutable** and **compared by value**. Two `Money`
/// values with the same amount and currency are the same money; an invoice
/// with the same amount as another is still a different invoice.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}

/// Currencies invoices can be issued in.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Eur,
    Usd,
    Dkk,
    Sek,
    Gbp,
}

impl Currency {
    pub fn code(&self) -> &'static str {
        match self {
            Currency::Eur => "EUR",
            Currency::Usd => "USD",
            Currency::Dkk => "DKK",
            Currency::Sek => "SEK",
            Currency::Gbp => "GBP",
        }
    }
}

impl core::fmt::Display for Currency {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Currency {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "EUR" => Ok(Currency::Eur),
            "USD" => Ok(Currency::Usd),
            "DKK" => Ok(Currency::Dkk),
            "SEK" => Ok(Currency::Sek),
            "GBP" => Ok(Currency::Gbp),
            _ => Err(DomainError::UnsupportedCurrency(s.to_string())),
        }
    }
}

impl ValueObject for Currency {}

/// An amount of money in a single currency.
///
/// Amounts are exact decimals; there is no conversion between currencies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    pub value: Decimal,
    pub currency: Currency,
}

impl Money {
    /// Most fractional digits an amount may carry.
    pub const MAX_SCALE: u32 = 4;

    /// Create a non-negative amount with at most [`Money::MAX_SCALE`] fractional digits.
    pub fn new(value: Decimal, currency: Currency) -> DomainResult<Self> {
        if value.is_sign_negative() && !value.is_zero() {
            return Err(DomainError::validation("money value must not be negative"));
        }
        if value.normalize().scale() > Self::MAX_SCALE {
            return Err(DomainError::validation(format!(
                "money value {value} has more than {} fractional digits",
                Self::MAX_SCALE
            )));
        }
        Ok(Self { value, currency })
    }

    pub fn is_same_currency(&self, other: &Money) -> bool {
        self.currency == other.currency
    }

    /// Subtract `other`, refusing to mix currencies or go below zero.
    pub fn checked_sub(&self, other: &Money) -> DomainResult<Money> {
        if !self.is_same_currency(other) {
            return Err(DomainError::invariant(format!(
                "cannot subtract {} from {}",
                other.currency, self.currency
            )));
        }
        let value = self.value - other.value;
        if value.is_sign_negative() && !value.is_zero() {
            return Err(DomainError::invariant("money value would become negative"));
        }
        Ok(Money {
            value,
            currency: self.currency,
        })
    }
}

impl core::fmt::Display for Money {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} {}", self.value, self.currency)
    }
}

impl ValueObject for Money {}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn negative_money_is_rejected() {
        let err = Money::new(Decimal::new(-1, 0), Currency::Eur).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn amounts_finer_than_four_decimals_are_rejected() {
        let err = Money::new(Decimal::new(123_456, 5), Currency::Eur).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        assert!(Money::new(Decimal::new(12_345, 4), Currency::Eur).is_ok());
        // Trailing zeros do not count.
        assert!(Money::new(Decimal::new(150_000, 5), Currency::Eur).is_ok());
    }

    #[test]
    fn currency_codes_parse_case_insensitively() {
        assert_eq!("eur".parse::<Currency>().unwrap(), Currency::Eur);
        assert_eq!(" GBP ".parse::<Currency>().unwrap(), Currency::Gbp);
        assert!(matches!(
            "XYZ".parse::<Currency>(),
            Err(DomainError::UnsupportedCurrency(_))
        ));
    }

    #[test]
    fn currency_serializes_as_iso_code() {
        let json = serde_json::to_string(&Currency::Dkk).unwrap();
        assert_eq!(json, "\"DKK\"");
    }

    #[test]
    fn subtracting_across_currencies_fails() {
        let eur = Money::new(Decimal::new(10, 0), Currency::Eur).unwrap();
        let usd = Money::new(Decimal::new(1, 0), Currency::Usd).unwrap();
        assert!(eur.checked_sub(&usd).is_err());
    }

    proptest! {
        /// Property: subtraction never produces a negative balance.
        #[test]
        fn checked_sub_never_goes_negative(a in 0i64..1_000_000, b in 0i64..1_000_000) {
            let left = Money::new(Decimal::new(a, 2), Currency::Sek).unwrap();
            let right = Money::new(Decimal::new(b, 2), Currency::Sek).unwrap();
            match left.checked_sub(&right) {
                Ok(rest) => prop_assert!(!rest.value.is_sign_negative() || rest.value.is_zero()),
                Err(_) => prop_assert!(b > a),
            }
        }
    }
}
