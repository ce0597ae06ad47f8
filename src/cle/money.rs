use crate::ids::CurrencyId;

use std::cmp::Ordering;
use std::fmt;

use rust_decimal::{Decimal, RoundingStrategy};

use thiserror::Error;

/// Every stored or computed amount carries exactly this many fractional digits
pub const SCALE: u32 = 2;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MoneyError {
    #[error("Currency mismatch while applying {0} operation on {1} and {2}")]
    CurrencyMismatch(&'static str, Money, Money),

    #[error("Overflow error while applying {0} operation on {1} and {2}")]
    Overflow(&'static str, Money, Money),

    #[error("Money parse error: {0}, {1}")]
    Parse(&'static str, String),
}

/// Immutable, currency-tagged decimal amount.
///
/// Arithmetic results are rounded half away from zero to [`SCALE`] places, so
/// `0.005` becomes `0.01` and `-0.005` becomes `-0.01`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Money {
    amount: Decimal,
    currency_id: CurrencyId,
}

impl Money {
    pub fn new(amount: Decimal, currency_id: CurrencyId) -> Self {
        Self {
            amount: to_scale(amount),
            currency_id,
        }
    }

    pub fn zero(currency_id: CurrencyId) -> Self {
        Self::new(Decimal::ZERO, currency_id)
    }

    /// Parses a plain decimal string. Anything finer than a cent is refused
    /// rather than rounded.
    pub fn parse(string: &str, currency_id: CurrencyId) -> Result<Self, MoneyError> {
        let trimmed = string.trim();

        if trimmed.is_empty() {
            return Err(MoneyError::Parse("Empty amount", string.to_string()));
        }

        let amount = Decimal::from_str_exact(trimmed)
            .map_err(|_| MoneyError::Parse("Not a decimal number", string.to_string()))?;

        if amount.normalize().scale() > SCALE {
            return Err(MoneyError::Parse("Too many decimal places", string.to_string()));
        }

        Ok(Self::new(amount, currency_id))
    }

    /// The exact decimal value. This is the only way out of `Money` into a
    /// plain number and it never loses precision.
    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn currency_id(&self) -> CurrencyId {
        self.currency_id
    }

    pub fn is_negative(&self) -> bool {
        self.amount.is_sign_negative() && !self.amount.is_zero()
    }

    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    pub fn add(&self, other: &Self) -> Result<Self, MoneyError> {
        self.ensure_same_currency("add", other)?;

        self.amount
            .checked_add(other.amount)
            .map(to_scale)
            .filter(|amount| amount.scale() == SCALE)
            .map(|amount| Self { amount, currency_id: self.currency_id })
            .ok_or(MoneyError::Overflow("add", *self, *other))
    }

    pub fn subtract(&self, other: &Self) -> Result<Self, MoneyError> {
        self.ensure_same_currency("subtract", other)?;

        self.amount
            .checked_sub(other.amount)
            .map(to_scale)
            .filter(|amount| amount.scale() == SCALE)
            .map(|amount| Self { amount, currency_id: self.currency_id })
            .ok_or(MoneyError::Overflow("subtract", *self, *other))
    }

    /// Ordering is only defined between amounts of the same currency.
    pub fn compare(&self, other: &Self) -> Result<Ordering, MoneyError> {
        self.ensure_same_currency("compare", other)?;

        Ok(self.amount.cmp(&other.amount))
    }

    fn ensure_same_currency(&self, op: &'static str, other: &Self) -> Result<(), MoneyError> {
        if self.currency_id != other.currency_id {
            return Err(MoneyError::CurrencyMismatch(op, *self, *other));
        }

        Ok(())
    }
}

/// Rounds to the fixed scale. Amounts too large to carry two fractional digits
/// come back with a smaller scale, which arithmetic treats as overflow.
fn to_scale(amount: Decimal) -> Decimal {
    let mut amount = amount.round_dp_with_strategy(SCALE, RoundingStrategy::MidpointAwayFromZero);
    amount.rescale(SCALE);
    amount
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        return write!(f, "{} ({})", self.amount, self.currency_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;
    use rust_decimal_macros::dec;

    const SOME_CURRENCY: CurrencyId = CurrencyId(1);
    const OTHER_CURRENCY: CurrencyId = CurrencyId(2);

    fn money(amount: Decimal) -> Money {
        Money::new(amount, SOME_CURRENCY)
    }

    #[test]
    fn new_pins_scale() {
        let m = money(dec!(100));

        assert_eq!(m.amount().scale(), SCALE);
        assert_eq!(m.amount().to_string(), "100.00");
    }

    #[rstest]
    #[case(dec!(0.005), dec!(0.01))]
    #[case(dec!(0.015), dec!(0.02))]
    #[case(dec!(0.025), dec!(0.03))]
    #[case(dec!(-0.005), dec!(-0.01))]
    #[case(dec!(-2.675), dec!(-2.68))]
    #[case(dec!(1.004), dec!(1.00))]
    fn rounds_half_away_from_zero(#[case] input: Decimal, #[case] expected: Decimal) {
        assert_eq!(money(input).amount(), expected);
    }

    #[test]
    fn add_and_subtract() {
        let a = money(dec!(100.00));
        let b = money(dec!(30.25));

        assert_eq!(a.add(&b).unwrap(), money(dec!(130.25)));
        assert_eq!(a.subtract(&b).unwrap(), money(dec!(69.75)));
        assert_eq!(b.subtract(&a).unwrap(), money(dec!(-69.75)));
    }

    #[test]
    fn add_then_subtract_is_identity() {
        let amounts = [dec!(0), dec!(0.01), dec!(-13.37), dec!(999999.99), dec!(42.5)];

        for x in amounts {
            for y in amounts {
                let a = money(x);
                let b = money(y);

                let round_trip = a.add(&b).unwrap().subtract(&b).unwrap();

                assert_eq!(round_trip, a, "{a} + {b} - {b}");
            }
        }
    }

    #[test]
    fn currency_mismatch() {
        let a = money(dec!(10));
        let b = Money::new(dec!(10), OTHER_CURRENCY);

        assert!(matches!(
            a.add(&b),
            Err(MoneyError::CurrencyMismatch("add", _, _))
        ));
        assert!(matches!(
            a.subtract(&b),
            Err(MoneyError::CurrencyMismatch("subtract", _, _))
        ));
        assert!(matches!(
            a.compare(&b),
            Err(MoneyError::CurrencyMismatch("compare", _, _))
        ));
    }

    #[test]
    fn overflow() {
        let huge = money(dec!(500000000000000000000000000));

        assert!(matches!(
            huge.add(&huge),
            Err(MoneyError::Overflow("add", _, _))
        ));
    }

    #[test]
    fn is_negative() {
        assert!(money(dec!(-0.01)).is_negative());
        assert!(!money(dec!(0)).is_negative());
        assert!(!money(dec!(-0.001)).is_negative());
        assert!(!money(dec!(0.01)).is_negative());
    }

    #[rstest]
    #[case("10", dec!(10.00))]
    #[case("10.5", dec!(10.50))]
    #[case(" 0.01 ", dec!(0.01))]
    #[case("-3.20", dec!(-3.20))]
    #[case("1.2300", dec!(1.23))]
    fn parse(#[case] input: &str, #[case] expected: Decimal) {
        assert_eq!(Money::parse(input, SOME_CURRENCY).unwrap(), money(expected));
    }

    #[rstest]
    #[case("")]
    #[case("abc")]
    #[case("1.2.3")]
    #[case("0.001")]
    fn parse_rejects(#[case] input: &str) {
        assert!(matches!(
            Money::parse(input, SOME_CURRENCY),
            Err(MoneyError::Parse(_, _))
        ));
    }

    #[test]
    fn compare() {
        assert_eq!(
            money(dec!(1)).compare(&money(dec!(2))).unwrap(),
            Ordering::Less
        );
        assert_eq!(
            money(dec!(2.00)).compare(&money(dec!(2))).unwrap(),
            Ordering::Equal
        );
    }
}
