//! Canonical-value conversion.
//!
//! Every currency is referenced to USD. An amount is first valued in USD
//! through its own rate, then divided by the canonical currency's USD rate.
//! The canonical currency goes through the same formula as any other, so its
//! own rate divides out to one.
//!
//! Results carry full `Decimal` precision. Rounding is a display concern.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::Currency;

/// What the ledger does when a currency involved in a conversion has no rate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingRatePolicy {
    /// Reject the operation; nothing is written.
    #[default]
    FailClosed,

    /// Record the contribution with a canonical value of zero.
    ZeroContribution,
}

impl std::str::FromStr for MissingRatePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fail_closed" | "fail-closed" | "fail" => Ok(Self::FailClosed),
            "zero" | "zero_contribution" | "zero-contribution" => Ok(Self::ZeroContribution),
            other => Err(format!("unknown missing-rate policy: {other}")),
        }
    }
}

/// Conversion failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConversionError {
    /// The currency has no usable USD reference rate.
    #[error("no reference rate for currency {code}")]
    MissingRate {
        /// Code of the currency lacking a rate.
        code: String,
    },

    /// The converted value does not fit in a `Decimal`.
    #[error("converting {code} overflows")]
    Overflow {
        /// Code of the source currency.
        code: String,
    },
}

/// Convert `amount` of `source` into units of `canonical`.
///
/// # Errors
///
/// Returns `ConversionError::MissingRate` if either currency has no usable
/// USD rate. A zero rate counts as missing. Returns
/// `ConversionError::Overflow` if an intermediate value leaves the `Decimal`
/// range.
pub fn to_canonical(
    amount: Decimal,
    source: &Currency,
    canonical: &Currency,
) -> Result<Decimal, ConversionError> {
    let source_rate = source
        .usable_rate()
        .ok_or_else(|| ConversionError::MissingRate {
            code: source.code.clone(),
        })?;
    let canonical_rate = canonical
        .usable_rate()
        .ok_or_else(|| ConversionError::MissingRate {
            code: canonical.code.clone(),
        })?;

    amount
        .checked_mul(source_rate)
        .and_then(|amount_usd| amount_usd.checked_div(canonical_rate))
        .ok_or_else(|| ConversionError::Overflow {
            code: source.code.clone(),
        })
}

/// Convert under an explicit missing-rate policy.
///
/// # Errors
///
/// Propagates `ConversionError::MissingRate` under `FailClosed`. Overflow is
/// never swallowed.
pub fn to_canonical_with_policy(
    amount: Decimal,
    source: &Currency,
    canonical: &Currency,
    policy: MissingRatePolicy,
) -> Result<Decimal, ConversionError> {
    match (to_canonical(amount, source, canonical), policy) {
        (Ok(value), _) => Ok(value),
        (Err(ConversionError::MissingRate { .. }), MissingRatePolicy::ZeroContribution) => {
            Ok(Decimal::ZERO)
        }
        (Err(err), _) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn gold() -> Currency {
        Currency::new("XAU", "Gold (gram)", Some(dec!(2000)))
    }

    #[test]
    fn converts_through_usd() {
        let usd = Currency::new("USD", "US Dollar", Some(dec!(1)));
        assert_eq!(to_canonical(dec!(10), &usd, &gold()).unwrap(), dec!(0.005));

        let eur = Currency::new("EUR", "Euro", Some(dec!(1.08)));
        assert_eq!(to_canonical(dec!(5), &eur, &gold()).unwrap(), dec!(0.0027));
    }

    #[test]
    fn canonical_currency_divides_out() {
        let canonical = gold();
        assert_eq!(
            to_canonical(dec!(3.25), &canonical, &canonical).unwrap(),
            dec!(3.25)
        );
    }

    #[test]
    fn conversion_is_linear() {
        let eur = Currency::new("EUR", "Euro", Some(dec!(1.08)));
        let amount = dec!(17.35);
        let single = to_canonical(amount, &eur, &gold()).unwrap();
        let double = to_canonical(amount * dec!(2), &eur, &gold()).unwrap();
        assert_eq!(double, single * dec!(2));
    }

    #[test]
    fn missing_source_rate_fails() {
        let unpriced = Currency::new("ZZZ", "Unlisted", None);
        let err = to_canonical(dec!(1), &unpriced, &gold()).unwrap_err();
        assert_eq!(
            err,
            ConversionError::MissingRate {
                code: "ZZZ".into()
            }
        );
    }

    #[test]
    fn zero_canonical_rate_fails() {
        let usd = Currency::new("USD", "US Dollar", Some(dec!(1)));
        let broken = Currency::new("XAU", "Gold", Some(Decimal::ZERO));
        assert!(matches!(
            to_canonical(dec!(1), &usd, &broken),
            Err(ConversionError::MissingRate { code }) if code == "XAU"
        ));
    }

    #[test]
    fn zero_policy_swallows_missing_rate() {
        let unpriced = Currency::new("ZZZ", "Unlisted", None);
        let value = to_canonical_with_policy(
            dec!(40),
            &unpriced,
            &gold(),
            MissingRatePolicy::ZeroContribution,
        )
        .unwrap();
        assert_eq!(value, Decimal::ZERO);

        assert!(to_canonical_with_policy(
            dec!(40),
            &unpriced,
            &gold(),
            MissingRatePolicy::FailClosed
        )
        .is_err());
    }

    #[test]
    fn oversized_amount_overflows_instead_of_panicking() {
        let eur = Currency::new("EUR", "Euro", Some(dec!(1.08)));
        let err = to_canonical(Decimal::MAX / dec!(1.05), &eur, &gold()).unwrap_err();
        assert_eq!(err, ConversionError::Overflow { code: "EUR".into() });

        // A canonical rate below one grows the value on division
        let usd = Currency::new("USD", "US Dollar", Some(dec!(1)));
        let cent = Currency::new("CNT", "Cent", Some(dec!(0.01)));
        assert!(matches!(
            to_canonical(Decimal::MAX, &usd, &cent),
            Err(ConversionError::Overflow { .. })
        ));
    }

    #[test]
    fn zero_policy_keeps_overflow() {
        let eur = Currency::new("EUR", "Euro", Some(dec!(1.08)));
        assert!(matches!(
            to_canonical_with_policy(
                Decimal::MAX,
                &eur,
                &gold(),
                MissingRatePolicy::ZeroContribution
            ),
            Err(ConversionError::Overflow { .. })
        ));
    }

    #[test]
    fn policy_parses_from_config_strings() {
        assert_eq!(
            "fail_closed".parse::<MissingRatePolicy>().unwrap(),
            MissingRatePolicy::FailClosed
        );
        assert_eq!(
            "Zero".parse::<MissingRatePolicy>().unwrap(),
            MissingRatePolicy::ZeroContribution
        );
        assert!("maybe".parse::<MissingRatePolicy>().is_err());
    }
}
