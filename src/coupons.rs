//! Coupon Validator: closed code set with percent/fixed discounts.
//!
//! Codes are compared case-insensitively. Application floors the result at
//! zero. The checkout-session handler re-derives the discount from the code
//! server-side; client-supplied amounts are never trusted.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;

/// How a discount is applied to the base price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountKind {
    Percent,
    Fixed,
}

/// A known coupon.
#[derive(Debug, Clone, Copy)]
pub struct CouponRule {
    pub code: &'static str,
    pub kind: DiscountKind,
    pub amount: Decimal,
}

/// All codes the business currently honors. Not database-backed.
pub const KNOWN_COUPONS: &[CouponRule] = &[
    CouponRule {
        code: "SAVE10",
        kind: DiscountKind::Percent,
        amount: dec!(10),
    },
    CouponRule {
        code: "SCOOP20",
        kind: DiscountKind::Percent,
        amount: dec!(20),
    },
    CouponRule {
        code: "FIRSTMONTH25",
        kind: DiscountKind::Fixed,
        amount: dec!(25),
    },
];

/// Result of validating a user-entered code.
#[derive(Debug, Clone, Serialize)]
pub struct CouponCheck {
    pub valid: bool,
    pub code: String,
    pub discount: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<DiscountKind>,
    pub message: String,
}

/// Look up a code in the known set, case-insensitively.
pub fn find_coupon(code: &str) -> Option<&'static CouponRule> {
    let upcased = code.trim().to_ascii_uppercase();
    KNOWN_COUPONS.iter().find(|rule| rule.code == upcased)
}

/// Validate a user-entered code. Unknown codes are invalid with a generic
/// message, never an error.
pub fn validate_coupon(code: &str) -> CouponCheck {
    let upcased = code.trim().to_ascii_uppercase();
    match find_coupon(&upcased) {
        Some(rule) => CouponCheck {
            valid: true,
            code: rule.code.to_string(),
            discount: rule.amount,
            kind: Some(rule.kind),
            message: match rule.kind {
                DiscountKind::Percent => format!("{}% off applied", rule.amount),
                DiscountKind::Fixed => format!("${} off applied", rule.amount),
            },
        },
        None => CouponCheck {
            valid: false,
            code: upcased,
            discount: Decimal::ZERO,
            kind: None,
            message: "That code isn't valid.".into(),
        },
    }
}

/// Apply a rule to a base price. Percent multiplies, fixed subtracts;
/// the result is floored at zero and rounded to cents.
pub fn apply_discount(base: Decimal, rule: &CouponRule) -> Decimal {
    let discounted = match rule.kind {
        DiscountKind::Percent => base * (dec!(100) - rule.amount) / dec!(100),
        DiscountKind::Fixed => base - rule.amount,
    };
    discounted.max(Decimal::ZERO).round_dp(2)
}

/// Server-authoritative final price: base price with the coupon (if any and
/// valid) applied. A missing or unknown code leaves the base untouched.
pub fn final_price(base: Decimal, coupon_code: Option<&str>) -> Decimal {
    match coupon_code.and_then(find_coupon) {
        Some(rule) => apply_discount(base, rule),
        None => base.round_dp(2),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save10_takes_ten_percent_off_100() {
        let rule = find_coupon("SAVE10").unwrap();
        assert_eq!(apply_discount(dec!(100), rule), dec!(90.00));
    }

    #[test]
    fn codes_are_case_insensitive() {
        let check = validate_coupon("save10");
        assert!(check.valid);
        assert_eq!(check.code, "SAVE10");
        assert_eq!(check.discount, dec!(10));
        assert_eq!(check.kind, Some(DiscountKind::Percent));
    }

    #[test]
    fn unknown_code_is_invalid_not_an_error() {
        let check = validate_coupon("TOTALLYFAKE");
        assert!(!check.valid);
        assert_eq!(check.discount, Decimal::ZERO);
        assert!(check.kind.is_none());
    }

    #[test]
    fn validation_is_idempotent() {
        let first = validate_coupon("SAVE10");
        let second = validate_coupon("SAVE10");
        assert_eq!(first.discount, second.discount);
        assert_eq!(first.valid, second.valid);
    }

    #[test]
    fn invalid_code_does_not_disturb_valid_application() {
        let base = dec!(100);
        let with_coupon = final_price(base, Some("SAVE10"));
        // Trying a bad code afterwards changes nothing about the valid one.
        let _ = validate_coupon("NOPE");
        assert_eq!(final_price(base, Some("SAVE10")), with_coupon);
        assert_eq!(with_coupon, dec!(90.00));
    }

    #[test]
    fn fixed_discount_floors_at_zero() {
        let rule = find_coupon("FIRSTMONTH25").unwrap();
        assert_eq!(apply_discount(dec!(110), rule), dec!(85.00));
        assert_eq!(apply_discount(dec!(10), rule), Decimal::ZERO);
    }

    #[test]
    fn final_price_ignores_missing_or_bad_codes() {
        assert_eq!(final_price(dec!(110), None), dec!(110.00));
        assert_eq!(final_price(dec!(110), Some("BOGUS")), dec!(110.00));
        assert_eq!(final_price(dec!(110), Some("scoop20")), dec!(88.00));
    }
}
