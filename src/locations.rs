//! Zip Validator: checks a candidate zip against the admin-configured
//! service areas.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::store::model::ServiceLocation;

static ZIP_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{5}$").expect("valid regex"));

/// Outcome of a zip-code check.
#[derive(Debug, Clone, Serialize)]
pub struct ZipCheck {
    pub is_valid: bool,
    pub message: String,
}

/// Whether the input is exactly five ASCII digits. Leading zeros are fine.
pub fn is_well_formed(zip: &str) -> bool {
    ZIP_RE.is_match(zip)
}

/// Validate a zip against all active service locations.
///
/// Malformed input is rejected before any membership check, with a message
/// distinct from the not-yet-served rejection. Membership is exact-match
/// across the union of zip lists of locations whose `active` flag is set;
/// the order of `locations` does not affect the result.
pub fn validate_zip(zip: &str, locations: &[ServiceLocation]) -> ZipCheck {
    let zip = zip.trim();

    if !is_well_formed(zip) {
        return ZipCheck {
            is_valid: false,
            message: "Please enter a valid 5-digit zip code.".into(),
        };
    }

    let served = locations
        .iter()
        .filter(|loc| loc.active)
        .any(|loc| loc.zip_codes.iter().any(|z| z == zip));

    if served {
        ZipCheck {
            is_valid: true,
            message: "Great news, we serve your area!".into(),
        }
    } else {
        ZipCheck {
            is_valid: false,
            message: "We're not in your area yet, but join the waitlist and we'll let you know \
                      when we launch near you."
                .into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::model::NewServiceLocation;

    fn location(city: &str, zips: &[&str], active: bool) -> ServiceLocation {
        ServiceLocation::new(NewServiceLocation {
            city: city.into(),
            state: "FL".into(),
            zip_codes: zips.iter().map(|z| z.to_string()).collect(),
            launch_date: None,
            active,
        })
    }

    #[test]
    fn accepts_zip_in_active_location() {
        let locations = vec![
            location("Yulee", &["32097"], true),
            location("Fernandina Beach", &["32034", "32035"], true),
        ];
        assert!(validate_zip("32097", &locations).is_valid);
        assert!(validate_zip("32035", &locations).is_valid);
    }

    #[test]
    fn result_is_order_independent() {
        let mut locations = vec![
            location("Yulee", &["32097"], true),
            location("Fernandina Beach", &["32034"], true),
            location("Jacksonville", &["32218"], false),
        ];
        let before: Vec<bool> = ["32097", "32034", "32218", "00000"]
            .iter()
            .map(|z| validate_zip(z, &locations).is_valid)
            .collect();
        locations.reverse();
        let after: Vec<bool> = ["32097", "32034", "32218", "00000"]
            .iter()
            .map(|z| validate_zip(z, &locations).is_valid)
            .collect();
        assert_eq!(before, after);
    }

    #[test]
    fn inactive_locations_do_not_count() {
        let locations = vec![location("Jacksonville", &["32218"], false)];
        let check = validate_zip("32218", &locations);
        assert!(!check.is_valid);
        assert!(check.message.contains("waitlist"));
    }

    #[test]
    fn unknown_zip_gets_waitlist_message() {
        let locations = vec![location("Yulee", &["32097"], true)];
        let check = validate_zip("00000", &locations);
        assert!(!check.is_valid);
        assert!(check.message.contains("not in your area yet"));
    }

    #[test]
    fn malformed_input_rejected_before_lookup() {
        for input in ["1234", "123456", "32ab7", "", "32097-1234"] {
            let check = validate_zip(input, &[]);
            assert!(!check.is_valid, "{input:?} should be malformed");
            assert!(check.message.contains("5-digit"), "{input:?}");
        }
    }

    #[test]
    fn leading_zero_zip_is_well_formed() {
        assert!(is_well_formed("02134"));
        let locations = vec![location("Brighton", &["02134"], true)];
        assert!(validate_zip("02134", &locations).is_valid);
    }

    #[test]
    fn surrounding_whitespace_is_tolerated() {
        let locations = vec![location("Yulee", &["32097"], true)];
        assert!(validate_zip("  32097 ", &locations).is_valid);
    }
}
