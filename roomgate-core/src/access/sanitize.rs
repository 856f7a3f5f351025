//! Scrubbing of location-revealing text from caller-facing messages.

/// Message returned in place of anything that looks location-related.
pub const SANITIZED_LOCATION_MESSAGE: &str = "An error occurred processing the location request";

/// Whole-word matches. Too short to match as substrings without catching
/// ordinary words ("relation", "long").
const SENSITIVE_WORDS: [&str; 5] = ["lat", "lon", "lng", "point", "srid"];

/// Substring matches, covering plurals and inflections.
const SENSITIVE_FRAGMENTS: [&str; 8] = [
    "latitude",
    "longitude",
    "coordinate",
    "location",
    "address",
    "geograph",
    "geometr",
    "st_",
];

/// A decimal with this many fractional digits reads as a coordinate.
const COORDINATE_FRACTION_DIGITS: usize = 4;

/// Returns `message` unchanged unless it contains location-like text, in
/// which case a fixed generic message is returned instead.
///
/// Matching is case-insensitive. Besides the keyword list, any decimal
/// number with four or more fractional digits is treated as a coordinate.
///
/// ```
/// use roomgate_core::access::sanitize_error_message;
///
/// assert_eq!(sanitize_error_message("Room not found"), "Room not found");
/// assert_eq!(
///     sanitize_error_message("ST_DWithin failed"),
///     "An error occurred processing the location request"
/// );
/// ```
#[must_use]
pub fn sanitize_error_message(message: &str) -> String {
    if is_sensitive(message) {
        SANITIZED_LOCATION_MESSAGE.to_string()
    } else {
        message.to_string()
    }
}

fn is_sensitive(message: &str) -> bool {
    let lower = message.to_lowercase();

    if SENSITIVE_FRAGMENTS.iter().any(|f| lower.contains(f)) {
        return true;
    }

    let words = lower
        .split(|c: char| !c.is_alphanumeric() && c != '_')
        .filter(|w| !w.is_empty());
    for word in words {
        if SENSITIVE_WORDS.contains(&word) {
            return true;
        }
    }

    contains_coordinate_number(&lower)
}

fn contains_coordinate_number(text: &str) -> bool {
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c.is_ascii_digit() && chars.peek() == Some(&'.') {
            chars.next();
            let mut fraction = 0;
            while chars.peek().is_some_and(char::is_ascii_digit) {
                chars.next();
                fraction += 1;
            }
            if fraction >= COORDINATE_FRACTION_DIGITS {
                return true;
            }
        }
    }
    false
}
