use once_cell::sync::Lazy;
use regex::Regex;

// Optional (00|+) country code, digit groups with separators, optional extension.
static PHONE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:(?:\(?(?:00|\+)([1-4]\d\d|[1-9]\d?)\)?)?[\-. \\/]?)?((?:\(?\d+\)?[\-. \\/]?)*)(?:[\-. \\/]?(?:#|ext\.?|extension|x)[\-. \\/]?(\d+))?$",
    )
    .expect("phone number pattern is valid")
});

/// Permissive check for an international phone number. Passing it says
/// nothing about deliverability.
pub fn is_phone_number(text: &str) -> bool {
    let text = text.trim();
    !text.is_empty() && PHONE_RE.is_match(text)
}
