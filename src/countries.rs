//! Dialing-code table and longest-prefix country detection.

use once_cell::sync::Lazy;
use serde::Serialize;

/// One international dialing code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CountryCode {
    pub code: &'static str,
    pub country: &'static str,
    pub flag: &'static str,
    pub timezone: &'static str,
}

const fn entry(
    code: &'static str,
    country: &'static str,
    flag: &'static str,
    timezone: &'static str,
) -> CountryCode {
    CountryCode {
        code,
        country,
        flag,
        timezone,
    }
}

/// Built-in table, in no particular order.
pub const COUNTRY_CODES: &[CountryCode] = &[
    entry("+1", "United States / Canada", "🇺🇸", "UTC-5 to UTC-8"),
    entry("+7", "Russia / Kazakhstan", "🇷🇺", "UTC+3 to UTC+12"),
    entry("+20", "Egypt", "🇪🇬", "UTC+2"),
    entry("+27", "South Africa", "🇿🇦", "UTC+2"),
    entry("+30", "Greece", "🇬🇷", "UTC+2"),
    entry("+31", "Netherlands", "🇳🇱", "UTC+1"),
    entry("+32", "Belgium", "🇧🇪", "UTC+1"),
    entry("+33", "France", "🇫🇷", "UTC+1"),
    entry("+34", "Spain", "🇪🇸", "UTC+1"),
    entry("+36", "Hungary", "🇭🇺", "UTC+1"),
    entry("+39", "Italy", "🇮🇹", "UTC+1"),
    entry("+40", "Romania", "🇷🇴", "UTC+2"),
    entry("+41", "Switzerland", "🇨🇭", "UTC+1"),
    entry("+43", "Austria", "🇦🇹", "UTC+1"),
    entry("+44", "United Kingdom", "🇬🇧", "UTC+0"),
    entry("+45", "Denmark", "🇩🇰", "UTC+1"),
    entry("+46", "Sweden", "🇸🇪", "UTC+1"),
    entry("+47", "Norway", "🇳🇴", "UTC+1"),
    entry("+48", "Poland", "🇵🇱", "UTC+1"),
    entry("+49", "Germany", "🇩🇪", "UTC+1"),
    entry("+51", "Peru", "🇵🇪", "UTC-5"),
    entry("+52", "Mexico", "🇲🇽", "UTC-6"),
    entry("+54", "Argentina", "🇦🇷", "UTC-3"),
    entry("+55", "Brazil", "🇧🇷", "UTC-3"),
    entry("+56", "Chile", "🇨🇱", "UTC-4"),
    entry("+57", "Colombia", "🇨🇴", "UTC-5"),
    entry("+58", "Venezuela", "🇻🇪", "UTC-4"),
    entry("+60", "Malaysia", "🇲🇾", "UTC+8"),
    entry("+61", "Australia", "🇦🇺", "UTC+8 to UTC+11"),
    entry("+62", "Indonesia", "🇮🇩", "UTC+7 to UTC+9"),
    entry("+63", "Philippines", "🇵🇭", "UTC+8"),
    entry("+64", "New Zealand", "🇳🇿", "UTC+12"),
    entry("+65", "Singapore", "🇸🇬", "UTC+8"),
    entry("+66", "Thailand", "🇹🇭", "UTC+7"),
    entry("+81", "Japan", "🇯🇵", "UTC+9"),
    entry("+82", "South Korea", "🇰🇷", "UTC+9"),
    entry("+84", "Vietnam", "🇻🇳", "UTC+7"),
    entry("+86", "China", "🇨🇳", "UTC+8"),
    entry("+90", "Turkey", "🇹🇷", "UTC+3"),
    entry("+91", "India", "🇮🇳", "UTC+5:30"),
    entry("+92", "Pakistan", "🇵🇰", "UTC+5"),
    entry("+93", "Afghanistan", "🇦🇫", "UTC+4:30"),
    entry("+94", "Sri Lanka", "🇱🇰", "UTC+5:30"),
    entry("+95", "Myanmar", "🇲🇲", "UTC+6:30"),
    entry("+98", "Iran", "🇮🇷", "UTC+3:30"),
    entry("+212", "Morocco", "🇲🇦", "UTC+1"),
    entry("+213", "Algeria", "🇩🇿", "UTC+1"),
    entry("+216", "Tunisia", "🇹🇳", "UTC+1"),
    entry("+218", "Libya", "🇱🇾", "UTC+2"),
    entry("+220", "Gambia", "🇬🇲", "UTC+0"),
    entry("+234", "Nigeria", "🇳🇬", "UTC+1"),
    entry("+254", "Kenya", "🇰🇪", "UTC+3"),
    entry("+255", "Tanzania", "🇹🇿", "UTC+3"),
    entry("+256", "Uganda", "🇺🇬", "UTC+3"),
    entry("+260", "Zambia", "🇿🇲", "UTC+2"),
    entry("+263", "Zimbabwe", "🇿🇼", "UTC+2"),
    entry("+351", "Portugal", "🇵🇹", "UTC+0"),
    entry("+352", "Luxembourg", "🇱🇺", "UTC+1"),
    entry("+353", "Ireland", "🇮🇪", "UTC+0"),
    entry("+354", "Iceland", "🇮🇸", "UTC+0"),
    entry("+358", "Finland", "🇫🇮", "UTC+2"),
    entry("+380", "Ukraine", "🇺🇦", "UTC+2"),
    entry("+381", "Serbia", "🇷🇸", "UTC+1"),
    entry("+385", "Croatia", "🇭🇷", "UTC+1"),
    entry("+386", "Slovenia", "🇸🇮", "UTC+1"),
    entry("+387", "Bosnia & Herzegovina", "🇧🇦", "UTC+1"),
    entry("+420", "Czech Republic", "🇨🇿", "UTC+1"),
    entry("+421", "Slovakia", "🇸🇰", "UTC+1"),
    entry("+966", "Saudi Arabia", "🇸🇦", "UTC+3"),
    entry("+971", "UAE", "🇦🇪", "UTC+4"),
    entry("+972", "Israel", "🇮🇱", "UTC+2"),
    entry("+973", "Bahrain", "🇧🇭", "UTC+3"),
    entry("+974", "Qatar", "🇶🇦", "UTC+3"),
    entry("+977", "Nepal", "🇳🇵", "UTC+5:45"),
    entry("+994", "Azerbaijan", "🇦🇿", "UTC+4"),
    entry("+995", "Georgia", "🇬🇪", "UTC+4"),
    entry("+998", "Uzbekistan", "🇺🇿", "UTC+5"),
];

/// [`COUNTRY_CODES`] sorted by code length, longest first.
static BY_LENGTH: Lazy<Vec<CountryCode>> = Lazy::new(|| by_length(COUNTRY_CODES));

fn by_length(table: &[CountryCode]) -> Vec<CountryCode> {
    let mut sorted = table.to_vec();
    // Stable, so equal-length codes keep table order.
    sorted.sort_by(|a, b| b.code.len().cmp(&a.code.len()));
    sorted
}

/// Detect the country of a cleaned number using the built-in table.
pub fn detect_country(number: &str) -> Option<&'static CountryCode> {
    first_prefix(&BY_LENGTH, &with_plus(number))
}

/// Detect the country of a cleaned number against an arbitrary table.
///
/// Codes are tried longest first, so `+123` wins over `+12` and `+1` when
/// all three are textual prefixes of the number.
pub fn detect_country_in(table: &[CountryCode], number: &str) -> Option<CountryCode> {
    first_prefix(&by_length(table), &with_plus(number)).copied()
}

fn first_prefix<'a>(sorted: &'a [CountryCode], number: &str) -> Option<&'a CountryCode> {
    sorted.iter().find(|entry| number.starts_with(entry.code))
}

/// `+` form of a number: an international `00` prefix becomes `+`, and a
/// bare number gets a leading `+`.
fn with_plus(number: &str) -> String {
    if number.starts_with('+') {
        number.to_string()
    } else {
        format!("+{}", number.strip_prefix("00").unwrap_or(number))
    }
}
