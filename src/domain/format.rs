//! Number formatting helpers for indicator display strings.

/// Round to whole units and group thousands with commas, e.g. `58,500`.
pub fn thousands(value: f64) -> String {
    let rounded = format!("{:.0}", value);
    let (sign, digits) = match rounded.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", rounded.as_str()),
    };

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("{}{}", sign, grouped)
}

/// `"+"` for non-negative values, empty otherwise. Negative values carry
/// their own sign when formatted.
pub fn plus_if_non_negative(value: f64) -> &'static str {
    if value >= 0.0 { "+" } else { "" }
}
