//! Useful functions for parsing and accounting.

use crate::{Decimal, Error, ErrorLevel, ErrorType, Source};

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// Parses a numeric literal such as `-1,234.50` into a [`Decimal`].
///
/// Commas are accepted as thousands separators in the integer part only, and
/// must separate groups of exactly three digits. The error is a short reason
/// suitable for a diagnostic message.
pub fn parse_number(num_str: &str) -> Result<Decimal, String> {
    let malformed = || format!("Malformed number {}.", num_str);
    let (sign, body) = if let Some(body) = num_str.strip_prefix('-') {
        ("-", body)
    } else {
        ("", num_str.strip_prefix('+').unwrap_or(num_str))
    };
    let (int_part, frac_part) = match body.split_once('.') {
        Some((int_part, frac_part)) => (int_part, Some(frac_part)),
        None => (body, None),
    };
    let int_digits = if int_part.contains(',') {
        let mut groups = int_part.split(',');
        let first = groups.next().unwrap_or_default();
        if !is_digits(first) || first.len() > 3 {
            return Err(malformed());
        }
        let mut digits = first.to_string();
        for group in groups {
            if !is_digits(group) || group.len() != 3 {
                return Err(malformed());
            }
            digits.push_str(group);
        }
        digits
    } else if int_part.is_empty() || is_digits(int_part) {
        int_part.to_string()
    } else {
        return Err(malformed());
    };
    let cleaned = match frac_part {
        Some(frac) if is_digits(frac) => {
            let int_digits = if int_digits.is_empty() { "0" } else { &int_digits };
            format!("{}{}.{}", sign, int_digits, frac)
        }
        Some("") if !int_digits.is_empty() => format!("{}{}", sign, int_digits),
        None if !int_digits.is_empty() => format!("{}{}", sign, int_digits),
        _ => return Err(malformed()),
    };
    cleaned
        .parse::<Decimal>()
        .map_err(|e| format!("Invalid number {}: {}.", num_str, e))
}

/// Parses a [`Decimal`](crate::Decimal) from a [`&str`], reporting failures
/// as syntax errors located at `src`.
#[inline]
pub fn parse_decimal(num_str: &str, src: &Source) -> Result<Decimal, Error> {
    parse_number(num_str).map_err(|msg| Error {
        msg,
        src: src.clone(),
        r#type: ErrorType::Syntax,
        level: ErrorLevel::Error,
    })
}

/// Returns `true` if `account` is `parent` itself or one of its
/// sub-accounts. An empty `parent` contains every account.
///
/// ```
/// use tally::utils::is_sub_account;
/// assert!(is_sub_account("Expenses:Food:Bread", "Expenses:Food"));
/// assert!(!is_sub_account("Expenses:Foodstuff", "Expenses:Food"));
/// ```
pub fn is_sub_account(account: &str, parent: &str) -> bool {
    if parent.is_empty() {
        return true;
    }
    match account.strip_prefix(parent) {
        Some(rest) => rest.is_empty() || rest.starts_with(':'),
        None => false,
    }
}

/// Returns the top-level segment of `account`, e.g. `Assets` for
/// `Assets:Bank:Checking`.
pub fn root_account(account: &str) -> &str {
    account.split(':').next().unwrap_or(account)
}
