//! ISBN normalization and validation.
//!
//! Providers receive raw user input such as `978-0-441-01359-3` or `0 441 01359 7`.
//! These helpers strip separators and check digits before any request is made.

/// Strip everything except digits and a trailing `X`, uppercasing the check digit.
///
/// Returns `None` if the remaining characters cannot form an ISBN-10 or ISBN-13.
pub fn normalize(raw: &str) -> Option<String> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == 'x' || *c == 'X')
        .map(|c| c.to_ascii_uppercase())
        .collect();

    match cleaned.len() {
        10 if cleaned[..9].bytes().all(|b| b.is_ascii_digit()) => Some(cleaned),
        13 if cleaned.bytes().all(|b| b.is_ascii_digit()) => Some(cleaned),
        _ => None,
    }
}

/// Check the ISBN-10 checksum of an already normalized value.
pub fn is_valid_isbn10(isbn: &str) -> bool {
    if isbn.len() != 10 {
        return false;
    }
    let mut sum = 0u32;
    for (i, c) in isbn.chars().enumerate() {
        let value = match c {
            '0'..='9' => c as u32 - '0' as u32,
            'X' if i == 9 => 10,
            _ => return false,
        };
        sum += value * (10 - i as u32);
    }
    sum % 11 == 0
}

/// Check the ISBN-13 checksum of an already normalized value.
pub fn is_valid_isbn13(isbn: &str) -> bool {
    if isbn.len() != 13 || !isbn.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    let sum: u32 = isbn
        .bytes()
        .enumerate()
        .map(|(i, b)| {
            let digit = (b - b'0') as u32;
            if i % 2 == 0 {
                digit
            } else {
                digit * 3
            }
        })
        .sum();
    sum % 10 == 0
}

/// Normalize and validate in one step.
pub fn parse(raw: &str) -> Option<String> {
    let isbn = normalize(raw)?;
    let valid = match isbn.len() {
        10 => is_valid_isbn10(&isbn),
        _ => is_valid_isbn13(&isbn),
    };
    valid.then_some(isbn)
}

/// Convert a valid ISBN-10 into its `978`-prefixed ISBN-13 form.
pub fn to_isbn13(isbn10: &str) -> Option<String> {
    if !is_valid_isbn10(isbn10) {
        return None;
    }
    let body = format!("978{}", &isbn10[..9]);
    let sum: u32 = body
        .bytes()
        .enumerate()
        .map(|(i, b)| {
            let digit = (b - b'0') as u32;
            if i % 2 == 0 {
                digit
            } else {
                digit * 3
            }
        })
        .sum();
    let check = (10 - sum % 10) % 10;
    Some(format!("{body}{check}"))
}

/// Convert a `978`-prefixed ISBN-13 back to ISBN-10. `979` numbers have no ISBN-10 form.
pub fn to_isbn10(isbn13: &str) -> Option<String> {
    if !is_valid_isbn13(isbn13) || !isbn13.starts_with("978") {
        return None;
    }
    let body = &isbn13[3..12];
    let sum: u32 = body
        .bytes()
        .enumerate()
        .map(|(i, b)| (b - b'0') as u32 * (10 - i as u32))
        .sum();
    let check = match (11 - sum % 11) % 11 {
        10 => 'X',
        n => char::from_digit(n, 10)?,
    };
    Some(format!("{body}{check}"))
}
