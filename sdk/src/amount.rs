use crate::error::ValidationError;

/// Parses a UI amount such as `"1_000.25"` into base units.
pub fn parse_amount(value: &str, decimals: u8) -> Result<u64, ValidationError> {
    let sanitized = value.trim().replace('_', "");
    let invalid = || ValidationError::InvalidAmount(value.to_string());
    if sanitized.is_empty() || sanitized.starts_with('-') {
        return Err(invalid());
    }

    let (whole, fractional) = sanitized.split_once('.').unwrap_or((sanitized.as_str(), ""));
    if whole.is_empty() && fractional.is_empty() {
        return Err(invalid());
    }
    if fractional.len() > decimals as usize {
        return Err(ValidationError::TooManyDecimals(decimals));
    }
    if !whole.chars().chain(fractional.chars()).all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }

    let whole_value = parse_digits(whole)?;
    let mut fraction = fractional.to_string();
    while fraction.len() < decimals as usize {
        fraction.push('0');
    }
    let fractional_value = parse_digits(&fraction)?;

    let scale = 10u64
        .checked_pow(decimals as u32)
        .ok_or(ValidationError::AmountOverflow)?;
    whole_value
        .checked_mul(scale)
        .and_then(|value| value.checked_add(fractional_value))
        .ok_or(ValidationError::AmountOverflow)
}

fn parse_digits(digits: &str) -> Result<u64, ValidationError> {
    if digits.is_empty() {
        return Ok(0);
    }
    // Only digits reach here, so the sole failure is overflow.
    digits
        .parse::<u64>()
        .map_err(|_| ValidationError::AmountOverflow)
}

pub fn format_amount(amount: u64, decimals: u8) -> String {
    if decimals == 0 {
        return amount.to_string();
    }
    let width = decimals as usize;
    match 10u128.checked_pow(decimals as u32) {
        Some(scale) => {
            let whole = amount as u128 / scale;
            let frac = amount as u128 % scale;
            format!("{}.{:0width$}", whole, frac, width = width)
        }
        // Past 10^38 every u64 is a pure fraction.
        None => format!("0.{:0width$}", amount, width = width),
    }
}
