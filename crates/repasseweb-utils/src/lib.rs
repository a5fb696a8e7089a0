//! Utility functions and helpers

use chrono::NaiveDate;
use rust_decimal::Decimal;

/// Group the digits of an integer string with a separator every three places
pub fn group_digits(digits: &str, separator: char) -> String {
    let mut result = String::new();
    let mut count = 0;
    for c in digits.chars().rev() {
        if count == 3 {
            result.push(separator);
            count = 0;
        }
        result.push(c);
        count += 1;
    }
    result.chars().rev().collect()
}

/// Format an amount as Brazilian reais, e.g. `R$ 1.234,56`
pub fn format_brl(value: Decimal) -> String {
    let rounded = value.round_dp(2);
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() { "-" } else { "" };
    let text = format!("{:.2}", rounded.abs());
    let (int_part, frac_part) = text.split_once('.').unwrap_or((text.as_str(), "00"));
    format!("{}R$ {},{}", sign, group_digits(int_part, '.'), frac_part)
}

/// Format a date the way pt-BR locales print it (`dd/mm/yyyy`)
pub fn format_date_br(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

/// Hide a PIX key in logs, keeping only the last four characters
pub fn mask_pix_key(key: &str) -> String {
    let chars: Vec<char> = key.trim().chars().collect();
    if chars.len() <= 4 {
        return "****".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("***{}", tail)
}
