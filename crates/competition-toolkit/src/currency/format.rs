use super::CurrencyCode;

pub fn currency_symbol(code: &CurrencyCode) -> &str {
    match code.as_str() {
        "TRY" => "₺",
        "EUR" => "€",
        "USD" => "$",
        other => other,
    }
}

/// Short display form: `₺600.0M`, `€12.5K`, `$950.00`.
pub fn format_currency(amount: f64, code: &CurrencyCode) -> String {
    let symbol = currency_symbol(code);
    let sign = if amount < 0.0 { "-" } else { "" };
    let magnitude = amount.abs();

    if magnitude >= 1_000_000.0 {
        format!("{sign}{symbol}{:.1}M", magnitude / 1_000_000.0)
    } else if magnitude >= 1_000.0 {
        format!("{sign}{symbol}{:.1}K", magnitude / 1_000.0)
    } else {
        format!("{sign}{symbol}{}", format_amount(magnitude))
    }
}

/// Two decimals with comma thousands separators, e.g. `1,234,567.89`.
pub fn format_amount(amount: f64) -> String {
    let fixed = format!("{:.2}", amount.abs());
    let (whole, fraction) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (index, digit) in whole.chars().enumerate() {
        if index > 0 && (whole.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if amount < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{sign}{grouped}.{fraction}")
}
