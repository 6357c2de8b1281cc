use crate::error::PriceFormatError;

/// Turns a price as shown on a product page into a number.
///
/// Everything up to the first `currency` occurrence is dropped. A rendered
/// `whole\nfraction` pair becomes `whole.fraction`, then thousands commas are
/// removed. Neither step is required to apply.
pub fn parse_price(raw: &str, currency: &str) -> Result<f64, PriceFormatError> {
    let (_, remainder) = raw
        .split_once(currency)
        .filter(|_| !currency.is_empty())
        .ok_or_else(|| PriceFormatError::MissingCurrency {
            raw: raw.to_string(),
            currency: currency.to_string(),
        })?;

    let joined = join_fraction(remainder);
    let digits = joined.replace(',', "");
    let digits = digits.trim();

    if digits.is_empty() {
        return Err(PriceFormatError::NoNumericContent {
            raw: raw.to_string(),
        });
    }

    let value: f64 = digits
        .parse()
        .map_err(|source| PriceFormatError::NotANumber {
            value: digits.to_string(),
            source,
        })?;

    // f64 parsing also accepts "inf" and "NaN"
    if !value.is_finite() {
        return Err(PriceFormatError::NoNumericContent {
            raw: raw.to_string(),
        });
    }

    Ok(value)
}

fn join_fraction(remainder: &str) -> String {
    match remainder.split_once('\n') {
        Some((whole, rest)) => {
            let fraction = rest.split('\n').next().unwrap_or_default();
            format!("{}.{}", whole.trim(), fraction.trim())
        }
        None => remainder.to_string(),
    }
}
