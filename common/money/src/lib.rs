use bigdecimal::BigDecimal;
use bigdecimal::ToPrimitive;
use tracing::debug;

/// Parse a decimal string synced verbatim from the ERP into an f64.
///
/// The sync pipeline writes whatever the upstream API returned, so columns may
/// hold NULL, empty strings, thousands separators, or currency prefixes. Data
/// quality must never crash analytics: anything unparseable coerces to 0.0.
pub fn parse_loose(raw: Option<&str>) -> f64 {
    let Some(raw) = raw else {
        return 0.0;
    };
    let trimmed = raw.trim().trim_start_matches('$');
    if trimmed.is_empty() {
        return 0.0;
    }
    let cleaned: String = trimmed.chars().filter(|c| *c != ',').collect();
    match cleaned.parse::<f64>() {
        Ok(value) if value.is_finite() => value,
        _ => {
            debug!(raw = %raw, "unparseable decimal string coerced to zero");
            0.0
        }
    }
}

/// Convert a nullable NUMERIC column value to f64, treating NULL and
/// out-of-range values as zero.
pub fn decimal_to_f64(value: Option<&BigDecimal>) -> f64 {
    value.and_then(|v| v.to_f64()).unwrap_or(0.0)
}

/// Round a reporting amount to 2 decimal places.
pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
