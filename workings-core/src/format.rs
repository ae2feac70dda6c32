//! Number formatting for trace strings
//!
//! Numbers are rounded to the configured decimal places with trailing zeros
//! removed, so `54.0000` reads `54` and `2.2000` reads `2.2`. Parsing a
//! formatted number gives back the value within half a unit in the last
//! printed place.

/// Format with at most `places` decimals.
pub fn num(x: f64, places: usize) -> String {
    if x.is_nan() {
        return "NaN".to_string();
    }
    if x.is_infinite() {
        return if x > 0.0 { "∞".to_string() } else { "-∞".to_string() };
    }

    // Very small non-zero numbers keep three significant digits
    let threshold = 10f64.powi(-(places as i32));
    let s = if x != 0.0 && x.abs() < threshold {
        let log10 = x.abs().log10().floor() as i32;
        let sig_places = ((-log10) + 2) as usize;
        format!("{:.prec$}", x, prec = sig_places)
    } else {
        format!("{:.prec$}", x, prec = places)
    };

    let trimmed = if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        s
    };

    if trimmed == "-0" {
        "0".to_string()
    } else {
        trimmed
    }
}

/// Comma-separated list of formatted numbers.
pub fn num_list(xs: &[f64], places: usize) -> String {
    xs.iter()
        .map(|x| num(*x, places))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Wrap negative numbers in parentheses for use inside larger expressions.
pub fn paren(x: f64, places: usize) -> String {
    let s = num(x, places);
    if s.starts_with('-') {
        format!("({})", s)
    } else {
        s
    }
}

/// Join terms with `+`, eliding the middle of long sums.
pub fn sum_terms(terms: &[String]) -> String {
    const MAX_TERMS: usize = 8;
    if terms.len() <= MAX_TERMS {
        terms.join(" + ")
    } else {
        format!(
            "{} + … + {}",
            terms[..3].join(" + "),
            terms[terms.len() - 2..].join(" + ")
        )
    }
}
