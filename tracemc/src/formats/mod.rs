//! Input and output formats of the translator.
//!
//! [`trace`] reads the meta-interpreter dump; [`prism`] renders the derived models
//! in the textual layouts expected by probabilistic model checkers.

use thiserror::Error;

pub mod prism;
pub mod trace;

/// Structural errors raised while reading a trace.
///
/// Any of these aborts the whole run; there is no partial output for a trace that
/// lacks one of its required markers.
#[derive(Debug, Error)]
pub enum TraceError {
    #[error("Could not find state or transition count.")]
    MissingCounts,
    #[error("Could not find initial state ID.")]
    MissingInitialState,
    #[error("Could not find transitions.")]
    MissingTransitions,
}

/// Renders a value with six significant digits, rounding half up.
///
/// Trailing zeros and a trailing decimal point are stripped, so `0.5` stays
/// `"0.5"` and `2.0` becomes `"2"`. Zero bypasses rounding and renders as `"0"`.
pub fn round_sig(value: f64) -> String {
    if value == 0.0 {
        return "0".to_owned();
    }
    let (sign, repr) = if value < 0.0 {
        ("-", format!("{}", -value))
    } else {
        ("", format!("{value}"))
    };

    // Digits of the plain decimal expansion and the position of the point.
    let point = repr.find('.').unwrap_or(repr.len());
    let digits: Vec<u8> = repr
        .bytes()
        .filter(|b| b.is_ascii_digit())
        .map(|b| b - b'0')
        .collect();
    let Some(first) = digits.iter().position(|&d| d != 0) else {
        return "0".to_owned();
    };

    let keep = first + 6;
    let mut kept: Vec<u8> = digits[first..digits.len().min(keep)].to_vec();
    // Half up: any first dropped digit of five or more rounds away from zero.
    if digits.len() > keep && digits[keep] >= 5 {
        let mut carry = true;
        for digit in kept.iter_mut().rev() {
            if carry {
                *digit += 1;
                carry = *digit == 10;
                if carry {
                    *digit = 0;
                }
            }
        }
        if carry {
            kept.insert(0, 1);
        }
    }

    // Exponent of the leading kept digit, relative to the decimal point.
    let mut exponent = point as isize - first as isize - 1;
    if kept.len() > 6 {
        exponent += 1; // carry overflowed into a new leading digit
    }

    let mut out = String::from(sign);
    if exponent < 0 {
        out.push_str("0.");
        for _ in 0..(-exponent - 1) {
            out.push('0');
        }
        for &digit in &kept {
            out.push((b'0' + digit) as char);
        }
    } else {
        for (i, &digit) in kept.iter().enumerate() {
            if i as isize == exponent + 1 {
                out.push('.');
            }
            out.push((b'0' + digit) as char);
        }
        for _ in kept.len() as isize..exponent + 1 {
            out.push('0');
        }
    }
    if out.contains('.') {
        out = out.trim_end_matches('0').trim_end_matches('.').to_owned();
    }
    out
}
