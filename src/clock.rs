//! Conversion of the clock-style duration strings found in CEL headers.

/// Converts a "H:MM:SS" or "MM:SS" string to total seconds.
///
/// Any malformed input (empty string, a component that is not an integer,
/// a component count other than two or three) yields `f64::NAN` rather
/// than an error. Epoch boundaries recorded this way simply drop out of the
/// epoch set while the rest of the file remains usable.
pub fn clock_to_seconds(text: &str) -> f64 {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return f64::NAN;
    }

    let mut parts = Vec::with_capacity(3);
    for component in trimmed.split(':') {
        match component.trim().parse::<i64>() {
            Ok(value) => parts.push(value),
            Err(_) => return f64::NAN,
        }
    }

    match parts.as_slice() {
        [hours, minutes, seconds] => (hours * 3600 + minutes * 60 + seconds) as f64,
        [minutes, seconds] => (minutes * 60 + seconds) as f64,
        _ => f64::NAN,
    }
}
