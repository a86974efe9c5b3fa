//! Human-readable number, byte and duration formatting.

/// Binary byte units, indexed by power of 1024.
pub const BYTE_UNITS: [&str; 7] = ["B", "KiB", "MiB", "GiB", "TiB", "PiB", "EiB"];

/// Scales a byte count down to the largest unit that keeps at least `limes`
/// significant integer digits, rounded to `comma` decimals.
///
/// Returns the formatted number and its unit. Plain bytes never carry decimals.
///
/// ```
/// use r3nz_mysql_admin::status::format_byte_down;
///
/// assert_eq!(format_byte_down(300.0, 3, 1), ("300".to_string(), "B"));
/// assert_eq!(format_byte_down(1_500_000.0, 3, 1), ("1.4".to_string(), "MiB"));
/// ```
pub fn format_byte_down(value: f64, limes: u32, comma: u32) -> (String, &'static str) {
    let digits = 10f64.powi(comma as i32);
    let threshold = 10f64.powi(limes as i32);

    for power in (1..BYTE_UNITS.len()).rev() {
        let unit_size = threshold * 10f64.powi(3 * (power as i32 - 1));
        if value >= unit_size {
            let scaled = (value / (1024f64.powi(power as i32) / digits)).round() / digits;
            return (format_number(scaled, comma as usize), BYTE_UNITS[power]);
        }
    }

    (format_number(value, 0), BYTE_UNITS[0])
}

/// [`format_byte_down`] joined with a space, e.g. `300 B`.
pub fn format_bytes(value: f64, limes: u32, comma: u32) -> String {
    let (number, unit) = format_byte_down(value, limes, comma);
    format!("{number} {unit}")
}

/// Formats with `decimals` fractional digits and `,` thousands grouping.
pub fn format_number(value: f64, decimals: usize) -> String {
    let fixed = format!("{:.*}", decimals, value.abs());
    let (integer, fraction) = match fixed.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (fixed.as_str(), None),
    };

    let mut grouped = String::with_capacity(integer.len() + integer.len() / 3);
    for (i, digit) in integer.chars().enumerate() {
        if i > 0 && (integer.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let negative = value < 0.0 && fixed.chars().any(|c| c.is_ascii_digit() && c != '0');
    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.push_str(&grouped);
    if let Some(fraction) = fraction {
        out.push('.');
        out.push_str(fraction);
    }
    out
}

/// `X days, Y hours, Z minutes and W seconds`
pub fn timespan_format(seconds: u64) -> String {
    let days = seconds / 86_400;
    let hours = seconds % 86_400 / 3_600;
    let minutes = seconds % 3_600 / 60;
    let seconds = seconds % 60;
    format!("{days} days, {hours} hours, {minutes} minutes and {seconds} seconds")
}
