use log::info;
use std::io;
use std::path::Path;

/// Removes `path` if present and creates it empty.
pub fn recreate_dir(path: &Path) -> io::Result<()> {
    match std::fs::metadata(path) {
        Ok(metadata) if metadata.is_dir() => {
            info!("Clearing working directory {}", path.display());
            std::fs::remove_dir_all(path)?;
        }
        Ok(_) => {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{} exists but is not a directory", path.display()),
            ));
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }
    std::fs::create_dir_all(path)
}

/// Rounds to `decimals` places through a correctly rounded decimal rendering.
pub fn round_decimals(value: f64, decimals: usize) -> f64 {
    format!("{:.*}", decimals, value).parse().unwrap_or(value)
}

/// Shortest round-trip text of a float with the conventions of the tool that wrote
/// the historical WTH files: always a decimal point, exponent form outside
/// `[1e-4, 1e16)` with a sign and at least two exponent digits.
pub fn float_repr(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if value == 0.0 {
        return if value.is_sign_negative() { "-0.0" } else { "0.0" }.to_string();
    }
    if (1e-4..1e16).contains(&value.abs()) {
        let text = value.to_string();
        if text.contains('.') {
            text
        } else {
            format!("{}.0", text)
        }
    } else {
        let text = format!("{:e}", value);
        match text.split_once('e') {
            Some((mantissa, exponent)) => {
                let exponent: i32 = exponent.parse().unwrap_or(0);
                let sign = if exponent < 0 { '-' } else { '+' };
                format!("{}e{}{:02}", mantissa, sign, exponent.abs())
            }
            None => text,
        }
    }
}
