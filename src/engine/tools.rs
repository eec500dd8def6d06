//! Size parsing and formatting helpers

use anyhow::{Result, bail};

/// Parse a byte size such as `4096`, `64K`, `1M`, `2G` (binary units, case-insensitive,
/// optional trailing `B` / `iB`).
pub fn parse_size(s: &str) -> Result<usize> {
    let t = s.trim();
    if t.is_empty() {
        bail!("empty size");
    }
    let upper = t.to_ascii_uppercase();
    let stripped = upper
        .strip_suffix("IB")
        .or_else(|| upper.strip_suffix('B'))
        .unwrap_or(&upper);
    let (digits, mult) = match stripped.chars().last() {
        Some('K') => (&stripped[..stripped.len() - 1], 1024usize),
        Some('M') => (&stripped[..stripped.len() - 1], 1024 * 1024),
        Some('G') => (&stripped[..stripped.len() - 1], 1024 * 1024 * 1024),
        _ => (stripped, 1),
    };
    let n: usize = match digits.trim().parse() {
        Ok(n) => n,
        Err(_) => bail!("invalid size: {:?}", s),
    };
    match n.checked_mul(mult) {
        Some(v) => Ok(v),
        None => bail!("size too large: {:?}", s),
    }
}

/// Human-readable byte count (binary units, one decimal).
pub fn format_bytes(n: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut value = n as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", n, UNITS[0])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}
