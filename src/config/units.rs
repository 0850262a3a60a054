//! Duration and byte-size strings (`"30 seconds"`, `"512K"`).

use std::time::Duration;

/// Split `"10 ms"` / `"1.5G"` into the numeric part and the trimmed unit.
fn split_unit(text: &str) -> Option<(f64, &str)> {
    let text = text.trim();
    let unit_start = text
        .find(|c: char| c.is_alphabetic())
        .unwrap_or(text.len());
    let (number, unit) = text.split_at(unit_start);
    let number: f64 = number.trim().parse().ok()?;
    if !number.is_finite() || number < 0.0 {
        return None;
    }
    Some((number, unit.trim()))
}

/// Parse a duration. A bare number is taken as milliseconds.
pub fn parse_duration(text: &str) -> Option<Duration> {
    let (number, unit) = split_unit(text)?;
    let nanos_per_unit = match unit {
        "ns" | "nano" | "nanos" | "nanosecond" | "nanoseconds" => 1.0,
        "us" | "micro" | "micros" | "microsecond" | "microseconds" => 1e3,
        "" | "ms" | "milli" | "millis" | "millisecond" | "milliseconds" => 1e6,
        "s" | "second" | "seconds" => 1e9,
        "m" | "minute" | "minutes" => 60e9,
        "h" | "hour" | "hours" => 3_600e9,
        "d" | "day" | "days" => 86_400e9,
        _ => return None,
    };
    let nanos = number * nanos_per_unit;
    if nanos >= u64::MAX as f64 {
        return None;
    }
    Some(Duration::from_nanos(nanos as u64))
}

/// Parse a byte size. Single-letter and `*iB` units are powers of 1024,
/// `kB`/`MB`/... are powers of 1000. A bare number is bytes.
pub fn parse_bytes(text: &str) -> Option<u64> {
    let (number, unit) = split_unit(text)?;
    let factor: f64 = match unit {
        "" | "B" | "b" | "byte" | "bytes" => 1.0,
        "kB" | "KB" | "kilobyte" | "kilobytes" => 1e3,
        "MB" | "megabyte" | "megabytes" => 1e6,
        "GB" | "gigabyte" | "gigabytes" => 1e9,
        "TB" | "terabyte" | "terabytes" => 1e12,
        "K" | "k" | "Ki" | "KiB" | "kibibyte" | "kibibytes" => 1024.0,
        "M" | "m" | "Mi" | "MiB" | "mebibyte" | "mebibytes" => 1024.0 * 1024.0,
        "G" | "g" | "Gi" | "GiB" | "gibibyte" | "gibibytes" => 1024.0 * 1024.0 * 1024.0,
        "T" | "t" | "Ti" | "TiB" | "tebibyte" | "tebibytes" => 1024.0 * 1024.0 * 1024.0 * 1024.0,
        _ => return None,
    };
    let bytes = number * factor;
    if bytes >= u64::MAX as f64 {
        return None;
    }
    Some(bytes as u64)
}
