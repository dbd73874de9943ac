//! Domain Services
//!
//! Pure probe logic: candidate parsing, address classification and the
//! digest helpers of the surface sub-probes.

use std::net::Ipv4Addr;
use std::sync::LazyLock;

use regex::Regex;

use crate::domain::value_objects::AddressScope;

/// Dotted-quad anywhere in a candidate line
static IPV4_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:[0-9]{1,3}\.){3}[0-9]{1,3}").expect("valid IPv4 pattern"));

/// Private, loopback, link-local, "this network", multicast and broadcast ranges
const LOCAL_RANGES: [(Ipv4Addr, u8); 8] = [
    (Ipv4Addr::new(10, 0, 0, 0), 8),
    (Ipv4Addr::new(172, 16, 0, 0), 12),
    (Ipv4Addr::new(192, 168, 0, 0), 16),
    (Ipv4Addr::new(127, 0, 0, 0), 8),
    (Ipv4Addr::new(169, 254, 0, 0), 16),
    (Ipv4Addr::new(0, 0, 0, 0), 8),
    (Ipv4Addr::new(224, 0, 0, 0), 4),
    (Ipv4Addr::new(255, 0, 0, 0), 8),
];

/// Data-URL prefix skipped by the canvas digest (`data:image/png;base64,`)
pub const CANVAS_DIGEST_OFFSET: usize = 22;
pub const CANVAS_DIGEST_LEN: usize = 60;
pub const WEBGL_LABEL_MAX_CHARS: usize = 50;
pub const AUDIO_DIGEST_MAX_CHARS: usize = 20;

/// First valid dotted-quad IPv4 address in a candidate string
///
/// mDNS host candidates (`<uuid>.local`) carry no address and yield `None`.
pub fn extract_ipv4(candidate: &str) -> Option<Ipv4Addr> {
    IPV4_PATTERN
        .find_iter(candidate)
        .find_map(|m| m.as_str().parse().ok())
}

/// Classify an address against the fixed local range table
pub fn address_scope(ip: Ipv4Addr) -> AddressScope {
    let bits = u32::from(ip);
    let is_local = LOCAL_RANGES.iter().any(|(network, prefix)| {
        let mask = u32::MAX << (32 - u32::from(*prefix));
        bits & mask == u32::from(*network)
    });

    if is_local {
        AddressScope::Local
    } else {
        AddressScope::Public
    }
}

/// Canvas digest: characters `[22, 82)` of the data URL, clamped to its length
pub fn canvas_digest(data_url: &str) -> String {
    data_url
        .chars()
        .skip(CANVAS_DIGEST_OFFSET)
        .take(CANVAS_DIGEST_LEN)
        .collect()
}

/// WebGL label: `vendor|renderer`, at most 50 characters
pub fn webgl_label(vendor: &str, renderer: &str) -> String {
    format!("{}|{}", vendor, renderer)
        .chars()
        .take(WEBGL_LABEL_MAX_CHARS)
        .collect()
}

/// Sum of absolute sample magnitudes, accumulated in `f64` in sample order
pub fn audio_magnitude(samples: &[f32]) -> f64 {
    samples.iter().fold(0.0, |acc, s| acc + f64::from(*s).abs())
}

/// Audio digest: base-36 rendering of the magnitude, at most 20 characters
pub fn audio_digest(magnitude: f64) -> String {
    to_radix_string(magnitude, 36)
        .chars()
        .take(AUDIO_DIGEST_MAX_CHARS)
        .collect()
}

/// Render a number in `radix` the way `Number.prototype.toString(radix)` does
///
/// Fraction digits are emitted until they uniquely identify the double,
/// with round-half-even carry propagation into the integer part.
pub fn to_radix_string(value: f64, radix: u32) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    // 2^53: above this every double is an integer multiple of 2
    const EXACT_INTEGER_LIMIT: f64 = 9_007_199_254_740_992.0;

    debug_assert!((2..=36).contains(&radix));

    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }

    let negative = value < 0.0;
    let value = value.abs();
    let radix_f = f64::from(radix);

    let mut integer = value.floor();
    let mut fraction = value - integer;
    // Half the distance to the next representable double
    let next_up = f64::from_bits(value.to_bits() + 1);
    let mut delta = (0.5 * (next_up - value)).max(f64::from_bits(1));

    let mut fraction_digits: Vec<u8> = Vec::new();
    if fraction >= delta {
        loop {
            fraction *= radix_f;
            delta *= radix_f;
            let digit = fraction as u8;
            fraction_digits.push(digit);
            fraction -= f64::from(digit);

            let past_half = fraction > 0.5 || (fraction == 0.5 && digit & 1 == 1);
            if past_half && fraction + delta > 1.0 {
                loop {
                    match fraction_digits.pop() {
                        None => {
                            integer += 1.0;
                            break;
                        }
                        Some(d) if u32::from(d) + 1 < radix => {
                            fraction_digits.push(d + 1);
                            break;
                        }
                        Some(_) => {}
                    }
                }
                break;
            }
            if fraction < delta {
                break;
            }
        }
    }

    let mut integer_digits: Vec<u8> = Vec::new();
    while integer / radix_f >= EXACT_INTEGER_LIMIT {
        integer /= radix_f;
        integer_digits.push(b'0');
    }
    loop {
        let remainder = integer % radix_f;
        integer_digits.push(DIGITS[remainder as usize]);
        integer = (integer - remainder) / radix_f;
        if integer <= 0.0 {
            break;
        }
    }

    let mut out = String::with_capacity(integer_digits.len() + fraction_digits.len() + 2);
    if negative {
        out.push('-');
    }
    out.extend(integer_digits.iter().rev().map(|&d| d as char));
    if !fraction_digits.is_empty() {
        out.push('.');
        out.extend(fraction_digits.iter().map(|&d| DIGITS[d as usize] as char));
    }
    out
}
