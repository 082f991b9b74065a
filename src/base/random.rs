//! Identifier helpers: millisecond timestamps, radix formatting and
//! BoringSSL-backed randomness.
//!
//! None of the identifiers built here are RFC 4122 UUIDs. They only need
//! enough entropy not to collide between visitors.

use time::OffsetDateTime;

const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> u64 {
    let nanos = OffsetDateTime::now_utc().unix_timestamp_nanos();
    (nanos / 1_000_000).max(0) as u64
}

/// Format `value` in `radix` (2..=36) with lowercase digits.
pub fn to_radix(mut value: u64, radix: u32) -> String {
    debug_assert!((2..=36).contains(&radix));
    let radix = radix as u64;

    if value == 0 {
        return "0".to_string();
    }

    let mut out = Vec::new();
    while value > 0 {
        out.push(DIGITS[(value % radix) as usize]);
        value /= radix;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

/// Uniform float in `[0, 1)`.
pub fn random_unit() -> f64 {
    let mut buf = [0u8; 8];
    if let Err(e) = boring::rand::rand_bytes(&mut buf) {
        // BoringSSL's RNG does not fail in practice; keep going with clock jitter.
        tracing::warn!(error = %e, "rand_bytes failed, using clock entropy");
        let nanos = OffsetDateTime::now_utc().unix_timestamp_nanos() as u64;
        buf = nanos.rotate_left(17).wrapping_mul(0x9E37_79B9_7F4A_7C15).to_le_bytes();
    }
    (u64::from_le_bytes(buf) >> 11) as f64 / (1u64 << 53) as f64
}

/// Random string of exactly `len` digits in `radix` whose leading digit is 1
/// (or the string is `2` followed by zeros).
///
/// Scales a random number into `[radix^(len-1), 2 * radix^(len-1)]` so the
/// width never varies.
pub fn random_digits(len: u32, radix: u32) -> String {
    let pow = (radix as u64).pow(len.saturating_sub(1));
    let value = ((1.0 + random_unit()) * pow as f64).round() as u64;
    to_radix(value, radix)
}

/// Visitor identifier: `[unix-millis]-[6 radix 24]-[6 radix 24]-[4 radix 24]`.
pub fn generate_visitor_id() -> String {
    format!(
        "{}-{}-{}-{}",
        now_millis(),
        random_digits(6, 24),
        random_digits(6, 24),
        random_digits(4, 24)
    )
}

/// Anonymous analytics client id: last 4 radix-30 digits of the clock
/// followed by 12 random radix-24 digits.
pub fn generate_client_id() -> String {
    let stamp = to_radix(now_millis(), 30);
    let tail = &stamp[stamp.len().saturating_sub(4)..];
    format!("{}{}", tail, random_digits(12, 24))
}
