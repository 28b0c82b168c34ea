//! Stable scalar identifiers for calc-cache keys.
//!
//! A scalar constant gets a cache key derived from its own bit pattern rather
//! than an externally-supplied name, so that two `CalcVector`s built from the
//! same literal constant collide in the cache instead of each minting a fresh
//! entry. Grounded on `tachy_scalar.h::get_id`: a `"0x"`-prefixed big-endian
//! hex dump of the value's bytes, with trailing zero nibbles trimmed.

/// Anything whose bit pattern can be hex-dumped for a scalar cache key.
pub trait ScalarId {
    /// Returns a stable, trailing-zero-trimmed hex id, e.g. `"0x3ff"`.
    fn scalar_id(&self) -> String;
}

fn hex_id(bytes_be: &[u8]) -> String {
    let mut digits: Vec<u8> = Vec::with_capacity(bytes_be.len() * 2);
    for byte in bytes_be {
        digits.push(byte >> 4);
        digits.push(byte & 0x0f);
    }
    while digits.len() > 1 && *digits.last().unwrap() == 0 {
        digits.pop();
    }
    let mut out = String::with_capacity(2 + digits.len());
    out.push_str("0x");
    for d in digits {
        out.push(std::char::from_digit(d as u32, 16).unwrap());
    }
    out
}

impl ScalarId for f32 {
    fn scalar_id(&self) -> String {
        hex_id(&self.to_be_bytes())
    }
}

impl ScalarId for f64 {
    fn scalar_id(&self) -> String {
        hex_id(&self.to_be_bytes())
    }
}

impl ScalarId for i32 {
    fn scalar_id(&self) -> String {
        hex_id(&self.to_be_bytes())
    }
}

impl ScalarId for i64 {
    fn scalar_id(&self) -> String {
        hex_id(&self.to_be_bytes())
    }
}
