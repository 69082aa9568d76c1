//! Exact decimal amounts.
//!
//! An [`Amount`] keeps the text it was parsed from, so a value read from the
//! vault is written back byte-for-byte. Arithmetic runs on an integer
//! mantissa and a decimal scale, never on floating point.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use std::str::FromStr;

/// Bounds on significant and fractional digits, keeping rescaled sums well
/// inside `i128`.
const MAX_DIGITS: usize = 24;
const MAX_SCALE: usize = 9;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmountParseError(String);

impl fmt::Display for AmountParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid decimal amount '{}'", self.0)
    }
}

impl std::error::Error for AmountParseError {}

/// A decimal amount such as `"1000.00"` or `"-12.5"`.
#[derive(Debug, Clone)]
pub struct Amount {
    text: String,
    mantissa: i128,
    scale: u32,
}

impl Amount {
    pub fn zero() -> Self {
        Self::from_parts(0, 0)
    }

    /// Parses a plain decimal: optional sign, digits, optional fraction.
    pub fn parse(s: &str) -> Result<Self, AmountParseError> {
        let invalid = || AmountParseError(s.to_string());

        let (negative, unsigned) = match s.as_bytes().first() {
            Some(b'-') => (true, &s[1..]),
            Some(b'+') => (false, &s[1..]),
            _ => (false, s),
        };

        let (int_part, frac_part) = match unsigned.split_once('.') {
            Some((i, f)) => (i, f),
            None => (unsigned, ""),
        };

        let all_digits = |p: &str| p.bytes().all(|b| b.is_ascii_digit());
        if int_part.is_empty()
            || !all_digits(int_part)
            || !all_digits(frac_part)
            || (unsigned.contains('.') && frac_part.is_empty())
        {
            return Err(invalid());
        }

        let significant = int_part.trim_start_matches('0').len() + frac_part.len();
        if significant > MAX_DIGITS || frac_part.len() > MAX_SCALE {
            return Err(invalid());
        }

        let mut mantissa: i128 = 0;
        for b in int_part.bytes().chain(frac_part.bytes()) {
            mantissa = mantissa * 10 + i128::from(b - b'0');
        }
        if negative {
            mantissa = -mantissa;
        }

        Ok(Self {
            text: s.to_string(),
            mantissa,
            scale: frac_part.len() as u32,
        })
    }

    fn from_parts(mantissa: i128, scale: u32) -> Self {
        Self {
            text: render(mantissa, scale),
            mantissa,
            scale,
        }
    }

    /// The text this amount is stored as.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Number of digits after the decimal point.
    pub fn scale(&self) -> u32 {
        self.scale
    }

    pub fn is_zero(&self) -> bool {
        self.mantissa == 0
    }

    pub fn is_positive(&self) -> bool {
        self.mantissa > 0
    }

    pub fn is_negative(&self) -> bool {
        self.mantissa < 0
    }

    fn rescaled(&self, scale: u32) -> i128 {
        self.mantissa * 10i128.pow(scale - self.scale)
    }
}

fn render(mantissa: i128, scale: u32) -> String {
    let digits = mantissa.unsigned_abs().to_string();
    let sign = if mantissa < 0 { "-" } else { "" };
    let scale = scale as usize;

    if scale == 0 {
        return format!("{sign}{digits}");
    }

    let padded = format!("{digits:0>width$}", width = scale + 1);
    let (int_part, frac_part) = padded.split_at(padded.len() - scale);
    format!("{sign}{int_part}.{frac_part}")
}

impl Default for Amount {
    fn default() -> Self {
        Self::zero()
    }
}

impl FromStr for Amount {
    type Err = AmountParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Textual equality: `"1.0"` and `"1.00"` are different stored values.
impl PartialEq for Amount {
    fn eq(&self, other: &Self) -> bool {
        self.text == other.text
    }
}

impl Eq for Amount {}

impl Add for Amount {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        let scale = self.scale.max(other.scale);
        Self::from_parts(self.rescaled(scale) + other.rescaled(scale), scale)
    }
}

impl AddAssign for Amount {
    fn add_assign(&mut self, other: Self) {
        *self = self.clone() + other;
    }
}

impl Sub for Amount {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        self + (-other)
    }
}

impl SubAssign for Amount {
    fn sub_assign(&mut self, other: Self) {
        *self = self.clone() - other;
    }
}

impl Neg for Amount {
    type Output = Self;

    fn neg(self) -> Self {
        Self::from_parts(-self.mantissa, self.scale)
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.text)
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Amount::parse(&text).map_err(serde::de::Error::custom)
    }
}
