//! Exact, unit-tagged resource quantities
//!
//! CPU is stored in milli-cores and memory in bytes, both as `i64`. The unit
//! is a type parameter, so a CPU quantity can never be added to a memory
//! quantity. Parsing follows the Kubernetes quantity grammar and rounds any
//! sub-unit remainder away from zero, as the API server's `MilliValue()` and
//! `Value()` do.

use k8s_openapi::apimachinery::pkg::api::resource::Quantity as K8sQuantity;
use serde::{Serialize, Serializer};
use std::fmt;
use std::iter::Sum;
use std::marker::PhantomData;
use std::ops::{Add, AddAssign};

/// Marker describing how a quantity is stored
pub trait Unit: Copy + Default + fmt::Debug + PartialEq + Eq + Send + Sync + 'static {
    /// Resource name as it appears in Kubernetes resource maps
    const RESOURCE: &'static str;
    /// Power of ten between the base unit and the stored unit
    const DECIMAL_SCALE: u32;
}

/// CPU, stored in milli-cores
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cpu;

/// Memory, stored in bytes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Memory;

impl Unit for Cpu {
    const RESOURCE: &'static str = "cpu";
    const DECIMAL_SCALE: u32 = 3;
}

impl Unit for Memory {
    const RESOURCE: &'static str = "memory";
    const DECIMAL_SCALE: u32 = 0;
}

pub type CpuQuantity = Quantity<Cpu>;
pub type MemoryQuantity = Quantity<Memory>;

/// An exact resource amount in the stored unit of `U`
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct Quantity<U> {
    value: i64,
    unit: PhantomData<U>,
}

impl<U: Unit> Quantity<U> {
    pub const fn new(value: i64) -> Self {
        Self {
            value,
            unit: PhantomData,
        }
    }

    pub const fn zero() -> Self {
        Self::new(0)
    }

    /// Stored value (milli-cores for CPU, bytes for memory)
    pub const fn value(&self) -> i64 {
        self.value
    }

    pub const fn is_zero(&self) -> bool {
        self.value == 0
    }

    /// Parse a Kubernetes quantity string
    pub fn parse(s: &str) -> Result<Self, ParseQuantityError> {
        parse_scaled(s, U::DECIMAL_SCALE).map(Self::new)
    }

    pub fn from_k8s(quantity: &K8sQuantity) -> Result<Self, ParseQuantityError> {
        Self::parse(&quantity.0)
    }

    /// Divide by `divisor` for display, rounding up. The stored value is untouched.
    pub fn scaled_ceil(&self, divisor: i64) -> i64 {
        if divisor <= 1 {
            return self.value;
        }
        let quotient = self.value / divisor;
        if self.value % divisor > 0 {
            quotient + 1
        } else {
            quotient
        }
    }
}

impl Quantity<Cpu> {
    pub const fn millicores(&self) -> i64 {
        self.value
    }
}

impl Quantity<Memory> {
    pub const fn bytes(&self) -> i64 {
        self.value
    }

    /// Whole mebibytes, rounded up
    pub fn mebibytes(&self) -> i64 {
        self.scaled_ceil(1 << 20)
    }
}

impl<U: Unit> Add for Quantity<U> {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.value.saturating_add(rhs.value))
    }
}

impl<U: Unit> AddAssign for Quantity<U> {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl<U: Unit> Sum for Quantity<U> {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::zero(), Add::add)
    }
}

impl<U: Unit> fmt::Debug for Quantity<U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Quantity<{}>({})", U::RESOURCE, self)
    }
}

impl<U: Unit> fmt::Display for Quantity<U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if U::DECIMAL_SCALE == 3 {
            return write!(f, "{}m", self.value);
        }
        const BINARY: [(&str, u32); 4] = [("Ti", 40), ("Gi", 30), ("Mi", 20), ("Ki", 10)];
        for (suffix, shift) in BINARY {
            let unit = 1i64 << shift;
            if self.value != 0 && self.value % unit == 0 {
                return write!(f, "{}{}", self.value / unit, suffix);
            }
        }
        write!(f, "{}", self.value)
    }
}

impl<U: Unit> Serialize for Quantity<U> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseQuantityError {
    #[error("empty quantity")]
    Empty,
    #[error("quantity {0:?} has no numeric part")]
    MissingNumber(String),
    #[error("quantity {0:?} has an unknown suffix")]
    UnknownSuffix(String),
    #[error("quantity {0:?} is out of range")]
    Overflow(String),
}

enum Multiplier {
    Decimal(i32),
    Binary(u32),
}

fn parse_suffix(suffix: &str) -> Option<Multiplier> {
    let multiplier = match suffix {
        "" => Multiplier::Decimal(0),
        "n" => Multiplier::Decimal(-9),
        "u" => Multiplier::Decimal(-6),
        "m" => Multiplier::Decimal(-3),
        "k" => Multiplier::Decimal(3),
        "M" => Multiplier::Decimal(6),
        "G" => Multiplier::Decimal(9),
        "T" => Multiplier::Decimal(12),
        "P" => Multiplier::Decimal(15),
        "E" => Multiplier::Decimal(18),
        "Ki" => Multiplier::Binary(10),
        "Mi" => Multiplier::Binary(20),
        "Gi" => Multiplier::Binary(30),
        "Ti" => Multiplier::Binary(40),
        "Pi" => Multiplier::Binary(50),
        "Ei" => Multiplier::Binary(60),
        _ => {
            let exponent = suffix.strip_prefix(['e', 'E'])?;
            Multiplier::Decimal(exponent.parse().ok()?)
        }
    };
    Some(multiplier)
}

/// Parse `input` and express it in units of 10^-`scale`, rounding away from zero.
fn parse_scaled(input: &str, scale: u32) -> Result<i64, ParseQuantityError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ParseQuantityError::Empty);
    }

    let (negative, unsigned) = match trimmed.as_bytes()[0] {
        b'-' => (true, &trimmed[1..]),
        b'+' => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let number_len = unsigned
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(unsigned.len());
    let (number, suffix) = unsigned.split_at(number_len);

    let (whole, fraction) = number.split_once('.').unwrap_or((number, ""));
    if whole.is_empty() && fraction.is_empty() || fraction.contains('.') {
        return Err(ParseQuantityError::MissingNumber(input.to_string()));
    }

    let overflow = || ParseQuantityError::Overflow(input.to_string());

    let digits = format!("{whole}{fraction}");
    let digits = digits.trim_start_matches('0');
    if digits.len() > 30 {
        return Err(overflow());
    }
    let mantissa: i128 = if digits.is_empty() {
        0
    } else {
        digits.parse().map_err(|_| overflow())?
    };

    let multiplier = parse_suffix(suffix)
        .ok_or_else(|| ParseQuantityError::UnknownSuffix(input.to_string()))?;

    let fraction_len = fraction.len() as i64;
    let magnitude = match multiplier {
        Multiplier::Decimal(exponent) => {
            let shift = exponent as i64 + scale as i64 - fraction_len;
            if shift >= 0 {
                let factor = pow10(shift).ok_or_else(overflow)?;
                mantissa.checked_mul(factor).ok_or_else(overflow)?
            } else {
                ceil_div_pow10(mantissa, -shift)
            }
        }
        Multiplier::Binary(bits) => {
            let numerator = mantissa
                .checked_mul(1i128 << bits)
                .and_then(|n| n.checked_mul(pow10(scale as i64)?))
                .ok_or_else(overflow)?;
            ceil_div_pow10(numerator, fraction_len)
        }
    };

    let value = i64::try_from(magnitude).map_err(|_| overflow())?;
    Ok(if negative { -value } else { value })
}

fn pow10(exponent: i64) -> Option<i128> {
    u32::try_from(exponent)
        .ok()
        .and_then(|e| 10i128.checked_pow(e))
}

/// `numerator / 10^exponent` rounded up, for exponents past the `i128` range too.
/// Chained ceiling divisions equal one ceiling division by the product.
fn ceil_div_pow10(numerator: i128, exponent: i64) -> i128 {
    const MAX_STEP: i64 = 38;
    let mut value = numerator;
    let mut remaining = exponent;
    while remaining > 0 && value > 1 {
        let step = remaining.min(MAX_STEP);
        value = ceil_div(value, 10i128.pow(step as u32));
        remaining -= step;
    }
    value
}

fn ceil_div(numerator: i128, divisor: i128) -> i128 {
    let quotient = numerator / divisor;
    if numerator % divisor > 0 {
        quotient + 1
    } else {
        quotient
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cpu(s: &str) -> i64 {
        CpuQuantity::parse(s).unwrap().millicores()
    }

    fn mem(s: &str) -> i64 {
        MemoryQuantity::parse(s).unwrap().bytes()
    }

    #[test]
    fn test_parse_cpu() {
        assert_eq!(cpu("500m"), 500);
        assert_eq!(cpu("2"), 2000);
        assert_eq!(cpu("0.5"), 500);
        assert_eq!(cpu(".25"), 250);
        assert_eq!(cpu("1.5"), 1500);
        assert_eq!(cpu("250000u"), 250);
        assert_eq!(cpu("0"), 0);
    }

    #[test]
    fn test_parse_cpu_rounds_up() {
        assert_eq!(cpu("100n"), 1);
        assert_eq!(cpu("1500u"), 2);
        assert_eq!(cpu("0.0001"), 1);
    }

    #[test]
    fn test_parse_memory() {
        assert_eq!(mem("512Mi"), 536_870_912);
        assert_eq!(mem("1.5Gi"), 1_610_612_736);
        assert_eq!(mem("1G"), 1_000_000_000);
        assert_eq!(mem("128974848"), 128_974_848);
        assert_eq!(mem("129e6"), 129_000_000);
        assert_eq!(mem("1e3"), 1000);
        assert_eq!(mem("123Ki"), 125_952);
    }

    #[test]
    fn test_parse_memory_fractional_bytes_round_up() {
        assert_eq!(mem("100m"), 1);
        assert_eq!(mem("1500m"), 2);
    }

    #[test]
    fn test_parse_signed() {
        assert_eq!(cpu("-1"), -1000);
        assert_eq!(cpu("+250m"), 250);
        assert_eq!(cpu("-100n"), -1);
        assert_eq!(cpu("-0.0015"), -2);
        assert_eq!(mem("-1500m"), -2);
    }

    #[test]
    fn test_parse_tiny_fraction_rounds_up() {
        let zeros = "0".repeat(44);
        assert_eq!(mem(&format!("0.{zeros}1Mi")), 1);
        assert_eq!(mem(&format!("0.{zeros}1")), 1);
        assert_eq!(cpu(&format!("0.{zeros}1")), 1);
        assert_eq!(cpu(&format!("0.{zeros}0")), 0);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(CpuQuantity::parse(""), Err(ParseQuantityError::Empty));
        assert!(matches!(
            CpuQuantity::parse("12Q"),
            Err(ParseQuantityError::UnknownSuffix(_))
        ));
        assert!(matches!(
            CpuQuantity::parse("Mi"),
            Err(ParseQuantityError::MissingNumber(_))
        ));
        assert!(matches!(
            CpuQuantity::parse("1.2.3"),
            Err(ParseQuantityError::MissingNumber(_))
        ));
        assert!(matches!(
            MemoryQuantity::parse("16Ei"),
            Err(ParseQuantityError::Overflow(_))
        ));
    }

    #[test]
    fn test_add_is_exact() {
        let total: CpuQuantity = ["100m", "0.1", "100000u"]
            .iter()
            .map(|s| CpuQuantity::parse(s).unwrap())
            .sum();
        assert_eq!(total.millicores(), 300);
    }

    #[test]
    fn test_add_saturates() {
        let big = MemoryQuantity::new(i64::MAX);
        assert_eq!((big + MemoryQuantity::new(1)).bytes(), i64::MAX);
    }

    #[test]
    fn test_display_scaling_does_not_mutate() {
        let memory = MemoryQuantity::parse("1536Ki").unwrap();
        assert_eq!(memory.mebibytes(), 2);
        assert_eq!(memory.bytes(), 1_572_864);
    }

    #[test]
    fn test_display() {
        assert_eq!(CpuQuantity::new(250).to_string(), "250m");
        assert_eq!(MemoryQuantity::parse("512Mi").unwrap().to_string(), "512Mi");
        assert_eq!(MemoryQuantity::new(1000).to_string(), "1000");
        assert_eq!(MemoryQuantity::zero().to_string(), "0");
    }
}
