//! Exact decimal numbers.
//!
//! Neon numbers behave like IEEE 754 decimal128: 34 significant digits, no
//! binary rounding surprises. `Number` wraps a `BigDecimal` and rounds every
//! arithmetic result back to that precision.

use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Mul, Neg, Sub};
use std::str::FromStr;

use bigdecimal::BigDecimal;
use num_bigint::Sign;
use num_traits::{One, ToPrimitive, Zero};
use serde::{Deserialize, Serialize};

use crate::error::CellError;

/// Significant digits kept after each operation.
pub const PRECISION: u64 = 34;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Number(BigDecimal);

impl Number {
    fn rounded(value: BigDecimal) -> Number {
        if value.digits() > PRECISION {
            Number(value.with_prec(PRECISION))
        } else {
            Number(value)
        }
    }

    pub fn zero() -> Number {
        Number(BigDecimal::zero())
    }

    /// Parse a decimal literal such as `-12.5` or `1e3`.
    pub fn parse(text: &str) -> Result<Number, CellError> {
        if text.is_empty() || text.trim() != text {
            return Err(CellError::InvalidNumber(text.to_string()));
        }
        BigDecimal::from_str(text)
            .map(Number::rounded)
            .map_err(|_| CellError::InvalidNumber(text.to_string()))
    }

    /// Convert from a binary float using its shortest round-trip spelling.
    pub fn from_f64(value: f64) -> Option<Number> {
        if !value.is_finite() {
            return None;
        }
        BigDecimal::from_str(&value.to_string())
            .ok()
            .map(Number::rounded)
    }

    pub fn to_f64(&self) -> Option<f64> {
        self.0.to_f64()
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.0 < BigDecimal::zero()
    }

    pub fn is_integer(&self) -> bool {
        self.0.with_scale(0) == self.0
    }

    /// The value as an `i64`, only when it is integral and in range.
    pub fn to_i64(&self) -> Result<i64, CellError> {
        if !self.is_integer() {
            return Err(CellError::NotAnInteger(self.to_string()));
        }
        self.0
            .to_i64()
            .ok_or_else(|| CellError::OutOfRange(self.to_string()))
    }

    /// The value as a non-negative index.
    pub fn to_usize(&self) -> Result<usize, CellError> {
        let value = self.to_i64()?;
        usize::try_from(value).map_err(|_| CellError::OutOfRange(self.to_string()))
    }

    pub fn abs(&self) -> Number {
        Number(self.0.abs())
    }

    /// -1, 0 or 1.
    pub fn sign(&self) -> Number {
        match self.0.cmp(&BigDecimal::zero()) {
            Ordering::Less => Number::from(-1),
            Ordering::Equal => Number::zero(),
            Ordering::Greater => Number::from(1),
        }
    }

    pub fn trunc(&self) -> Number {
        Number(self.0.with_scale(0))
    }

    pub fn floor(&self) -> Number {
        let truncated = self.trunc();
        if self.is_negative() && truncated != *self {
            Number(truncated.0 - BigDecimal::one())
        } else {
            truncated
        }
    }

    pub fn ceil(&self) -> Number {
        -&(-self).floor()
    }

    /// `None` when `divisor` is zero.
    pub fn checked_div(&self, divisor: &Number) -> Option<Number> {
        if divisor.is_zero() {
            return None;
        }
        Some(Number::rounded(&self.0 / &divisor.0))
    }

    /// Quotient truncated toward zero. The remainder is taken out exactly
    /// first, so the truncation happens before any rounding.
    pub fn checked_div_trunc(&self, divisor: &Number) -> Option<Number> {
        if divisor.is_zero() {
            return None;
        }
        let r = &self.0 % &divisor.0;
        let q = (&self.0 - &r) / &divisor.0;
        Some(Number::rounded(q.with_scale(0)))
    }

    /// Modulo whose result takes the sign of the divisor.
    pub fn checked_rem(&self, divisor: &Number) -> Option<Number> {
        if divisor.is_zero() {
            return None;
        }
        let mut r = &self.0 % &divisor.0;
        if !r.is_zero() && (r < BigDecimal::zero()) != divisor.is_negative() {
            r += &divisor.0;
        }
        Some(Number::rounded(r))
    }

    /// Integral exponents are computed exactly by squaring; anything else goes
    /// through `f64`. `None` when the result is undefined or not finite.
    pub fn checked_pow(&self, exponent: &Number) -> Option<Number> {
        match exponent.to_i64() {
            Ok(e) => {
                let mut result = BigDecimal::one();
                let mut base = self.0.clone();
                let mut n = e.unsigned_abs();
                while n > 0 {
                    if n & 1 == 1 {
                        result = Number::rounded(&result * &base).0;
                    }
                    n >>= 1;
                    if n > 0 {
                        base = Number::rounded(&base * &base).0;
                    }
                }
                if e < 0 {
                    Number::from(1).checked_div(&Number(result))
                } else {
                    Some(Number(result))
                }
            }
            Err(_) => {
                let x = self.to_f64()?;
                let y = exponent.to_f64()?;
                Number::from_f64(x.powf(y))
            }
        }
    }
}

impl From<i64> for Number {
    fn from(value: i64) -> Self {
        Number(BigDecimal::from(value))
    }
}

impl From<i32> for Number {
    fn from(value: i32) -> Self {
        Number(BigDecimal::from(value))
    }
}

impl From<usize> for Number {
    fn from(value: usize) -> Self {
        Number(BigDecimal::from(value as u64))
    }
}

impl FromStr for Number {
    type Err = CellError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Number::parse(s)
    }
}

impl Add for &Number {
    type Output = Number;

    fn add(self, rhs: &Number) -> Number {
        Number::rounded(&self.0 + &rhs.0)
    }
}

impl Sub for &Number {
    type Output = Number;

    fn sub(self, rhs: &Number) -> Number {
        Number::rounded(&self.0 - &rhs.0)
    }
}

impl Mul for &Number {
    type Output = Number;

    fn mul(self, rhs: &Number) -> Number {
        Number::rounded(&self.0 * &rhs.0)
    }
}

impl Neg for &Number {
    type Output = Number;

    fn neg(self) -> Number {
        Number(-self.0.clone())
    }
}

impl fmt::Display for Number {
    /// Plain decimal notation with no exponent and no trailing zeros.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (int, scale) = self.0.normalized().as_bigint_and_exponent();
        let digits = int.magnitude().to_string();
        if int.sign() == Sign::Minus {
            f.write_str("-")?;
        }
        if scale <= 0 {
            f.write_str(&digits)?;
            for _ in 0..(-scale) {
                f.write_str("0")?;
            }
            return Ok(());
        }
        let scale = scale as usize;
        if digits.len() > scale {
            let (whole, frac) = digits.split_at(digits.len() - scale);
            write!(f, "{}.{}", whole, frac)
        } else {
            write!(f, "0.{}{}", "0".repeat(scale - digits.len()), digits)
        }
    }
}
