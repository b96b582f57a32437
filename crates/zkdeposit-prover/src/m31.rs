//! M31 (Mersenne-31) field implementation
//!
//! The Mersenne-31 prime: p = 2^31 - 1 = 2147483647
//!
//! Every leaf, root and trace cell in zkdeposit is an element of this field.
//! All operations fit in 64-bit intermediates with a two-step reduction.

use bytemuck::{Pod, Zeroable};
use core::fmt::{self, Display};
use core::ops::{Add, AddAssign, Mul, MulAssign, Neg, Sub, SubAssign};
use num_traits::{One, Zero};
use rand::distributions::{Distribution, Standard};
use rand::Rng;

/// The Mersenne-31 prime: 2^31 - 1
pub const M31_PRIME: u32 = (1 << 31) - 1;

/// Number of bits in the modulus
pub const MODULUS_BITS: u32 = 31;

/// An element of the M31 field
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Pod, Zeroable)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
#[repr(transparent)]
pub struct M31(pub u32);

impl M31 {
    /// Zero element
    pub const ZERO: Self = Self(0);

    /// One element (multiplicative identity)
    pub const ONE: Self = Self(1);

    /// Create a new M31 element from any u32, reducing modulo p
    #[inline]
    pub const fn new(value: u32) -> Self {
        Self::reduce(value as u64)
    }

    /// Accept only canonical representatives (`value < p`).
    ///
    /// Used when decoding untrusted bytes, where a non-canonical value means
    /// the encoding was tampered with.
    #[inline]
    pub const fn try_from_canonical(value: u32) -> Option<Self> {
        if value < M31_PRIME {
            Some(Self(value))
        } else {
            None
        }
    }

    /// Fast modular reduction: x mod (2^31 - 1) = (x & p) + (x >> 31),
    /// followed by one conditional subtraction.
    #[inline]
    pub const fn reduce(x: u64) -> Self {
        let low = x & M31_PRIME as u64;
        let high = x >> 31;
        let sum = low + high;
        let low = (sum & M31_PRIME as u64) as u32;
        let high = (sum >> 31) as u32;
        Self::partial_reduce(low + high)
    }

    /// Partial reduction when value is in [0, 2P)
    #[inline]
    pub const fn partial_reduce(val: u32) -> Self {
        Self(if val >= M31_PRIME { val - M31_PRIME } else { val })
    }

    /// Addition in M31
    #[inline]
    pub const fn add(self, other: Self) -> Self {
        Self::partial_reduce(self.0 + other.0)
    }

    /// Subtraction in M31
    #[inline]
    pub const fn sub(self, other: Self) -> Self {
        Self::partial_reduce(self.0 + M31_PRIME - other.0)
    }

    /// Multiplication in M31
    #[inline]
    pub const fn mul(self, other: Self) -> Self {
        Self::reduce((self.0 as u64) * (other.0 as u64))
    }

    #[inline]
    pub const fn square(self) -> Self {
        self.mul(self)
    }

    #[inline]
    pub const fn double(self) -> Self {
        self.add(self)
    }

    /// Compute self^exp using square-and-multiply
    pub fn pow(self, mut exp: u32) -> Self {
        let mut base = self;
        let mut result = Self::ONE;

        while exp > 0 {
            if exp & 1 == 1 {
                result = result.mul(base);
            }
            base = base.square();
            exp >>= 1;
        }

        result
    }

    /// Multiplicative inverse via Fermat: a^(p-2).
    ///
    /// Returns `None` for zero.
    pub fn inv(self) -> Option<Self> {
        if self.is_zero() {
            None
        } else {
            Some(self.pow(M31_PRIME - 2))
        }
    }

    /// Negation in M31
    #[inline]
    pub const fn neg(self) -> Self {
        if self.0 == 0 {
            self
        } else {
            Self(M31_PRIME - self.0)
        }
    }

    #[inline]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Get the canonical representative
    #[inline]
    pub const fn value(self) -> u32 {
        self.0
    }

    /// Convert to bytes (little-endian)
    #[inline]
    pub const fn to_le_bytes(self) -> [u8; 4] {
        self.0.to_le_bytes()
    }

    /// Convert from bytes (little-endian), reducing modulo p
    #[inline]
    pub const fn from_le_bytes(bytes: [u8; 4]) -> Self {
        Self::new(u32::from_le_bytes(bytes))
    }
}

impl Display for M31 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for M31 {
    #[inline]
    fn from(value: u32) -> Self {
        Self::new(value)
    }
}

impl From<bool> for M31 {
    #[inline]
    fn from(value: bool) -> Self {
        if value {
            Self::ONE
        } else {
            Self::ZERO
        }
    }
}

impl From<M31> for u32 {
    #[inline]
    fn from(value: M31) -> Self {
        value.0
    }
}

impl Add for M31 {
    type Output = Self;
    #[inline]
    fn add(self, other: Self) -> Self {
        M31::add(self, other)
    }
}

impl Sub for M31 {
    type Output = Self;
    #[inline]
    fn sub(self, other: Self) -> Self {
        M31::sub(self, other)
    }
}

impl Mul for M31 {
    type Output = Self;
    #[inline]
    fn mul(self, rhs: Self) -> Self {
        M31::mul(self, rhs)
    }
}

impl Neg for M31 {
    type Output = Self;
    #[inline]
    fn neg(self) -> Self {
        M31::neg(self)
    }
}

impl AddAssign for M31 {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        *self = *self + other;
    }
}

impl SubAssign for M31 {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        *self = *self - other;
    }
}

impl MulAssign for M31 {
    #[inline]
    fn mul_assign(&mut self, other: Self) {
        *self = *self * other;
    }
}

impl core::iter::Sum for M31 {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(M31::ZERO, |a, b| a + b)
    }
}

impl core::iter::Product for M31 {
    fn product<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(M31::ONE, |a, b| a * b)
    }
}

impl Zero for M31 {
    #[inline]
    fn zero() -> Self {
        M31::ZERO
    }

    #[inline]
    fn is_zero(&self) -> bool {
        M31::is_zero(*self)
    }
}

impl One for M31 {
    #[inline]
    fn one() -> Self {
        M31::ONE
    }
}

/// Uniform sampling over `[0, p)`.
impl Distribution<M31> for Standard {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> M31 {
        M31(rng.gen_range(0..M31_PRIME))
    }
}
