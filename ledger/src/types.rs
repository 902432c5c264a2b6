//! # Ledger Primitives
//!
//! The two value types every ledger operation is expressed in:
//!
//! - [`Address`]: a 20-byte account identifier. The all-zero value is the
//!   null account, which can never receive tokens, spend them, or be granted
//!   an allowance.
//! - [`Amount`]: a 256-bit unsigned quantity of the token's smallest unit.
//!   All arithmetic is checked; nothing in the ledger ever wraps.
//!
//! Both types travel as strings on the wire (`0x`-prefixed hex for addresses,
//! base-10 for amounts) so that JSON consumers never lose precision.

use primitive_types::U256;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Length of an account identifier in bytes.
pub const ADDRESS_LENGTH: usize = 20;

// ---------------------------------------------------------------------------
// Parse errors
// ---------------------------------------------------------------------------

/// Failure to parse an [`Address`] from text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressParseError {
    #[error("invalid hex in address: {0}")]
    InvalidHex(String),

    #[error("address must be {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}

/// Failure to parse an [`Amount`] from text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountParseError {
    #[error("amount is empty")]
    Empty,

    #[error("amount is not a base-10 unsigned integer: {0}")]
    InvalidDigits(String),

    #[error("amount does not fit in 256 bits")]
    Overflow,
}

// ---------------------------------------------------------------------------
// Address
// ---------------------------------------------------------------------------

/// An opaque 20-byte account identifier.
///
/// Any value is a legal account; there is no registration step. The ledger
/// treats an address it has never seen as holding a zero balance.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address([u8; ADDRESS_LENGTH]);

impl Address {
    /// The null account. Tokens sent here would be unrecoverable, so the
    /// ledger refuses it as a recipient, a spender, or a delegated source.
    pub const NULL: Address = Address([0u8; ADDRESS_LENGTH]);

    /// Wraps raw bytes.
    pub const fn new(bytes: [u8; ADDRESS_LENGTH]) -> Self {
        Self(bytes)
    }

    /// An address with every byte set to `byte`. Handy for fixtures.
    pub const fn repeat_byte(byte: u8) -> Self {
        Self([byte; ADDRESS_LENGTH])
    }

    /// Returns `true` for the null account.
    pub fn is_null(&self) -> bool {
        *self == Self::NULL
    }

    pub fn as_bytes(&self) -> &[u8; ADDRESS_LENGTH] {
        &self.0
    }

    /// `0x`-prefixed lowercase hex.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl From<[u8; ADDRESS_LENGTH]> for Address {
    fn from(bytes: [u8; ADDRESS_LENGTH]) -> Self {
        Self(bytes)
    }
}

impl FromStr for Address {
    type Err = AddressParseError;

    /// Accepts 40 hex digits with or without a `0x`/`0X` prefix.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);

        let bytes = hex::decode(digits).map_err(|e| AddressParseError::InvalidHex(e.to_string()))?;
        let actual = bytes.len();
        let array: [u8; ADDRESS_LENGTH] =
            bytes
                .try_into()
                .map_err(|_| AddressParseError::InvalidLength {
                    expected: ADDRESS_LENGTH,
                    actual,
                })?;
        Ok(Self(array))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Amount
// ---------------------------------------------------------------------------

/// A non-negative token quantity in the smallest indivisible unit.
///
/// Backed by a 256-bit unsigned integer. There are deliberately no
/// `Add`/`Sub` operator impls: every call site has to choose a checked
/// method and handle the `None`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Amount(U256);

impl Amount {
    pub const ZERO: Amount = Amount(U256([0; 4]));

    pub const MAX: Amount = Amount(U256::MAX);

    pub fn from_u256(value: U256) -> Self {
        Self(value)
    }

    pub fn as_u256(&self) -> U256 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn checked_add(self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }

    pub fn checked_sub(self, other: Amount) -> Option<Amount> {
        self.0.checked_sub(other.0).map(Amount)
    }

    pub fn checked_mul(self, other: Amount) -> Option<Amount> {
        self.0.checked_mul(other.0).map(Amount)
    }

    /// `10^exponent`, or `None` if it does not fit in 256 bits.
    pub fn pow10(exponent: u8) -> Option<Amount> {
        let ten = U256::from(10u8);
        let mut value = U256::one();
        for _ in 0..exponent {
            value = value.checked_mul(ten)?;
        }
        Some(Amount(value))
    }

    /// Converts a whole-unit quantity into smallest units: `self * 10^decimals`.
    ///
    /// `Amount::from(1u64).scaled(18)` is one full token at 18 decimals.
    /// Zero scales to zero at any precision.
    pub fn scaled(self, decimals: u8) -> Option<Amount> {
        if self.is_zero() {
            return Some(Amount::ZERO);
        }
        self.checked_mul(Amount::pow10(decimals)?)
    }
}

impl From<u64> for Amount {
    fn from(value: u64) -> Self {
        Self(U256::from(value))
    }
}

impl From<u128> for Amount {
    fn from(value: u128) -> Self {
        Self(U256::from(value))
    }
}

impl From<U256> for Amount {
    fn from(value: U256) -> Self {
        Self(value)
    }
}

impl FromStr for Amount {
    type Err = AmountParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(AmountParseError::Empty);
        }
        if !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(AmountParseError::InvalidDigits(s.to_string()));
        }
        // Only overflow remains once the digits are known to be valid.
        U256::from_dec_str(s)
            .map(Amount)
            .map_err(|_| AmountParseError::Overflow)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl fmt::Debug for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Amount({})", self.0)
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

struct AmountVisitor;

impl<'de> Visitor<'de> for AmountVisitor {
    type Value = Amount;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a base-10 string or a non-negative integer")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Amount, E> {
        v.parse().map_err(E::custom)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Amount, E> {
        Ok(Amount::from(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Amount, E> {
        u64::try_from(v)
            .map(Amount::from)
            .map_err(|_| E::custom(format!("amount must be non-negative, got {}", v)))
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(AmountVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_round_trips_through_text() {
        let addr = Address::repeat_byte(0xab);
        let text = addr.to_string();
        assert_eq!(text, format!("0x{}", "ab".repeat(20)));
        assert_eq!(text.parse::<Address>().unwrap(), addr);
    }

    #[test]
    fn address_parse_accepts_missing_prefix_and_uppercase() {
        let upper = format!("0X{}", "AB".repeat(20));
        let bare = "ab".repeat(20);
        assert_eq!(upper.parse::<Address>().unwrap(), Address::repeat_byte(0xab));
        assert_eq!(bare.parse::<Address>().unwrap(), Address::repeat_byte(0xab));
    }

    #[test]
    fn address_parse_rejects_wrong_length() {
        let err = "0x1234".parse::<Address>().unwrap_err();
        assert_eq!(
            err,
            AddressParseError::InvalidLength {
                expected: 20,
                actual: 2
            }
        );
    }

    #[test]
    fn address_parse_rejects_non_hex() {
        assert!(matches!(
            "0xzz".parse::<Address>(),
            Err(AddressParseError::InvalidHex(_))
        ));
    }

    #[test]
    fn null_address_is_all_zero() {
        assert!(Address::NULL.is_null());
        assert!(Address::default().is_null());
        assert!(!Address::repeat_byte(1).is_null());
    }

    #[test]
    fn amount_checked_arithmetic_never_wraps() {
        assert_eq!(Amount::MAX.checked_add(Amount::from(1u64)), None);
        assert_eq!(Amount::ZERO.checked_sub(Amount::from(1u64)), None);
        assert_eq!(
            Amount::from(7u64).checked_sub(Amount::from(3u64)),
            Some(Amount::from(4u64))
        );
    }

    #[test]
    fn amount_scaling_by_decimals() {
        let one_token = Amount::from(1u64).scaled(18).unwrap();
        assert_eq!(one_token, Amount::from(1_000_000_000_000_000_000u64));

        let supply = Amount::from(1_000_000u64).scaled(18).unwrap();
        assert_eq!(supply.to_string(), format!("1{}", "0".repeat(24)));
    }

    #[test]
    fn zero_scales_past_the_largest_power_of_ten() {
        assert_eq!(Amount::ZERO.scaled(78), Some(Amount::ZERO));
        assert_eq!(Amount::ZERO.scaled(u8::MAX), Some(Amount::ZERO));
        assert_eq!(Amount::from(1u64).scaled(78), None);
    }

    #[test]
    fn pow10_bounds() {
        assert!(Amount::pow10(77).is_some());
        assert!(Amount::pow10(78).is_none());
        assert_eq!(Amount::pow10(0), Some(Amount::from(1u64)));
    }

    #[test]
    fn amount_parse_rejects_garbage() {
        assert_eq!("".parse::<Amount>(), Err(AmountParseError::Empty));
        assert!(matches!(
            "-5".parse::<Amount>(),
            Err(AmountParseError::InvalidDigits(_))
        ));
        assert!(matches!(
            "1.5".parse::<Amount>(),
            Err(AmountParseError::InvalidDigits(_))
        ));
        let too_big = format!("1{}", "0".repeat(78));
        assert_eq!(too_big.parse::<Amount>(), Err(AmountParseError::Overflow));
    }

    #[test]
    fn amount_json_accepts_string_and_number() {
        let from_str: Amount = serde_json::from_str("\"1000000000000000000000000\"").unwrap();
        assert_eq!(from_str, Amount::from(1_000_000u64).scaled(18).unwrap());

        let from_num: Amount = serde_json::from_str("42").unwrap();
        assert_eq!(from_num, Amount::from(42u64));

        assert!(serde_json::from_str::<Amount>("-1").is_err());
        assert_eq!(serde_json::to_string(&from_num).unwrap(), "\"42\"");
    }
}
