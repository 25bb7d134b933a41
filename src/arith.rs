//! Modular arithmetic over the shared modulus.
//!
//! Everything is arbitrary precision (`num-bigint`), so intermediate
//! products never wrap.
//!
//! # Hardening
//!
//! `BigUint::modpow` is not constant time. Exponents derived from block
//! content (tags, `g^μ`) therefore leak timing information about the digest.
//! Production deployments must swap in a fixed-window, constant-time
//! exponentiation behind [`modpow`]; callers only depend on this signature.

use num_bigint::BigUint;
use num_traits::One;

use crate::error::{AuditError, Result};

fn check_modulus(modulus: &BigUint) -> Result<()> {
    if *modulus <= BigUint::one() {
        return Err(AuditError::InvalidModulus(format!(
            "modulus must be greater than 1, got {}",
            to_hex(modulus)
        )));
    }
    Ok(())
}

/// `base^exponent mod modulus`.
pub fn modpow(base: &BigUint, exponent: &BigUint, modulus: &BigUint) -> Result<BigUint> {
    check_modulus(modulus)?;
    Ok(base.modpow(exponent, modulus))
}

/// `a * b mod modulus`.
pub fn modmul(a: &BigUint, b: &BigUint, modulus: &BigUint) -> Result<BigUint> {
    check_modulus(modulus)?;
    Ok((a * b) % modulus)
}

/// Lowercase hex without a `0x` prefix.
pub fn to_hex(value: &BigUint) -> String {
    value.to_str_radix(16)
}

/// Parse hex, tolerating a `0x` prefix, uppercase digits and surrounding
/// whitespace.
pub fn from_hex(key: &str, text: &str) -> Result<BigUint> {
    let trimmed = text.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    if digits.is_empty() {
        return Err(AuditError::InvalidParameter {
            key: key.to_string(),
            reason: "empty hex string".to_string(),
        });
    }
    BigUint::parse_bytes(digits.as_bytes(), 16).ok_or_else(|| AuditError::InvalidParameter {
        key: key.to_string(),
        reason: format!("not a hex integer: {digits}"),
    })
}

/// Serde adapter storing a `BigUint` as a hex string.
pub mod hex_biguint {
    use num_bigint::BigUint;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &BigUint, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::to_hex(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BigUint, D::Error> {
        let text = String::deserialize(deserializer)?;
        super::from_hex("value", &text).map_err(serde::de::Error::custom)
    }
}
