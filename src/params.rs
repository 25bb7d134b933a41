//! Public modulus parameters `(N, g)`.
//!
//! Loaded once from trusted configuration and injected into every component.
//! The factorisation of `N` is never known to this crate.

use num_bigint::BigUint;
use num_integer::Integer;
use num_traits::One;

use crate::arith::{from_hex, to_hex};
use crate::error::{AuditError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModulusParams {
    n: BigUint,
    g: BigUint,
}

impl ModulusParams {
    pub fn new(n: BigUint, g: BigUint) -> Result<Self> {
        if n <= BigUint::one() {
            return Err(AuditError::InvalidModulus(
                "modulus must be greater than 1".to_string(),
            ));
        }
        if n.is_even() {
            return Err(AuditError::InvalidModulus(
                "modulus must be odd".to_string(),
            ));
        }
        if g <= BigUint::one() || g >= n {
            return Err(AuditError::InvalidGenerator(format!(
                "generator {} must lie strictly between 1 and N",
                to_hex(&g)
            )));
        }
        if !g.gcd(&n).is_one() {
            return Err(AuditError::InvalidGenerator(
                "generator shares a factor with N".to_string(),
            ));
        }
        Ok(Self { n, g })
    }

    pub fn from_hex(n_hex: &str, g_hex: &str) -> Result<Self> {
        let n = from_hex("modulus", n_hex)
            .map_err(|e| AuditError::InvalidModulus(e.to_string()))?;
        let g = from_hex("generator", g_hex)
            .map_err(|e| AuditError::InvalidGenerator(e.to_string()))?;
        Self::new(n, g)
    }

    pub fn modulus(&self) -> &BigUint {
        &self.n
    }

    pub fn generator(&self) -> &BigUint {
        &self.g
    }

    /// Byte length of `N`.
    pub fn byte_len(&self) -> usize {
        usize::try_from(self.n.bits().div_ceil(8)).unwrap_or(usize::MAX)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::ModulusParams;

    /// Product of two 256-bit safe primes. Small enough for fast unit tests.
    pub const MODULUS_512: &str = "976C35490498220D3A9FF22F629454E995AB6DD32EEAF01D1744570511DAF3E1679394A4F22BC0C8587807D82017A5B20192FD30E8C333135A47D93F3720041D";

    pub fn small_params() -> ModulusParams {
        ModulusParams::from_hex(MODULUS_512, "05").unwrap()
    }
}
