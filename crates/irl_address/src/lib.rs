//! # irl-address
//!
//! Multi-chain wallet address validation for the IRL rewards service.
//! Pure format checks only — no key derivation, no checksum verification
//! beyond the alphabet/length rules each chain family publishes, and no
//! network access.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ── Constants ───────────────────────────────────────────────────

/// Hex digits after `0x` in an EVM address (20 bytes).
pub const EVM_ADDRESS_HEX_LEN: usize = 40;

/// Hex digits after `0x` in an Aptos address (32 bytes, the chain's
/// native account address length).
pub const APTOS_ADDRESS_HEX_LEN: usize = 64;

/// Base58 character count of a Solana address as accepted here.
pub const SOLANA_ADDRESS_LEN: usize = 44;

/// Total character count of a Stellar public key (`G` + 55 base32).
pub const STELLAR_ADDRESS_LEN: usize = 56;

// ── Chain families ──────────────────────────────────────────────

/// The wallet chain families the service recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainFamily {
    Evm,
    Solana,
    Stellar,
    Aptos,
}

impl ChainFamily {
    /// Wire name of the chain family (`"evm"`, `"solana"`, ...).
    pub fn as_str(&self) -> &'static str {
        match self {
            ChainFamily::Evm => "evm",
            ChainFamily::Solana => "solana",
            ChainFamily::Stellar => "stellar",
            ChainFamily::Aptos => "aptos",
        }
    }

    /// Returns the unique chain family whose address format matches.
    ///
    /// The four formats are pairwise disjoint (hex prefixes of different
    /// lengths, base58 at 44 chars, `G`-prefixed base32 at 56 chars), so
    /// at most one family can claim a given string.
    pub fn detect(address: &str) -> Option<ChainFamily> {
        [
            ChainFamily::Evm,
            ChainFamily::Solana,
            ChainFamily::Stellar,
            ChainFamily::Aptos,
        ]
        .into_iter()
        .find(|family| validate(*family, address).is_ok())
    }
}

impl fmt::Display for ChainFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChainFamily {
    type Err = AddressError;

    /// Parses a wire chain name. Unknown names are an error — never a
    /// silent fallback to `Evm`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "evm" => Ok(ChainFamily::Evm),
            "solana" => Ok(ChainFamily::Solana),
            "stellar" => Ok(ChainFamily::Stellar),
            "aptos" => Ok(ChainFamily::Aptos),
            other => Err(AddressError::UnsupportedChain(other.to_string())),
        }
    }
}

// ── Errors ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    #[error("unsupported chain: {0}")]
    UnsupportedChain(String),

    #[error("invalid {chain} address format")]
    Malformed { chain: ChainFamily },
}

// ── Validation ──────────────────────────────────────────────────

/// Validates `address` against the declared `chain` family's format.
pub fn validate(chain: ChainFamily, address: &str) -> Result<(), AddressError> {
    let ok = match chain {
        ChainFamily::Evm => is_prefixed_hex(address, EVM_ADDRESS_HEX_LEN),
        ChainFamily::Aptos => is_prefixed_hex(address, APTOS_ADDRESS_HEX_LEN),
        ChainFamily::Solana => is_solana(address),
        ChainFamily::Stellar => is_stellar(address),
    };
    if ok {
        Ok(())
    } else {
        Err(AddressError::Malformed { chain })
    }
}

fn is_prefixed_hex(address: &str, hex_len: usize) -> bool {
    let Some(body) = address.strip_prefix("0x") else {
        return false;
    };
    body.len() == hex_len && body.bytes().all(|b| b.is_ascii_hexdigit())
}

fn is_solana(address: &str) -> bool {
    address.len() == SOLANA_ADDRESS_LEN && bs58::decode(address).into_vec().is_ok()
}

fn is_stellar(address: &str) -> bool {
    let mut bytes = address.bytes();
    if bytes.next() != Some(b'G') {
        return false;
    }
    address.len() == STELLAR_ADDRESS_LEN
        && bytes.all(|b| b.is_ascii_uppercase() || (b'2'..=b'7').contains(&b))
}

// ── Tests ───────────────────────────────────────────────────────
