// crates/tier-core/src/address.rs
//
// Bech32 account and validator addresses.
//
// Accounts use the `source` prefix, validator operators `sourcevaloper`.
// Module accounts (tier, insurance pool, developer pool) have no key pair;
// their address is the first 20 bytes of sha256(module_name).

use std::fmt;
use std::str::FromStr;

use bech32::{FromBase32, ToBase32, Variant};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::TierError;

/// Human-readable prefix for account addresses.
pub const ACCOUNT_HRP: &str = "source";

/// Human-readable prefix for validator operator addresses.
pub const VALIDATOR_HRP: &str = "sourcevaloper";

/// Accepted raw address lengths (secp256k1-derived and module/contract addresses).
const VALID_LENGTHS: [usize; 2] = [20, 32];

macro_rules! bech32_address {
    ($name:ident, $hrp:expr, $label:literal) => {
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(Vec<u8>);

        impl $name {
            /// Wrap raw address bytes without validation.
            pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
                Self(bytes.into())
            }

            /// Raw address bytes.
            pub fn as_bytes(&self) -> &[u8] {
                &self.0
            }

            /// Decode a bech32 string, checking prefix and payload length.
            pub fn from_bech32(s: &str) -> Result<Self, TierError> {
                let (hrp, data, variant) = bech32::decode(s).map_err(|e| {
                    TierError::InvalidAddress(format!("{} address '{}': {}", $label, s, e))
                })?;
                if hrp != $hrp {
                    return Err(TierError::InvalidAddress(format!(
                        "{} address '{}' has prefix '{}', expected '{}'",
                        $label, s, hrp, $hrp
                    )));
                }
                if variant != Variant::Bech32 {
                    return Err(TierError::InvalidAddress(format!(
                        "{} address '{}' is not bech32 encoded",
                        $label, s
                    )));
                }
                let bytes = Vec::<u8>::from_base32(&data).map_err(|e| {
                    TierError::InvalidAddress(format!("{} address '{}': {}", $label, s, e))
                })?;
                if !VALID_LENGTHS.contains(&bytes.len()) {
                    return Err(TierError::InvalidAddress(format!(
                        "{} address '{}' decodes to {} bytes",
                        $label,
                        s,
                        bytes.len()
                    )));
                }
                Ok(Self(bytes))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                let encoded = bech32::encode($hrp, self.0.to_base32(), Variant::Bech32)
                    .map_err(|_| fmt::Error)?;
                f.write_str(&encoded)
            }
        }

        impl FromStr for $name {
            type Err = TierError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::from_bech32(s)
            }
        }

        impl TryFrom<String> for $name {
            type Error = TierError;

            fn try_from(s: String) -> Result<Self, Self::Error> {
                Self::from_bech32(&s)
            }
        }

        impl From<$name> for String {
            fn from(addr: $name) -> String {
                addr.to_string()
            }
        }
    };
}

bech32_address!(AccAddress, ACCOUNT_HRP, "account");
bech32_address!(ValAddress, VALIDATOR_HRP, "validator");

/// Derive the account address of a named module account.
pub fn module_address(module_name: &str) -> AccAddress {
    let digest = Sha256::digest(module_name.as_bytes());
    AccAddress::from_bytes(&digest[..20])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_bech32_roundtrip_keeps_prefix() {
        let addr = AccAddress::from_bytes([7u8; 20]);
        let s = addr.to_string();
        assert!(s.starts_with("source1"));
        assert_eq!(AccAddress::from_bech32(&s).unwrap(), addr);
    }

    #[test]
    fn test_validator_prefix_is_enforced() {
        let val = ValAddress::from_bytes([3u8; 20]).to_string();
        assert!(val.starts_with("sourcevaloper1"));
        let err = AccAddress::from_bech32(&val).unwrap_err();
        assert_eq!(err.code(), "invalid_address");
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert!(AccAddress::from_bech32("").is_err());
        assert!(AccAddress::from_bech32("source1notvalid").is_err());
        assert!(ValAddress::from_bech32("hello world").is_err());
    }

    #[test]
    fn test_wrong_length_is_rejected() {
        let s = bech32::encode(ACCOUNT_HRP, vec![1u8; 5].to_base32(), Variant::Bech32).unwrap();
        assert!(AccAddress::from_bech32(&s).is_err());
    }

    #[test]
    fn test_module_addresses_differ() {
        let tier = module_address("tier");
        let pool = module_address("insurance_pool");
        assert_ne!(tier, pool);
        assert_eq!(tier.as_bytes().len(), 20);
        assert_eq!(tier, module_address("tier"));
    }

    #[test]
    fn test_serde_uses_bech32_string() {
        let addr = AccAddress::from_bytes([9u8; 20]);
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, format!("\"{}\"", addr));
        let back: AccAddress = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);
    }
}
