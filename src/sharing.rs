// SPDX-License-Identifier: AGPL-3.0-or-later

//! Shareable account ID derivation.
//!
//! A shareable ID is a stable identifier for a linked account that is safe
//! to expose to other users: it is derived from the aggregator account ID
//! with HMAC-SHA256 under a server-held key, so it is deterministic for a
//! given account but cannot be reversed back to the raw account ID.

use base64ct::{Base64UrlUnpadded, Encoding};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Derive the shareable ID for an aggregator account ID.
pub fn derive_shareable_id(key: &str, account_id: &str) -> String {
    // HMAC-SHA256 accepts keys of any length.
    let mut mac = HmacSha256::new_from_slice(key.as_bytes())
        .expect("HMAC key of any length is accepted");
    mac.update(account_id.as_bytes());
    let digest = mac.finalize().into_bytes();
    Base64UrlUnpadded::encode_string(&digest)
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "test-shareable-key";

    #[test]
    fn derivation_is_deterministic() {
        let first = derive_shareable_id(KEY, "acc_1");
        let second = derive_shareable_id(KEY, "acc_1");
        assert_eq!(first, second);
    }

    #[test]
    fn distinct_accounts_get_distinct_ids() {
        assert_ne!(
            derive_shareable_id(KEY, "acc_1"),
            derive_shareable_id(KEY, "acc_2")
        );
    }

    #[test]
    fn distinct_keys_get_distinct_ids() {
        assert_ne!(
            derive_shareable_id("key-a", "acc_1"),
            derive_shareable_id("key-b", "acc_1")
        );
    }

    #[test]
    fn derived_id_does_not_embed_the_account_id() {
        let id = derive_shareable_id(KEY, "acc_1");
        assert!(!id.contains("acc_1"));
        // 32-byte digest, base64url without padding.
        assert_eq!(id.len(), 43);
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }
}
