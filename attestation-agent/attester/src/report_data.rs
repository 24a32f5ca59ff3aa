// Copyright (c) 2024 Alibaba Cloud
//
// SPDX-License-Identifier: Apache-2.0
//

//! Derivation of the report data that binds a quote to a verifier nonce.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256, Sha384, Sha512};
use strum::{AsRefStr, Display, EnumString};

use crate::{Error, Result, VerifierNonce};

/// Hash algorithms used to calculate report data
#[derive(
    EnumString, AsRefStr, Serialize, Deserialize, Clone, Debug, Display, Copy, PartialEq, Eq,
)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    #[strum(serialize = "sha256")]
    Sha256,

    #[strum(serialize = "sha384")]
    Sha384,

    #[strum(serialize = "sha512")]
    Sha512,
}

fn hash_reportdata<D: Digest>(materials: &[&[u8]]) -> Vec<u8> {
    materials
        .iter()
        .fold(D::new(), |hasher, material| hasher.chain_update(material))
        .finalize()
        .to_vec()
}

impl HashAlgorithm {
    /// Return the hash value length in bytes
    pub fn digest_len(&self) -> usize {
        match self {
            HashAlgorithm::Sha256 => 32,
            HashAlgorithm::Sha384 => 48,
            HashAlgorithm::Sha512 => 64,
        }
    }

    /// Hash the concatenation of `materials`.
    pub fn digest(&self, materials: &[&[u8]]) -> Vec<u8> {
        match self {
            HashAlgorithm::Sha256 => hash_reportdata::<Sha256>(materials),
            HashAlgorithm::Sha384 => hash_reportdata::<Sha384>(materials),
            HashAlgorithm::Sha512 => hash_reportdata::<Sha512>(materials),
        }
    }
}

/// Derive `Hash(nonce.val || nonce.iat || user_data)`.
///
/// Without a nonce and without user data nothing is bound and the report
/// data is all zeros, of the digest length of `alg`.
pub fn derive(alg: HashAlgorithm, nonce: Option<&VerifierNonce>, user_data: &[u8]) -> Vec<u8> {
    match nonce {
        Some(nonce) => alg.digest(&[&nonce.val, &nonce.iat, user_data]),
        None if !user_data.is_empty() => alg.digest(&[user_data]),
        None => vec![0; alg.digest_len()],
    }
}

/// Check a hex encoded report data embedded in runtime data against the
/// expected report data. Case insensitive.
pub fn verify_binding(expected: &[u8], embedded_hex: &str) -> Result<()> {
    if !hex::encode(expected).eq_ignore_ascii_case(embedded_hex.trim()) {
        return Err(Error::ReportDataMismatch);
    }

    Ok(())
}
