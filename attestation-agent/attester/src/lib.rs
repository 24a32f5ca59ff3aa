// Copyright (c) 2024 Alibaba Cloud
//
// SPDX-License-Identifier: Apache-2.0
//

//! Collection of hardware rooted attestation evidence.
//!
//! An [`EvidenceBuilder`] drives one [`EvidenceAdapter`] per evidence kind.
//! Each adapter receives report data derived from the verifier nonce and the
//! caller's user data, asks its hardware for a quote bound to it and returns
//! what the verifier needs to appraise the quote.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

pub mod builder;
pub mod config;
pub mod error;
pub mod gpu;
pub mod report_data;
pub mod sgx;
pub mod tdx;
pub mod tpm;
pub mod types;

#[cfg(feature = "tsm-report")]
pub mod tsm_report;

pub use builder::{CompositeEvidence, EvidenceBuilder};
pub use error::{Error, ErrorClass, Result};
pub use report_data::HashAlgorithm;
pub use types::{Evidence, VerifierNonce};

/// The evidence kinds a composite evidence may carry, at most one of each.
/// The string form is the identifier used on the wire.
#[derive(
    AsRefStr,
    Display,
    EnumString,
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EvidenceKind {
    Tdx,
    Tpm,
    #[strum(serialize = "nvgpu")]
    #[serde(rename = "nvgpu")]
    Gpu,
    Sgx,
}

impl EvidenceKind {
    /// Hash used to derive report data. GPU nonces are 32 bytes, the CPU
    /// TEE report data fields are 64 bytes.
    pub fn hash_algorithm(&self) -> HashAlgorithm {
        match self {
            EvidenceKind::Gpu => HashAlgorithm::Sha256,
            _ => HashAlgorithm::Sha512,
        }
    }
}

/// What an adapter hands back to the builder for one collection.
#[derive(Clone, Debug, Default)]
pub struct RawEvidence {
    /// Hardware quote (or device attestation report) over the report data.
    pub quote: Vec<u8>,
    /// Runtime data returned alongside the quote.
    pub runtime_data: Option<Vec<u8>>,
    /// Serialized event log.
    pub event_log: Option<Vec<u8>>,
    /// Base64 encoded certificate chain that signs the quote.
    pub certificate: Option<String>,
}

/// One hardware specific evidence mechanism.
pub trait EvidenceAdapter {
    fn kind(&self) -> EvidenceKind;

    fn hash_algorithm(&self) -> HashAlgorithm {
        self.kind().hash_algorithm()
    }

    /// Collect evidence bound to `report_data`.
    fn collect(&self, report_data: &[u8]) -> Result<RawEvidence>;
}

/// Produces a raw quote for the given report data. Implemented by the
/// platform specific quote generation paths.
pub trait QuoteProvider {
    fn get_quote(&self, report_data: &[u8]) -> anyhow::Result<Vec<u8>>;
}

impl<F> QuoteProvider for F
where
    F: Fn(&[u8]) -> anyhow::Result<Vec<u8>>,
{
    fn get_quote(&self, report_data: &[u8]) -> anyhow::Result<Vec<u8>> {
        self(report_data)
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[rstest::rstest]
    #[case(EvidenceKind::Tdx, "tdx")]
    #[case(EvidenceKind::Tpm, "tpm")]
    #[case(EvidenceKind::Gpu, "nvgpu")]
    #[case(EvidenceKind::Sgx, "sgx")]
    fn evidence_kind_identifier(#[case] kind: EvidenceKind, #[case] id: &str) {
        assert_eq!(kind.to_string(), id);
        assert_eq!(EvidenceKind::from_str(id).unwrap(), kind);
        assert_eq!(serde_json::to_string(&kind).unwrap(), format!("\"{id}\""));
    }
}
