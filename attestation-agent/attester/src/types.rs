// Copyright (c) 2025 Alibaba Cloud
//
// SPDX-License-Identifier: Apache-2.0
//

use serde::{Deserialize, Serialize};
use serde_with::{base64::Base64, serde_as};

/// Freshness token issued by the verifier.
#[serde_as]
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifierNonce {
    #[serde_as(as = "Base64")]
    pub val: Vec<u8>,
    #[serde_as(as = "Base64")]
    pub iat: Vec<u8>,
    #[serde_as(as = "Base64")]
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub signature: Vec<u8>,
}

/// Evidence of quote based TEEs (TDX, SGX and vTPM backed TDX)
#[serde_as]
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteEvidence {
    // Raw quote, base64 encoded on the wire
    #[serde_as(as = "Base64")]
    pub quote: Vec<u8>,
    // Runtime data returned by the quote mechanism
    #[serde_as(as = "Option<Base64>")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime_data: Option<Vec<u8>>,
    // Caller supplied data folded into the report data
    #[serde_as(as = "Option<Base64>")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_data: Option<Vec<u8>>,
    // Raw CCEL bytes or the JSON of the parsed event log
    #[serde_as(as = "Option<Base64>")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_log: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verifier_nonce: Option<VerifierNonce>,
}

/// Evidence of an NVIDIA confidential computing GPU
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GpuEvidence {
    // Base64 of the hex encoded attestation report
    pub evidence: String,
    // Base64 of the PEM encoded attestation certificate chain
    pub certificate: String,
    // Hex encoded nonce the report is bound to
    pub gpu_nonce: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verifier_nonce: Option<VerifierNonce>,
    pub arch: String,
}

/// Evidence of one kind inside a composite evidence.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Evidence {
    Gpu(GpuEvidence),
    Quote(QuoteEvidence),
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn quote_evidence_omits_absent_fields() {
        let evidence = Evidence::Quote(QuoteEvidence {
            quote: b"quote".to_vec(),
            user_data: Some(b"user".to_vec()),
            ..Default::default()
        });

        let value = serde_json::to_value(&evidence).unwrap();
        assert_eq!(value, json!({"quote": "cXVvdGU=", "user_data": "dXNlcg=="}));
    }

    #[test]
    fn gpu_evidence_wire_format() {
        let evidence = Evidence::Gpu(GpuEvidence {
            evidence: "ZXZpZGVuY2U=".into(),
            certificate: "Y2VydA==".into(),
            gpu_nonce: "00ff".into(),
            verifier_nonce: Some(VerifierNonce {
                val: vec![1],
                iat: vec![2],
                signature: vec![],
            }),
            arch: "hopper".into(),
        });

        let value = serde_json::to_value(&evidence).unwrap();
        assert_eq!(
            value,
            json!({
                "evidence": "ZXZpZGVuY2U=",
                "certificate": "Y2VydA==",
                "gpu_nonce": "00ff",
                "verifier_nonce": {"val": "AQ==", "iat": "Ag=="},
                "arch": "hopper",
            })
        );

        let parsed: Evidence = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, evidence);
    }
}
