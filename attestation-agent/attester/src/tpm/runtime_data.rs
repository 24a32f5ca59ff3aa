// Copyright (c) 2024 Alibaba Cloud
//
// SPDX-License-Identifier: Apache-2.0
//

//! Runtime data published by the paravisor of a vTPM backed TD.
//!
//! Layout: a header, the TD report at [`TD_REPORT_OFFSET`], and at
//! [`RUNTIME_DATA_SIZE_OFFSET`] the size of the runtime claims JSON that
//! directly follows it.

use scroll::{Pread, LE};
use serde::Deserialize;

use crate::{Error, Result};

pub const TD_REPORT_OFFSET: usize = 32;
pub const TD_REPORT_SIZE: usize = 1024;
pub const RUNTIME_DATA_SIZE_OFFSET: usize = 1232;
const RUNTIME_DATA_OFFSET: usize = RUNTIME_DATA_SIZE_OFFSET + 4;

#[derive(Debug)]
pub struct RuntimeData<'a> {
    td_report: &'a [u8],
    runtime_json: &'a [u8],
}

/// Claims of the runtime data JSON the report data binding is checked
/// against. Other claims (keys, VM configuration) are left to the verifier.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct RuntimeClaims {
    /// Hex of the report data the runtime data was generated for
    #[serde(rename = "user-data")]
    pub user_data: String,
}

impl<'a> RuntimeData<'a> {
    pub fn parse(data: &'a [u8]) -> Result<Self> {
        let size: u32 = data.pread_with(RUNTIME_DATA_SIZE_OFFSET, LE).map_err(|_| {
            Error::InvalidRuntimeData(format!(
                "runtime data holds {} bytes, too short for its header",
                data.len()
            ))
        })?;

        let end = RUNTIME_DATA_OFFSET
            .checked_add(size as usize)
            .filter(|end| *end <= data.len())
            .ok_or_else(|| {
                Error::InvalidRuntimeData(format!(
                    "runtime claims of {size} bytes exceed the {} bytes of runtime data",
                    data.len()
                ))
            })?;

        Ok(Self {
            td_report: &data[TD_REPORT_OFFSET..TD_REPORT_OFFSET + TD_REPORT_SIZE],
            runtime_json: &data[RUNTIME_DATA_OFFSET..end],
        })
    }

    pub fn td_report(&self) -> &'a [u8] {
        self.td_report
    }

    pub fn runtime_json(&self) -> &'a [u8] {
        self.runtime_json
    }

    pub fn claims(&self) -> Result<RuntimeClaims> {
        serde_json::from_slice(self.runtime_json)
            .map_err(|e| Error::InvalidRuntimeData(format!("invalid runtime claims: {e}")))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Runtime data around a TD report filled with `report_fill`.
    pub(crate) fn runtime_data(report_fill: u8, json: &[u8]) -> Vec<u8> {
        let mut data = vec![0; RUNTIME_DATA_OFFSET];
        data[TD_REPORT_OFFSET..TD_REPORT_OFFSET + TD_REPORT_SIZE].fill(report_fill);
        data[RUNTIME_DATA_SIZE_OFFSET..RUNTIME_DATA_OFFSET]
            .copy_from_slice(&(json.len() as u32).to_le_bytes());
        data.extend_from_slice(json);
        data
    }

    const CLAIMS: &str = r#"{
        "keys": [
            {"e": "AQAB", "key_ops": ["sign"], "kid": "HCLAkPub", "kty": "RSA", "n": "skofOA"}
        ],
        "user-data": "9BB304372F8CF113",
        "vm-configuration": {
            "console-enabled": true,
            "root-cert-thumbprint": "6nZZnYaJc4KqUZ",
            "secure-boot": true,
            "tpm-enabled": true,
            "tpm-persisted": true,
            "vmUniqueId": "A84E0112-30B3-4F18-8083-4B5ABED580A5"
        }
    }"#;

    #[test]
    fn parse_runtime_data() {
        let mut data = runtime_data(0xaa, CLAIMS.as_bytes());
        data.extend_from_slice(&[0; 64]);

        let runtime_data = RuntimeData::parse(&data).unwrap();
        assert_eq!(runtime_data.td_report(), &[0xaa; TD_REPORT_SIZE][..]);
        assert_eq!(runtime_data.runtime_json(), CLAIMS.as_bytes());

        let claims = runtime_data.claims().unwrap();
        assert_eq!(claims.user_data, "9BB304372F8CF113");
    }

    #[test]
    fn truncated_runtime_data() {
        assert!(matches!(
            RuntimeData::parse(&[0; RUNTIME_DATA_SIZE_OFFSET]),
            Err(Error::InvalidRuntimeData(_))
        ));

        let mut data = runtime_data(0, CLAIMS.as_bytes());
        data.truncate(data.len() - 1);
        assert!(matches!(
            RuntimeData::parse(&data),
            Err(Error::InvalidRuntimeData(_))
        ));
    }

    #[test]
    fn claims_without_user_data() {
        let data = runtime_data(0, br#"{"keys": []}"#);
        let runtime_data = RuntimeData::parse(&data).unwrap();
        assert!(matches!(
            runtime_data.claims(),
            Err(Error::InvalidRuntimeData(_))
        ));
    }
}
