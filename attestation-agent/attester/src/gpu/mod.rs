// Copyright (c) 2024 Alibaba Cloud
//
// SPDX-License-Identifier: Apache-2.0
//

//! NVIDIA confidential computing GPU evidence.

use base64::{engine::general_purpose, Engine};

use crate::{Error, EvidenceAdapter, EvidenceKind, RawEvidence, Result};

pub mod attester;
pub mod cert_chain;
#[cfg(feature = "gpu-attester")]
pub mod nvml;

pub use attester::{GpuArchitecture, GpuAttester, GpuDevices, RemoteGpuEvidence};

/// Architecture reported in GPU evidence.
pub const GPU_ARCH: &str = "hopper";

pub struct GpuAdapter {
    attester: GpuAttester,
}

impl GpuAdapter {
    pub fn new(attester: GpuAttester) -> Self {
        Self { attester }
    }

    #[cfg(feature = "gpu-attester")]
    pub fn nvml() -> Result<Self> {
        let devices = nvml::NvmlDevices::init().map_err(Error::Device)?;
        Ok(Self::new(GpuAttester::new(devices)))
    }
}

impl EvidenceAdapter for GpuAdapter {
    fn kind(&self) -> EvidenceKind {
        EvidenceKind::Gpu
    }

    fn collect(&self, report_data: &[u8]) -> Result<RawEvidence> {
        let mut evidence = self.attester.remote_evidence(report_data)?;
        if evidence.is_empty() {
            return Err(Error::UnsupportedDevice("no GPU evidence collected".into()));
        }
        let evidence = evidence.swap_remove(0);

        let report = general_purpose::STANDARD
            .decode(&evidence.evidence)
            .map_err(|e| Error::Device(e.into()))?;

        Ok(RawEvidence {
            quote: report,
            certificate: Some(evidence.certificate),
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::attester::tests::MockDevices;
    use super::*;

    #[test]
    fn collect_report_and_certificate() {
        let adapter = GpuAdapter::new(GpuAttester::new(MockDevices::hopper(2)));
        assert_eq!(adapter.hash_algorithm(), crate::HashAlgorithm::Sha256);

        let evidence = adapter.collect(&[5; 32]).unwrap();
        assert_eq!(evidence.quote, [b"report".as_slice(), &[5; 32]].concat());

        let pem = general_purpose::STANDARD
            .decode(evidence.certificate.unwrap())
            .unwrap();
        assert_eq!(cert_chain::CertChain::from_pem(&pem).unwrap().len(), 2);
    }
}
