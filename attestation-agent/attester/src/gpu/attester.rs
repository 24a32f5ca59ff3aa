// Copyright (c) 2024 Alibaba Cloud
//
// SPDX-License-Identifier: Apache-2.0
//

use base64::{engine::general_purpose, Engine};
use log::{info, warn};
use serde::{Deserialize, Serialize};

use super::cert_chain::CertChain;
use crate::{Error, Result};

/// Size of the nonce a GPU attestation report is bound to.
pub const GPU_NONCE_SIZE: usize = 32;

// Only one device is attested.
const MAX_ATTESTED_DEVICES: u32 = 1;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GpuArchitecture {
    Hopper,
    Other(String),
}

/// Access to the confidential computing GPUs of the host.
pub trait GpuDevices {
    fn device_count(&self) -> anyhow::Result<u32>;

    fn architecture(&self, index: u32) -> anyhow::Result<GpuArchitecture>;

    fn cc_enabled(&self, index: u32) -> anyhow::Result<bool>;

    /// Signed attestation report over `nonce`.
    fn attestation_report(&self, index: u32, nonce: [u8; GPU_NONCE_SIZE])
        -> anyhow::Result<Vec<u8>>;

    /// PEM chain of the certificate signing the attestation report.
    fn attestation_cert_chain(&self, index: u32) -> anyhow::Result<Vec<u8>>;
}

/// Evidence of one device
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteGpuEvidence {
    /// Device index
    pub index: u32,
    /// Attestation report (Base64 encoded)
    pub evidence: String,
    /// Verified certificate chain (Base64 encoded PEM)
    pub certificate: String,
}

/// Collects attestation reports of the host's GPUs.
pub struct GpuAttester {
    devices: Box<dyn GpuDevices>,
}

impl GpuAttester {
    pub fn new(devices: impl GpuDevices + 'static) -> Self {
        Self {
            devices: Box::new(devices),
        }
    }

    /// Evidence of every attested device, each bound to `nonce`.
    pub fn remote_evidence(&self, nonce: &[u8]) -> Result<Vec<RemoteGpuEvidence>> {
        let nonce: [u8; GPU_NONCE_SIZE] = nonce.try_into().map_err(|_| {
            Error::InvalidNonce(format!(
                "GPU nonce must be {GPU_NONCE_SIZE} bytes, got {}",
                nonce.len()
            ))
        })?;

        let count = self.devices.device_count().map_err(Error::Device)?;
        if count == 0 {
            return Err(Error::UnsupportedDevice("no GPU device found".into()));
        }

        if count > MAX_ATTESTED_DEVICES {
            warn!(
                "found {count} GPU devices, only {MAX_ATTESTED_DEVICES} will be attested, skipping devices {MAX_ATTESTED_DEVICES} to {}",
                count - 1
            );
        }

        (0..count.min(MAX_ATTESTED_DEVICES))
            .map(|index| self.device_evidence(index, nonce))
            .collect()
    }

    fn device_evidence(&self, index: u32, nonce: [u8; GPU_NONCE_SIZE]) -> Result<RemoteGpuEvidence> {
        if !self.devices.cc_enabled(index).map_err(Error::Device)? {
            return Err(Error::UnsupportedDevice(format!(
                "confidential computing is not enabled on GPU {index}"
            )));
        }

        match self.devices.architecture(index).map_err(Error::Device)? {
            GpuArchitecture::Hopper => {}
            GpuArchitecture::Other(arch) => return Err(Error::UnsupportedArchitecture(arch)),
        }

        let report = self
            .devices
            .attestation_report(index, nonce)
            .map_err(Error::Device)?;
        let pem = self
            .devices
            .attestation_cert_chain(index)
            .map_err(Error::Device)?;

        let chain = CertChain::from_pem(&pem)?;
        chain.verify()?;
        info!(
            "GPU {index}: collected a {} byte attestation report, certificate chain of {} verified",
            report.len(),
            chain.len()
        );

        Ok(RemoteGpuEvidence {
            index,
            evidence: general_purpose::STANDARD.encode(report),
            certificate: chain.to_base64()?,
        })
    }
}
