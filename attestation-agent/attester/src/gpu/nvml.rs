// Copyright (c) 2024 Alibaba Cloud
//
// SPDX-License-Identifier: Apache-2.0
//

use anyhow::{Context, Result};
use nvml_wrapper::{enums::device::DeviceArchitecture, Nvml};

use super::attester::{GpuArchitecture, GpuDevices, GPU_NONCE_SIZE};

/// GPUs reached through the NVIDIA Management Library.
pub struct NvmlDevices {
    nvml: Nvml,
}

impl NvmlDevices {
    pub fn init() -> Result<Self> {
        let nvml = Nvml::init().context("failed to initialize NVML")?;
        Ok(Self { nvml })
    }
}

impl GpuDevices for NvmlDevices {
    fn device_count(&self) -> Result<u32> {
        Ok(self.nvml.device_count()?)
    }

    fn architecture(&self, index: u32) -> Result<GpuArchitecture> {
        let device = self.nvml.device_by_index(index)?;
        Ok(match device.architecture()? {
            DeviceArchitecture::Hopper => GpuArchitecture::Hopper,
            other => GpuArchitecture::Other(format!("{other:?}")),
        })
    }

    fn cc_enabled(&self, index: u32) -> Result<bool> {
        let device = self.nvml.device_by_index(index)?;
        Ok(device.is_cc_enabled()?)
    }

    fn attestation_report(&self, index: u32, nonce: [u8; GPU_NONCE_SIZE]) -> Result<Vec<u8>> {
        let device = self.nvml.device_by_index(index)?;
        let report = device
            .confidential_compute_gpu_attestation_report(nonce)
            .with_context(|| format!("failed to get attestation report of GPU {index}"))?;
        Ok(report.attestation_report)
    }

    fn attestation_cert_chain(&self, index: u32) -> Result<Vec<u8>> {
        let device = self.nvml.device_by_index(index)?;
        let cert = device
            .confidential_compute_gpu_certificate()
            .with_context(|| format!("failed to get certificate of GPU {index}"))?;
        Ok(cert.attestation_cert_chain)
    }
}
