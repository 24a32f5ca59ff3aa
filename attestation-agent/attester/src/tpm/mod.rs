// Copyright (c) 2024 Alibaba Cloud
//
// SPDX-License-Identifier: Apache-2.0
//

//! Evidence of a TD whose report data is bound through a paravisor vTPM.
//!
//! The report data is written to an NV index of the vTPM. The paravisor
//! answers with runtime data in another NV index, holding a TD report over
//! the runtime claims, and the claims echo the report data. The TD report
//! is then turned into a quote.

use log::{debug, info};

use crate::{
    config::{Config, EventlogFormat},
    report_data,
    tdx::eventlog::EventLogSource,
    Error, EvidenceAdapter, EvidenceKind, QuoteProvider, RawEvidence, Result,
};

pub mod runtime_data;

use runtime_data::RuntimeData;

pub const TPM_REPORT_DATA_SIZE: usize = 64;

/// NV storage of a TPM. Implemented on top of a TPM software stack.
pub trait TpmDevice {
    fn nv_exists(&self, index: u32) -> anyhow::Result<bool>;

    fn nv_define(&self, index: u32, size: usize) -> anyhow::Result<()>;

    fn nv_write(&self, index: u32, data: &[u8]) -> anyhow::Result<()>;

    fn nv_read(&self, index: u32) -> anyhow::Result<Vec<u8>>;
}

pub struct TpmAdapter {
    device: Box<dyn TpmDevice>,
    /// Turns the TD report of the runtime data into a quote
    quote_provider: Box<dyn QuoteProvider>,
    read_index: u32,
    write_index: u32,
    event_log: Option<Box<dyn EventLogSource>>,
    event_log_format: EventlogFormat,
}

impl TpmAdapter {
    pub fn new(
        config: &Config,
        device: impl TpmDevice + 'static,
        quote_provider: impl QuoteProvider + 'static,
    ) -> Self {
        Self {
            device: Box::new(device),
            quote_provider: Box::new(quote_provider),
            read_index: config.vtpm.runtime_data_read_index,
            write_index: config.vtpm.runtime_data_write_index,
            event_log: crate::tdx::eventlog::from_config(&config.eventlog),
            event_log_format: config.eventlog.format,
        }
    }

    fn runtime_data(&self, report_data: &[u8]) -> Result<Vec<u8>> {
        if !self
            .device
            .nv_exists(self.write_index)
            .map_err(Error::Device)?
        {
            info!("Initializing NV index 0x{:x}", self.write_index);
            self.device
                .nv_define(self.write_index, TPM_REPORT_DATA_SIZE)
                .map_err(Error::Device)?;
        }

        self.device
            .nv_write(self.write_index, report_data)
            .map_err(Error::Device)?;
        self.device
            .nv_read(self.read_index)
            .map_err(Error::Device)
    }
}

impl EvidenceAdapter for TpmAdapter {
    fn kind(&self) -> EvidenceKind {
        EvidenceKind::Tpm
    }

    fn collect(&self, report_data: &[u8]) -> Result<RawEvidence> {
        if report_data.len() != TPM_REPORT_DATA_SIZE {
            return Err(Error::InvalidNonce(format!(
                "vTPM report data must be {TPM_REPORT_DATA_SIZE} bytes, got {}",
                report_data.len()
            )));
        }

        let blob = self.runtime_data(report_data)?;
        let runtime_data = RuntimeData::parse(&blob)?;
        let claims = runtime_data.claims()?;
        report_data::verify_binding(report_data, &claims.user_data)?;
        debug!(
            "runtime data binds the report data, {} bytes of runtime claims",
            runtime_data.runtime_json().len()
        );

        let quote = self
            .quote_provider
            .get_quote(runtime_data.td_report())
            .map_err(Error::Quote)?;

        let event_log = match &self.event_log {
            Some(source) => Some(source.encoded(self.event_log_format)?),
            None => None,
        };

        Ok(RawEvidence {
            quote,
            runtime_data: Some(runtime_data.runtime_json().to_vec()),
            event_log,
            ..Default::default()
        })
    }
}
