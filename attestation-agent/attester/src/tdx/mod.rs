// Copyright (c) 2024 Alibaba Cloud
//
// SPDX-License-Identifier: Apache-2.0
//

use log::debug;

use crate::{
    config::{Config, EventlogFormat},
    Error, EvidenceAdapter, EvidenceKind, QuoteProvider, RawEvidence, Result,
};

pub mod acpi;
pub mod eventlog;

use eventlog::EventLogSource;

pub const TDX_REPORT_DATA_SIZE: usize = 64;

/// Evidence of a TDX guest: a TD quote and optionally the CCEL event log.
pub struct TdxAdapter {
    quote_provider: Box<dyn QuoteProvider>,
    event_log: Option<Box<dyn EventLogSource>>,
    event_log_format: EventlogFormat,
}

impl TdxAdapter {
    pub fn new(quote_provider: impl QuoteProvider + 'static) -> Self {
        Self {
            quote_provider: Box::new(quote_provider),
            event_log: None,
            event_log_format: EventlogFormat::default(),
        }
    }

    pub fn with_event_log(mut self, source: Box<dyn EventLogSource>, format: EventlogFormat) -> Self {
        self.event_log = Some(source);
        self.event_log_format = format;
        self
    }

    /// Adapter with the event log described by `config`.
    pub fn from_config(config: &Config, quote_provider: impl QuoteProvider + 'static) -> Self {
        let adapter = Self::new(quote_provider);
        match eventlog::from_config(&config.eventlog) {
            Some(source) => adapter.with_event_log(source, config.eventlog.format),
            None => adapter,
        }
    }

    /// Adapter quoting through the TSM report configfs interface.
    #[cfg(feature = "tsm-report")]
    pub fn tsm_report(config: &Config) -> Self {
        Self::from_config(
            config,
            crate::tsm_report::TsmReportQuoteProvider::from_config(&config.tsm_report),
        )
    }
}

impl EvidenceAdapter for TdxAdapter {
    fn kind(&self) -> EvidenceKind {
        EvidenceKind::Tdx
    }

    fn collect(&self, report_data: &[u8]) -> Result<RawEvidence> {
        if report_data.len() != TDX_REPORT_DATA_SIZE {
            return Err(Error::InvalidNonce(format!(
                "TDX report data must be {TDX_REPORT_DATA_SIZE} bytes, got {}",
                report_data.len()
            )));
        }

        let quote = self
            .quote_provider
            .get_quote(report_data)
            .map_err(Error::Quote)?;

        let event_log = match &self.event_log {
            Some(source) => {
                let log = source.encoded(self.event_log_format)?;
                debug!(
                    "attaching {} bytes of {:?} event log",
                    log.len(),
                    self.event_log_format
                );
                Some(log)
            }
            None => None,
        };

        Ok(RawEvidence {
            quote,
            event_log,
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::eventlog::{testing::*, RtmrEventLog};
    use super::*;
    use crate::config::EventlogConfig;

    fn echo_quote(report_data: &[u8]) -> anyhow::Result<Vec<u8>> {
        Ok([b"quote:".as_slice(), report_data].concat())
    }

    #[test]
    fn quote_without_event_log() {
        let adapter = TdxAdapter::new(echo_quote);
        let evidence = adapter.collect(&[7; 64]).unwrap();
        assert_eq!(evidence.quote, [b"quote:".as_slice(), &[7; 64]].concat());
        assert!(evidence.event_log.is_none());
        assert!(evidence.runtime_data.is_none());
    }

    #[test]
    fn report_data_size() {
        let adapter = TdxAdapter::new(echo_quote);
        assert!(matches!(
            adapter.collect(&[0; 32]),
            Err(Error::InvalidNonce(_))
        ));
    }

    #[test]
    fn quote_failure() {
        let adapter = TdxAdapter::new(|_: &[u8]| -> anyhow::Result<Vec<u8>> {
            anyhow::bail!("tdx_guest device is not available")
        });
        assert!(matches!(adapter.collect(&[0; 64]), Err(Error::Quote(_))));
    }

    #[test]
    fn parsed_event_log_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let log = LogBuilder::new()
            .event(1, 0xd, vec![digest(SHA384, 9)], b"Grub Cmdline\0")
            .build();
        let mut data = log.clone();
        data.resize(0x200, 0xff);
        fs::write(dir.path().join("CCEL"), ccel_table(0x200)).unwrap();
        fs::write(dir.path().join("data"), &data).unwrap();

        let config = Config {
            eventlog: EventlogConfig {
                enabled: true,
                format: EventlogFormat::Parsed,
                table_path: Some(dir.path().join("CCEL")),
                data_path: Some(dir.path().join("data")),
                ..Default::default()
            },
            ..Default::default()
        };

        let evidence = TdxAdapter::from_config(&config, echo_quote)
            .collect(&[0; 64])
            .unwrap();
        let logs: Vec<RtmrEventLog> = serde_json::from_slice(&evidence.event_log.unwrap()).unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].events[0].measurement, "09".repeat(48));
    }

    #[test]
    fn broken_event_log_fails_collection() {
        let dir = tempfile::tempdir().unwrap();
        let mut table = ccel_table(0x200);
        table[0] = b'X';
        fs::write(dir.path().join("CCEL"), table).unwrap();
        fs::write(dir.path().join("data"), vec![0xff; 0x200]).unwrap();

        let adapter = TdxAdapter::new(echo_quote).with_event_log(
            Box::new(eventlog::AcpiEventLog::new(
                acpi::AcpiSignature::Ccel,
                dir.path().join("CCEL"),
                dir.path().join("data"),
            )),
            EventlogFormat::Raw,
        );
        assert!(matches!(
            adapter.collect(&[0; 64]),
            Err(Error::InvalidSignature { .. })
        ));
    }
}
