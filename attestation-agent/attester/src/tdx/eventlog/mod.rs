// Copyright (c) 2024 Alibaba Cloud
//
// SPDX-License-Identifier: Apache-2.0
//

//! TCG PC Client (crypto agile) event logs, as published by TDX firmware
//! through the CCEL ACPI table.

use std::{fs, path::PathBuf};

use log::debug;
use serde::{Deserialize, Serialize};

use super::acpi::{self, AcpiSignature};
use crate::{
    config::{EventlogConfig, EventlogFormat},
    Error, Result,
};

mod names;
mod parser;
pub(crate) mod reader;
mod tags;

#[cfg(test)]
pub(crate) mod testing;

pub use names::event_type_name;
pub use parser::{parse_event_log, parse_events, spec_id_event_len};
pub(crate) use parser::{check_digest_count, check_event_size};

/// Largest event payload accepted
pub const MAX_EVENT_SIZE: u32 = 0x8000;

/// Upper bound of digests carried by one event record
pub const MAX_DIGEST_COUNT: u32 = 5;

/// Register index that marks the end of the log area
pub const EVENT_LOG_END: u32 = 0xFFFF_FFFF;

pub const EV_NO_ACTION: u32 = 0x3;

/// Digest algorithms of the TCG algorithm registry measured into RTMRs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DigestAlgorithm {
    #[serde(rename = "SHA256")]
    Sha256,
    #[serde(rename = "SHA384")]
    Sha384,
    #[serde(rename = "SHA512")]
    Sha512,
    #[serde(rename = "SM3_256")]
    Sm3_256,
}

impl DigestAlgorithm {
    pub fn from_alg_id(id: u16) -> Option<Self> {
        match id {
            0x000B => Some(Self::Sha256),
            0x000C => Some(Self::Sha384),
            0x000D => Some(Self::Sha512),
            0x0012 => Some(Self::Sm3_256),
            _ => None,
        }
    }

    pub fn digest_size(&self) -> usize {
        match self {
            Self::Sha256 | Self::Sm3_256 => 32,
            Self::Sha384 => 48,
            Self::Sha512 => 64,
        }
    }
}

/// Events measured into one register bank.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RtmrEventLog {
    pub rtmr: RtmrData,
    #[serde(rename = "rtmr_events")]
    pub events: Vec<RtmrEvent>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RtmrData {
    pub index: u32,
    pub bank: DigestAlgorithm,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RtmrEvent {
    /// Event type, `0x` prefixed lowercase hex
    pub type_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Hex encoded digest
    pub measurement: String,
}

/// Somewhere a TCG event log can be read from.
pub trait EventLogSource {
    /// Log bytes from the Spec ID event up to the end of the last record.
    fn raw_event_log(&self) -> Result<Vec<u8>>;

    fn event_logs(&self) -> Result<Vec<RtmrEventLog>> {
        parse_event_log(&self.raw_event_log()?)
    }

    /// The event log as attached to evidence.
    fn encoded(&self, format: EventlogFormat) -> Result<Vec<u8>> {
        match format {
            EventlogFormat::Raw => self.raw_event_log(),
            EventlogFormat::Parsed => Ok(serde_json::to_vec(&self.event_logs()?)?),
        }
    }
}

/// Event log area described by a CCEL (or legacy TDEL) ACPI table.
#[derive(Clone, Debug)]
pub struct AcpiEventLog {
    signature: AcpiSignature,
    table_path: PathBuf,
    data_path: PathBuf,
}

impl AcpiEventLog {
    pub fn new(
        signature: AcpiSignature,
        table_path: impl Into<PathBuf>,
        data_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            signature,
            table_path: table_path.into(),
            data_path: data_path.into(),
        }
    }
}

impl EventLogSource for AcpiEventLog {
    fn raw_event_log(&self) -> Result<Vec<u8>> {
        let table = fs::read(&self.table_path).map_err(|e| Error::io(&self.table_path, e))?;
        let data = fs::read(&self.data_path).map_err(|e| Error::io(&self.data_path, e))?;

        let table = acpi::read_table(&table, self.signature)?;
        let data = acpi::read_data(&table, &data)?;
        let len = acpi::content_length(data)?;
        debug!(
            "{} log area holds {len} bytes of events, {} bytes reserved",
            self.signature,
            data.len()
        );

        Ok(data[..len].to_vec())
    }
}

/// Raw TCG event log kept in a regular file.
#[derive(Clone, Debug)]
pub struct FileEventLog {
    path: PathBuf,
}

impl FileEventLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl EventLogSource for FileEventLog {
    fn raw_event_log(&self) -> Result<Vec<u8>> {
        fs::read(&self.path).map_err(|e| Error::io(&self.path, e))
    }
}

/// Event log source described by `config`, `None` when disabled.
pub fn from_config(config: &EventlogConfig) -> Option<Box<dyn EventLogSource>> {
    if !config.enabled {
        return None;
    }

    let source: Box<dyn EventLogSource> = match &config.file {
        Some(path) => Box::new(FileEventLog::new(path)),
        None => Box::new(AcpiEventLog::new(
            config.signature,
            config.table_path(),
            config.data_path(),
        )),
    };
    Some(source)
}
