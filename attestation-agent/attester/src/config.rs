// Copyright (c) 2024 Alibaba Cloud
//
// SPDX-License-Identifier: Apache-2.0
//

use std::path::PathBuf;

use serde::Deserialize;

use crate::tdx::acpi::AcpiSignature;

pub const DEFAULT_CCEL_TABLE_PATH: &str = "/sys/firmware/acpi/tables/CCEL";
pub const DEFAULT_CCEL_DATA_PATH: &str = "/sys/firmware/acpi/tables/data/CCEL";
pub const DEFAULT_TDEL_TABLE_PATH: &str = "/sys/firmware/acpi/tables/TDEL";
pub const DEFAULT_TDEL_DATA_PATH: &str = "/sys/firmware/acpi/tables/data/TDEL";

pub const DEFAULT_TSM_REPORT_PATH: &str = "/sys/kernel/config/tsm/report";

/// NV index the paravisor publishes the runtime data (TD report and
/// runtime claims) in.
pub const DEFAULT_RUNTIME_DATA_READ_INDEX: u32 = 0x0140_0001;
/// NV index the report data is written to before reading the runtime data.
pub const DEFAULT_RUNTIME_DATA_WRITE_INDEX: u32 = 0x0140_0002;

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct Config {
    /// configs about the firmware event log
    #[serde(default)]
    pub eventlog: EventlogConfig,

    /// configs about the TSM report quote provider
    #[serde(default)]
    pub tsm_report: TsmReportConfig,

    /// configs about the vTPM runtime data
    #[serde(default)]
    pub vtpm: VtpmConfig,
}

/// How the event log is attached to an evidence.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EventlogFormat {
    /// Truncated log area as read from the firmware.
    #[default]
    Raw,
    /// JSON of the per register event logs.
    Parsed,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct EventlogConfig {
    /// Flag whether to attach the event log to evidence
    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub format: EventlogFormat,

    /// ACPI table the log area is described by
    #[serde(default)]
    pub signature: AcpiSignature,

    /// Path of the ACPI table, defaults by signature
    pub table_path: Option<PathBuf>,

    /// Path of the log area, defaults by signature
    pub data_path: Option<PathBuf>,

    /// Raw TCG event log file. Takes precedence over the ACPI tables.
    pub file: Option<PathBuf>,
}

impl Default for EventlogConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            format: EventlogFormat::default(),
            signature: AcpiSignature::default(),
            table_path: None,
            data_path: None,
            file: None,
        }
    }
}

impl EventlogConfig {
    pub fn table_path(&self) -> PathBuf {
        self.table_path.clone().unwrap_or_else(|| match self.signature {
            AcpiSignature::Ccel => DEFAULT_CCEL_TABLE_PATH.into(),
            AcpiSignature::Tdel => DEFAULT_TDEL_TABLE_PATH.into(),
        })
    }

    pub fn data_path(&self) -> PathBuf {
        self.data_path.clone().unwrap_or_else(|| match self.signature {
            AcpiSignature::Ccel => DEFAULT_CCEL_DATA_PATH.into(),
            AcpiSignature::Tdel => DEFAULT_TDEL_DATA_PATH.into(),
        })
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct TsmReportConfig {
    /// configfs directory report entries are created in
    #[serde(default = "default_tsm_report_path")]
    pub path: PathBuf,

    /// Provider the report entry must be served by, e.g. `tdx_guest`
    pub provider: Option<String>,
}

fn default_tsm_report_path() -> PathBuf {
    DEFAULT_TSM_REPORT_PATH.into()
}

impl Default for TsmReportConfig {
    fn default() -> Self {
        Self {
            path: default_tsm_report_path(),
            provider: None,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct VtpmConfig {
    #[serde(default = "default_read_index")]
    pub runtime_data_read_index: u32,

    #[serde(default = "default_write_index")]
    pub runtime_data_write_index: u32,
}

fn default_read_index() -> u32 {
    DEFAULT_RUNTIME_DATA_READ_INDEX
}

fn default_write_index() -> u32 {
    DEFAULT_RUNTIME_DATA_WRITE_INDEX
}

impl Default for VtpmConfig {
    fn default() -> Self {
        Self {
            runtime_data_read_index: DEFAULT_RUNTIME_DATA_READ_INDEX,
            runtime_data_write_index: DEFAULT_RUNTIME_DATA_WRITE_INDEX,
        }
    }
}

impl TryFrom<&str> for Config {
    type Error = crate::Error;
    fn try_from(config_path: &str) -> crate::Result<Self> {
        let c = config::Config::builder()
            .add_source(config::File::with_name(config_path))
            .build()?;

        let cfg = c.try_deserialize()?;
        Ok(cfg)
    }
}
