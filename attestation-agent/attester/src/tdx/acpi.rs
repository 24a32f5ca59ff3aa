// Copyright (c) 2024 Alibaba Cloud
//
// SPDX-License-Identifier: Apache-2.0
//

//! ACPI tables describing the confidential computing event log area.

use log::debug;
use scroll::{Pread, LE};
use serde::Deserialize;
use strum::{AsRefStr, Display};

use super::eventlog::{
    check_digest_count, check_event_size, reader::Reader, spec_id_event_len, DigestAlgorithm,
    EVENT_LOG_END,
};
use crate::{Error, Result};

pub const CCEL_TABLE_SIZE: usize = 56;

const CCEL_TYPE_TDX: u8 = 2;
const CCEL_SUBTYPE: u8 = 0;

// Highest register index accepted while scanning the log area.
const MAX_SCANNED_REGISTER_INDEX: u32 = 3;

#[derive(AsRefStr, Display, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AcpiSignature {
    /// Confidential Computing Event Log
    #[default]
    #[strum(serialize = "CCEL")]
    Ccel,
    /// TD Event Log of early TDX firmware
    #[strum(serialize = "TDEL")]
    Tdel,
}

impl AcpiSignature {
    fn tag(&self) -> &'static [u8; 4] {
        match self {
            AcpiSignature::Ccel => b"CCEL",
            AcpiSignature::Tdel => b"TDEL",
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Pread)]
pub struct AcpiTableHeader {
    pub signature: [u8; 4],
    pub length: u32,
    pub revision: u8,
    pub checksum: u8,
    pub oem_id: [u8; 6],
    pub oem_table_id: [u8; 8],
    pub oem_revision: u32,
    pub asl_compiler_id: [u8; 4],
    pub asl_compiler_revision: u32,
}

/// CCEL table. In TDEL tables the type and subtype bytes are reserved.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pread)]
pub struct CcelTable {
    pub header: AcpiTableHeader,
    pub cc_type: u8,
    pub cc_subtype: u8,
    pub reserved: u16,
    pub log_area_minimum_length: u64,
    pub log_area_start_address: u64,
}

/// Decode and validate the table read from the ACPI tables directory.
pub fn read_table(table: &[u8], signature: AcpiSignature) -> Result<CcelTable> {
    if table.len() < CCEL_TABLE_SIZE {
        return Err(Error::AcpiTableRead(format!(
            "table holds {} bytes, expected {CCEL_TABLE_SIZE}",
            table.len()
        )));
    }

    let parsed: CcelTable = table
        .pread_with(0, LE)
        .map_err(|e: scroll::Error| Error::AcpiTableRead(e.to_string()))?;

    if &parsed.header.signature != signature.tag() {
        return Err(Error::InvalidSignature {
            expected: signature.to_string(),
            got: String::from_utf8_lossy(&parsed.header.signature).into_owned(),
        });
    }

    if parsed.header.length as usize != table.len() {
        return Err(Error::InvalidLength {
            declared: parsed.header.length,
            actual: table.len(),
        });
    }

    if signature == AcpiSignature::Ccel {
        if parsed.cc_type != CCEL_TYPE_TDX {
            return Err(Error::InvalidType(parsed.cc_type));
        }

        if parsed.cc_subtype != CCEL_SUBTYPE {
            return Err(Error::InvalidSubType(parsed.cc_subtype));
        }
    }

    debug!(
        "{signature} table: log area at 0x{:x}, minimum length 0x{:x}",
        parsed.log_area_start_address, parsed.log_area_minimum_length
    );
    Ok(parsed)
}

/// Check that the log area is at least as long as the table requires.
pub fn read_data<'a>(table: &CcelTable, data: &'a [u8]) -> Result<&'a [u8]> {
    if (data.len() as u64) < table.log_area_minimum_length {
        return Err(Error::DataTooShort {
            minimum: table.log_area_minimum_length,
            actual: data.len(),
        });
    }

    Ok(data)
}

/// Scan TCG_PCR_EVENT2 records up to the end marker (counted in the
/// returned length) or the end of `log`.
pub fn scan_length(log: &[u8]) -> Result<usize> {
    let mut reader = Reader::new(log);

    while !reader.is_empty() {
        let index = reader.u32("register index")?;
        if index == EVENT_LOG_END {
            break;
        }

        if index > MAX_SCANNED_REGISTER_INDEX {
            return Err(Error::InvalidEventLog(format!(
                "invalid register index {index} at offset {}",
                reader.offset() - 4
            )));
        }

        reader.u32("event type")?;
        let count = reader.u32("digest count")?;
        check_digest_count(count)?;

        for _ in 0..count {
            let alg_id = reader.u16("digest algorithm")?;
            let alg = DigestAlgorithm::from_alg_id(alg_id).ok_or_else(|| {
                Error::InvalidEventLog(format!("unsupported digest algorithm 0x{alg_id:x}"))
            })?;
            reader.bytes(alg.digest_size(), "digest")?;
        }

        let size = reader.u32("event size")?;
        check_event_size(size)?;
        reader.bytes(size as usize, "event data")?;
    }

    Ok(reader.offset())
}

/// Length of the events in a log area, from the Spec ID event to the end
/// marker. The rest of the area is padding.
pub fn content_length(log: &[u8]) -> Result<usize> {
    let header_len = spec_id_event_len(log)?;
    Ok(header_len + scan_length(&log[header_len..])?)
}
