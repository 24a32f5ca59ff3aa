// Copyright (c) 2024 Alibaba Cloud
//
// SPDX-License-Identifier: Apache-2.0
//

//! Builders of event logs and ACPI tables for tests.

pub const SHA256: u16 = 0xb;
pub const SHA384: u16 = 0xc;
pub const SHA512: u16 = 0xd;
pub const SM3_256: u16 = 0x12;

/// A digest of `alg` filled with `fill`. Unknown algorithms get 20 bytes.
pub fn digest(alg: u16, fill: u8) -> (u16, Vec<u8>) {
    let len = match alg {
        SHA256 | SM3_256 => 32,
        SHA384 => 48,
        SHA512 => 64,
        _ => 20,
    };
    (alg, vec![fill; len])
}

pub struct LogBuilder {
    buf: Vec<u8>,
}

impl LogBuilder {
    /// A log starting with a Spec ID event.
    pub fn new() -> Self {
        let mut buf = Vec::new();
        let spec_id = b"Spec ID Event03\0";
        buf.extend_from_slice(&0u32.to_le_bytes());
        buf.extend_from_slice(&0x3u32.to_le_bytes());
        buf.extend_from_slice(&[0; 20]);
        buf.extend_from_slice(&(spec_id.len() as u32).to_le_bytes());
        buf.extend_from_slice(spec_id);
        Self { buf }
    }

    /// A bare stream of records.
    pub fn records() -> Self {
        Self { buf: Vec::new() }
    }

    pub fn event(
        self,
        index: u32,
        event_type: u32,
        digests: Vec<(u16, Vec<u8>)>,
        payload: &[u8],
    ) -> Self {
        let size = payload.len() as u32;
        self.event_with_size(index, event_type, digests, size, payload)
    }

    /// An event whose declared size may disagree with its payload.
    pub fn event_with_size(
        mut self,
        index: u32,
        event_type: u32,
        digests: Vec<(u16, Vec<u8>)>,
        size: u32,
        payload: &[u8],
    ) -> Self {
        self.buf.extend_from_slice(&index.to_le_bytes());
        self.buf.extend_from_slice(&event_type.to_le_bytes());
        self.buf
            .extend_from_slice(&(digests.len() as u32).to_le_bytes());
        for (alg, digest) in digests {
            self.buf.extend_from_slice(&alg.to_le_bytes());
            self.buf.extend_from_slice(&digest);
        }
        self.buf.extend_from_slice(&size.to_le_bytes());
        self.buf.extend_from_slice(payload);
        self
    }

    pub fn raw(mut self, bytes: &[u8]) -> Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    /// Append the end marker.
    pub fn end(self) -> Self {
        self.raw(&[0xff; 4])
    }

    pub fn build(self) -> Vec<u8> {
        self.buf
    }
}

fn acpi_table(signature: &[u8; 4], cc_type: u8, cc_subtype: u8, minimum_length: u64) -> Vec<u8> {
    let mut table = Vec::with_capacity(56);
    table.extend_from_slice(signature);
    table.extend_from_slice(&56u32.to_le_bytes());
    table.push(1);
    table.push(0);
    table.extend_from_slice(b"INTEL ");
    table.extend_from_slice(b"EDK2    ");
    table.extend_from_slice(&2u32.to_le_bytes());
    table.extend_from_slice(b"    ");
    table.extend_from_slice(&0x0100_0013u32.to_le_bytes());
    table.push(cc_type);
    table.push(cc_subtype);
    table.extend_from_slice(&0u16.to_le_bytes());
    table.extend_from_slice(&minimum_length.to_le_bytes());
    table.extend_from_slice(&0x7e8d_0000u64.to_le_bytes());
    table
}

/// A CCEL table of a TDX guest.
pub fn ccel_table(minimum_length: u64) -> Vec<u8> {
    acpi_table(b"CCEL", 2, 0, minimum_length)
}

/// A legacy TDEL table, whose type bytes are reserved.
pub fn tdel_table(minimum_length: u64) -> Vec<u8> {
    acpi_table(b"TDEL", 0, 0, minimum_length)
}

/// Payload of an EFI variable event.
pub fn uefi_variable(name: &str, data: &[u8]) -> Vec<u8> {
    let name: Vec<u16> = name.encode_utf16().collect();
    uefi_variable_with_lengths(&name, name.len() as u64, data, data.len() as u64)
}

pub fn uefi_variable_with_lengths(
    name: &[u16],
    name_len: u64,
    data: &[u8],
    data_len: u64,
) -> Vec<u8> {
    let mut payload = vec![0x61; 16];
    payload.extend_from_slice(&name_len.to_le_bytes());
    payload.extend_from_slice(&data_len.to_le_bytes());
    for c in name {
        payload.extend_from_slice(&c.to_le_bytes());
    }
    payload.extend_from_slice(data);
    payload
}
