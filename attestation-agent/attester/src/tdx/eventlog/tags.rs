// Copyright (c) 2024 Alibaba Cloud
//
// SPDX-License-Identifier: Apache-2.0
//

//! Human readable tags carried in event payloads.

use super::reader::Reader;
use crate::{Error, Result};

const EV_POST_CODE: u32 = 0x1;
const EV_NO_ACTION: u32 = 0x3;
const EV_ACTION: u32 = 0x5;
const EV_S_CRTM_CONTENTS: u32 = 0x7;
const EV_PLATFORM_CONFIG_FLAGS: u32 = 0xA;
const EV_COMPACT_HASH: u32 = 0xC;
const EV_IPL: u32 = 0xD;
const EV_OMIT_BOOT_DEVICE_EVENTS: u32 = 0x12;
const EV_EFI_VARIABLE_DRIVER_CONFIG: u32 = 0x8000_0001;
const EV_EFI_VARIABLE_BOOT: u32 = 0x8000_0002;
const EV_EFI_ACTION: u32 = 0x8000_0007;
const EV_EFI_PLATFORM_FIRMWARE_BLOB2: u32 = 0x8000_000A;
const EV_EFI_HANDOFF_TABLES2: u32 = 0x8000_000B;
const EV_EFI_VARIABLE_BOOT2: u32 = 0x8000_000C;
const EV_EFI_HCRTM_EVENT: u32 = 0x8000_0010;
const EV_EFI_VARIABLE_AUTHORITY: u32 = 0x8000_00E0;

// EV_COMPACT_HASH only carries a string when measured into this register.
const COMPACT_HASH_STRING_REGISTER: u32 = 6;

// VariableName GUID, UnicodeNameLength and VariableDataLength
const UEFI_VARIABLE_HEADER_SIZE: usize = 32;

/// Tags of one event, with non printable characters removed.
pub(crate) fn event_tags(event_type: u32, register: u32, payload: &[u8]) -> Result<Vec<String>> {
    let tag = match event_type {
        EV_EFI_VARIABLE_DRIVER_CONFIG
        | EV_EFI_VARIABLE_BOOT
        | EV_EFI_VARIABLE_BOOT2
        | EV_EFI_VARIABLE_AUTHORITY => Some(uefi_variable_name(payload)?),
        // EV_EFI_HANDOFF_TABLES2 shares the sized description layout of
        // UEFI_PLATFORM_FIRMWARE_BLOB2.
        EV_EFI_PLATFORM_FIRMWARE_BLOB2 | EV_EFI_HANDOFF_TABLES2 => Some(blob_description(payload)?),
        // EV_S_CRTM_CONTENTS is a firmware blob in the profile, but firmware
        // in the field records a plain string.
        EV_IPL
        | EV_POST_CODE
        | EV_ACTION
        | EV_EFI_ACTION
        | EV_PLATFORM_CONFIG_FLAGS
        | EV_OMIT_BOOT_DEVICE_EVENTS
        | EV_EFI_HCRTM_EVENT
        | EV_S_CRTM_CONTENTS => descriptive_string(payload),
        EV_COMPACT_HASH if register == COMPACT_HASH_STRING_REGISTER => descriptive_string(payload),
        EV_NO_ACTION => no_action_string(payload),
        _ => None,
    };

    Ok(tag.map(|tag| vec![printable(&tag)]).unwrap_or_default())
}

fn uefi_variable_name(payload: &[u8]) -> Result<String> {
    let mut reader = Reader::new(payload);
    reader.bytes(16, "UEFI variable GUID")?;
    let name_len = reader.u64("UEFI variable name length")?;
    let data_len = reader.u64("UEFI variable data length")?;

    let available = (payload.len() - UEFI_VARIABLE_HEADER_SIZE) as u64;
    let required = name_len
        .checked_mul(2)
        .and_then(|name_size| name_size.checked_add(data_len));
    if !matches!(required, Some(required) if required <= available) {
        return Err(Error::InvalidEventLog(format!(
            "UEFI variable declares a {name_len} character name and {data_len} bytes of data, \
             but only {available} bytes follow"
        )));
    }

    let name: Vec<u16> = reader
        .bytes(name_len as usize * 2, "UEFI variable name")?
        .chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .collect();

    Ok(String::from_utf16_lossy(&name))
}

fn blob_description(payload: &[u8]) -> Result<String> {
    let mut reader = Reader::new(payload);
    let len = reader.u8("blob description size")?;
    let description = reader.bytes(len as usize, "blob description")?;

    Ok(String::from_utf8_lossy(description).into_owned())
}

// Payloads often carry bytes after a NUL terminated string. A payload that
// starts with NUL has no tag.
fn descriptive_string(payload: &[u8]) -> Option<String> {
    match payload.iter().position(|b| *b == 0) {
        Some(0) => None,
        Some(nul) => Some(String::from_utf8_lossy(&payload[..nul]).into_owned()),
        None => Some(String::from_utf8_lossy(payload).into_owned()),
    }
}

// "StartupLocality\0\x03" becomes "StartupLocality3".
fn no_action_string(payload: &[u8]) -> Option<String> {
    match payload.iter().position(|b| *b == 0) {
        Some(0) => None,
        Some(nul) => {
            let mut tag = String::from_utf8_lossy(&payload[..nul]).into_owned();
            if let Some(value) = payload.get(nul + 1) {
                tag.push_str(&value.to_string());
            }
            Some(tag)
        }
        None => Some(String::from_utf8_lossy(payload).into_owned()),
    }
}

// Format (Cf), private use (Co) and unassigned (Cn) code points that are
// not caught by `char::is_control` or `char::is_whitespace`. Unassigned
// code points are covered for the noncharacters and unassigned planes.
const NON_PRINTABLE_RANGES: &[(u32, u32)] = &[
    (0x00AD, 0x00AD),
    (0x0600, 0x0605),
    (0x061C, 0x061C),
    (0x06DD, 0x06DD),
    (0x070F, 0x070F),
    (0x0890, 0x0891),
    (0x08E2, 0x08E2),
    (0x180E, 0x180E),
    (0x200B, 0x200F),
    (0x202A, 0x202E),
    (0x2060, 0x206F),
    (0xE000, 0xF8FF),
    (0xFDD0, 0xFDEF),
    (0xFEFF, 0xFEFF),
    (0xFFF0, 0xFFFB),
    (0x110BD, 0x110BD),
    (0x110CD, 0x110CD),
    (0x13430, 0x1343F),
    (0x1BCA0, 0x1BCA3),
    (0x1D173, 0x1D17A),
    (0x40000, 0xDFFFF),
    (0xE0000, 0xE00FF),
    (0xE01F0, 0x10FFFF),
];

/// Printable in the sense of Go's `unicode.IsPrint`: graphic characters and
/// the ASCII space.
fn is_printable(c: char) -> bool {
    if c == ' ' {
        return true;
    }
    if c.is_control() || c.is_whitespace() {
        return false;
    }

    let code = c as u32;
    // Noncharacters at the end of every plane
    if code & 0xFFFE == 0xFFFE {
        return false;
    }
    !NON_PRINTABLE_RANGES
        .iter()
        .any(|(first, last)| (*first..=*last).contains(&code))
}

fn printable(tag: &str) -> String {
    tag.chars().filter(|c| is_printable(*c)).collect()
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::super::testing::{uefi_variable, uefi_variable_with_lengths};
    use super::*;

    #[rstest]
    #[case(EV_IPL, 9, b"Grub Cmdline\0junk".to_vec(), vec!["Grub Cmdline"])]
    #[case(EV_IPL, 9, b"\0".to_vec(), vec![])]
    #[case(EV_IPL, 9, b"grub_cmd linux /vmlinuz".to_vec(), vec!["grub_cmd linux /vmlinuz"])]
    #[case(EV_EFI_ACTION, 1, b"Calling EFI Application from Boot Option".to_vec(), vec!["Calling EFI Application from Boot Option"])]
    #[case(EV_POST_CODE, 1, b"\tPOST\r\nCODE\x7f".to_vec(), vec!["POSTCODE"])]
    #[case(EV_EFI_ACTION, 1, "Boot\u{200B}Order\u{202E}\u{FEFF}".as_bytes().to_vec(), vec!["BootOrder"])]
    #[case(EV_IPL, 9, "a\u{00A0}b\u{2028}c\u{E000}d\u{00AD}e".as_bytes().to_vec(), vec!["abcde"])]
    #[case(EV_IPL, 9, "grub \u{00E9}t\u{00E9} \u{FFFD}".as_bytes().to_vec(), vec!["grub \u{00E9}t\u{00E9} \u{FFFD}"])]
    #[case(EV_COMPACT_HASH, 6, b"WBCL".to_vec(), vec!["WBCL"])]
    #[case(EV_COMPACT_HASH, 1, b"WBCL".to_vec(), vec![])]
    #[case(EV_NO_ACTION, 1, b"StartupLocality\0\x03".to_vec(), vec!["StartupLocality3"])]
    #[case(EV_NO_ACTION, 1, b"StartupLocality\0".to_vec(), vec!["StartupLocality"])]
    #[case(EV_NO_ACTION, 1, b"\0\x03".to_vec(), vec![])]
    #[case(EV_EFI_PLATFORM_FIRMWARE_BLOB2, 1, b"\x09DXEFV_BLOBjunk".to_vec(), vec!["DXEFV_BLO"])]
    #[case(EV_EFI_HANDOFF_TABLES2, 1, b"\x0aACPI DATA1".to_vec(), vec!["ACPI DATA1"])]
    #[case(0x8000_0003, 2, b"anything".to_vec(), vec![])]
    fn tags(
        #[case] event_type: u32,
        #[case] register: u32,
        #[case] payload: Vec<u8>,
        #[case] expected: Vec<&str>,
    ) {
        assert_eq!(event_tags(event_type, register, &payload).unwrap(), expected);
    }

    #[rstest]
    #[case(EV_EFI_VARIABLE_DRIVER_CONFIG)]
    #[case(EV_EFI_VARIABLE_BOOT)]
    #[case(EV_EFI_VARIABLE_BOOT2)]
    #[case(EV_EFI_VARIABLE_AUTHORITY)]
    fn uefi_variable_tag(#[case] event_type: u32) {
        let payload = uefi_variable("BootOrder", &[0, 0, 1, 0]);
        assert_eq!(event_tags(event_type, 1, &payload).unwrap(), vec!["BootOrder"]);
    }

    #[rstest]
    #[case(6, 0)]
    #[case(5, 1)]
    #[case(u64::MAX, 0)]
    #[case(1, u64::MAX)]
    #[case(u64::MAX / 2 + 1, 0)]
    fn oversized_uefi_variable(#[case] name_len: u64, #[case] data_len: u64) {
        let name: Vec<u16> = "Boot".encode_utf16().collect();
        let payload = uefi_variable_with_lengths(&name, name_len, &[0xaa; 2], data_len);

        let err = event_tags(EV_EFI_VARIABLE_BOOT, 1, &payload).unwrap_err();
        assert!(matches!(err, Error::InvalidEventLog(_)));
    }

    #[rstest]
    #[case(EV_EFI_VARIABLE_BOOT, vec![0; 20])]
    #[case(EV_EFI_PLATFORM_FIRMWARE_BLOB2, vec![])]
    #[case(EV_EFI_PLATFORM_FIRMWARE_BLOB2, b"\x20short".to_vec())]
    fn truncated_payload(#[case] event_type: u32, #[case] payload: Vec<u8>) {
        let err = event_tags(event_type, 1, &payload).unwrap_err();
        assert!(matches!(err, Error::InvalidEventLog(_)));
    }
}
