// Copyright (c) 2024 Alibaba Cloud
//
// SPDX-License-Identifier: Apache-2.0
//

use std::collections::HashMap;

use log::debug;

use super::{
    names::event_type_name, reader::Reader, tags::event_tags, DigestAlgorithm, RtmrData, RtmrEvent,
    RtmrEventLog, EV_NO_ACTION, MAX_DIGEST_COUNT, MAX_EVENT_SIZE,
};
use crate::{Error, Result};

// TCG_PCR_EVENT carries a single SHA-1 digest.
const SHA1_DIGEST_SIZE: usize = 20;

const MIN_REGISTER_INDEX: u32 = 1;
const MAX_REGISTER_INDEX: u32 = 4;

pub(crate) fn check_digest_count(count: u32) -> Result<()> {
    if count == 0 || count > MAX_DIGEST_COUNT {
        return Err(Error::InvalidEventLog(format!(
            "invalid digest count {count}, expected 1 to {MAX_DIGEST_COUNT}"
        )));
    }
    Ok(())
}

pub(crate) fn check_event_size(size: u32) -> Result<()> {
    if size > MAX_EVENT_SIZE {
        return Err(Error::InvalidEventLog(format!(
            "event entry with size {size} exceeds maximum size {MAX_EVENT_SIZE}"
        )));
    }
    Ok(())
}

/// Length of the legacy TCG_PCR_EVENT (the "Spec ID" event) that starts
/// every crypto agile log.
pub fn spec_id_event_len(log: &[u8]) -> Result<usize> {
    let mut reader = Reader::new(log);
    reader.u32("Spec ID event register index")?;
    let event_type = reader.u32("Spec ID event type")?;
    if event_type != EV_NO_ACTION {
        return Err(Error::InvalidEventLog(format!(
            "log starts with event type 0x{event_type:x} instead of a Spec ID event"
        )));
    }
    reader.bytes(SHA1_DIGEST_SIZE, "Spec ID event digest")?;
    let size = reader.u32("Spec ID event size")?;
    check_event_size(size)?;
    reader.bytes(size as usize, "Spec ID event data")?;

    Ok(reader.offset())
}

/// Parse a complete log, Spec ID event included.
pub fn parse_event_log(log: &[u8]) -> Result<Vec<RtmrEventLog>> {
    let header_len = spec_id_event_len(log)?;
    parse_events(&log[header_len..])
}

/// Decode TCG_PCR_EVENT2 records into one log per (register, bank), in
/// order of first appearance.
///
/// A register index outside 1..=4, the end marker included, ends the log.
pub fn parse_events(log: &[u8]) -> Result<Vec<RtmrEventLog>> {
    let mut logs: Vec<RtmrEventLog> = Vec::new();
    let mut positions: HashMap<(u32, DigestAlgorithm), usize> = HashMap::new();
    let mut reader = Reader::new(log);

    while !reader.is_empty() {
        let index = reader.u32("register index")?;
        if !(MIN_REGISTER_INDEX..=MAX_REGISTER_INDEX).contains(&index) {
            debug!(
                "register index 0x{index:x} at offset {} ends the event log",
                reader.offset() - 4
            );
            break;
        }

        let event_type = reader.u32("event type")?;
        let count = reader.u32("digest count")?;
        check_digest_count(count)?;

        let mut digests = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let alg_id = reader.u16("digest algorithm")?;
            let alg =
                DigestAlgorithm::from_alg_id(alg_id).ok_or(Error::UnsupportedAlgorithm(alg_id))?;
            let digest = reader.bytes(alg.digest_size(), "digest")?;
            digests.push((alg, hex::encode(digest)));
        }

        let size = reader.u32("event size")?;
        check_event_size(size)?;
        let payload = reader.bytes(size as usize, "event data")?;

        let type_id = format!("0x{event_type:x}");
        let type_name = event_type_name(event_type).map(str::to_string);
        let tags = event_tags(event_type, index, payload)?;

        for (bank, measurement) in digests {
            let event = RtmrEvent {
                type_id: type_id.clone(),
                type_name: type_name.clone(),
                tags: tags.clone(),
                measurement,
            };

            let position = *positions.entry((index, bank)).or_insert_with(|| {
                logs.push(RtmrEventLog {
                    rtmr: RtmrData { index, bank },
                    events: Vec::new(),
                });
                logs.len() - 1
            });
            logs[position].events.push(event);
        }
    }

    Ok(logs)
}
