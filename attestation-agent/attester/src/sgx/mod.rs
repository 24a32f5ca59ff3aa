// Copyright (c) 2024 Alibaba Cloud
//
// SPDX-License-Identifier: Apache-2.0
//

use crate::{Error, EvidenceAdapter, EvidenceKind, QuoteProvider, RawEvidence, Result};

pub const SGX_REPORT_DATA_SIZE: usize = 64;

/// Evidence of an SGX enclave. The quote provider wraps the enclave's
/// report function and the quoting enclave.
pub struct SgxAdapter {
    quote_provider: Box<dyn QuoteProvider>,
}

impl SgxAdapter {
    pub fn new(quote_provider: impl QuoteProvider + 'static) -> Self {
        Self {
            quote_provider: Box::new(quote_provider),
        }
    }
}

impl EvidenceAdapter for SgxAdapter {
    fn kind(&self) -> EvidenceKind {
        EvidenceKind::Sgx
    }

    fn collect(&self, report_data: &[u8]) -> Result<RawEvidence> {
        if report_data.len() != SGX_REPORT_DATA_SIZE {
            return Err(Error::InvalidNonce(format!(
                "SGX report data must be {SGX_REPORT_DATA_SIZE} bytes, got {}",
                report_data.len()
            )));
        }

        let quote = self
            .quote_provider
            .get_quote(report_data)
            .map_err(Error::Quote)?;

        Ok(RawEvidence {
            quote,
            ..Default::default()
        })
    }
}
