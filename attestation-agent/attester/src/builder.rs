// Copyright (c) 2024 Alibaba Cloud
//
// SPDX-License-Identifier: Apache-2.0
//

use std::collections::{BTreeMap, BTreeSet};

use base64::{engine::general_purpose, Engine};
use log::{debug, info};

use crate::{
    gpu::GPU_ARCH,
    report_data,
    types::{GpuEvidence, QuoteEvidence},
    Error, Evidence, EvidenceAdapter, EvidenceKind, RawEvidence, Result, VerifierNonce,
};

/// Evidence of every configured adapter, keyed by its identifier.
pub type CompositeEvidence = BTreeMap<EvidenceKind, Evidence>;

/// Collects composite evidence bound to a verifier nonce and user data.
///
/// ```no_run
/// use cc_attester::{tdx::TdxAdapter, EvidenceBuilder, VerifierNonce};
///
/// # fn quote(report_data: &[u8]) -> anyhow::Result<Vec<u8>> { Ok(report_data.to_vec()) }
/// let evidence = EvidenceBuilder::new()
///     .with_adapter(TdxAdapter::new(quote))
///     .with_verifier_nonce(VerifierNonce::default())
///     .with_user_data(b"public key".to_vec())
///     .build()?;
/// let json = serde_json::to_string(&evidence)?;
/// # Ok::<(), anyhow::Error>(())
/// ```
#[derive(Default)]
pub struct EvidenceBuilder {
    adapters: Vec<Box<dyn EvidenceAdapter>>,
    verifier_nonce: Option<VerifierNonce>,
    user_data: Vec<u8>,
}

impl EvidenceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adapters run in the order they are added.
    pub fn with_adapter(mut self, adapter: impl EvidenceAdapter + 'static) -> Self {
        self.adapters.push(Box::new(adapter));
        self
    }

    pub fn with_verifier_nonce(mut self, verifier_nonce: VerifierNonce) -> Self {
        self.verifier_nonce = Some(verifier_nonce);
        self
    }

    pub fn with_user_data(mut self, user_data: impl Into<Vec<u8>>) -> Self {
        self.user_data = user_data.into();
        self
    }

    /// Collect the evidence of every adapter. The first failure aborts the
    /// whole collection. Duplicate kinds are rejected before any adapter
    /// runs.
    pub fn build(&self) -> Result<CompositeEvidence> {
        if self.adapters.is_empty() {
            return Err(Error::NoAdapters);
        }

        let mut kinds = BTreeSet::new();
        for adapter in &self.adapters {
            if !kinds.insert(adapter.kind()) {
                return Err(Error::DuplicateAdapter(adapter.kind()));
            }
        }

        let mut composite = CompositeEvidence::new();
        for adapter in &self.adapters {
            let kind = adapter.kind();
            let alg = adapter.hash_algorithm();
            let report_data =
                report_data::derive(alg, self.verifier_nonce.as_ref(), &self.user_data);
            if self.verifier_nonce.is_none() && self.user_data.is_empty() {
                debug!("{kind}: no verifier nonce or user data, report data is zeroed");
            }

            let raw = adapter.collect(&report_data)?;
            if raw.quote.is_empty() {
                return Err(Error::EmptyQuote(kind));
            }
            info!("{kind}: collected {} bytes of evidence", raw.quote.len());

            composite.insert(kind, self.assemble(kind, raw, &report_data)?);
        }

        Ok(composite)
    }

    fn assemble(&self, kind: EvidenceKind, raw: RawEvidence, report_data: &[u8]) -> Result<Evidence> {
        match kind {
            EvidenceKind::Gpu => {
                let certificate = raw.certificate.ok_or_else(|| {
                    Error::CertificateChain("GPU evidence without certificate chain".into())
                })?;

                Ok(Evidence::Gpu(GpuEvidence {
                    evidence: general_purpose::STANDARD.encode(hex::encode(&raw.quote)),
                    certificate,
                    gpu_nonce: hex::encode(report_data),
                    verifier_nonce: self.verifier_nonce.clone(),
                    arch: GPU_ARCH.to_string(),
                }))
            }
            EvidenceKind::Tdx | EvidenceKind::Tpm | EvidenceKind::Sgx => {
                Ok(Evidence::Quote(QuoteEvidence {
                    quote: raw.quote,
                    runtime_data: raw.runtime_data,
                    user_data: (!self.user_data.is_empty()).then(|| self.user_data.clone()),
                    event_log: raw.event_log,
                    verifier_nonce: self.verifier_nonce.clone(),
                }))
            }
        }
    }
}
