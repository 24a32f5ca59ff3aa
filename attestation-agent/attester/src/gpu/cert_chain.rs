// Copyright (c) 2024 Alibaba Cloud
//
// SPDX-License-Identifier: Apache-2.0
//

use base64::{engine::general_purpose, Engine};
use openssl::{
    stack::Stack,
    x509::{store::X509StoreBuilder, X509StoreContext, X509},
};

use crate::{Error, Result};

/// Certificates ordered from the leaf to the trust root.
#[derive(Clone, Debug)]
pub struct CertChain {
    certs: Vec<X509>,
}

impl CertChain {
    /// Parse concatenated PEM certificates.
    pub fn from_pem(pem: &[u8]) -> Result<Self> {
        let certs = X509::stack_from_pem(pem)
            .map_err(|e| Error::CertificateChain(format!("failed to parse PEM chain: {e}")))?;
        Ok(Self { certs })
    }

    pub fn len(&self) -> usize {
        self.certs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.certs.is_empty()
    }

    /// Validate the leaf against the last certificate as the only trust
    /// anchor, every other certificate being an untrusted intermediate.
    pub fn verify(&self) -> Result<()> {
        let Some((root, _)) = self.certs.split_last() else {
            return Err(Error::CertificateChain("empty certificate chain".into()));
        };
        if self.certs.len() < 2 {
            return Err(Error::CertificateChain(format!(
                "a chain needs at least 2 certificates, got {}",
                self.certs.len()
            )));
        }

        let mut store = X509StoreBuilder::new()?;
        store.add_cert(root.clone())?;
        let store = store.build();

        let mut intermediates = Stack::new()?;
        for cert in &self.certs[..self.certs.len() - 1] {
            intermediates.push(cert.clone())?;
        }

        let mut context = X509StoreContext::new()?;
        let verified = context.init(&store, &self.certs[0], &intermediates, |c| {
            if c.verify_cert()? {
                Ok(Ok(()))
            } else {
                Ok(Err(c.error()))
            }
        })?;

        verified.map_err(|e| Error::CertificateChain(e.error_string().to_string()))
    }

    /// Base64 of the PEM encoded chain.
    pub fn to_base64(&self) -> Result<String> {
        let mut pem = Vec::new();
        for cert in &self.certs {
            pem.extend_from_slice(&cert.to_pem()?);
        }

        Ok(general_purpose::STANDARD.encode(pem))
    }
}
