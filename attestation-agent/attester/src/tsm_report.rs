// Copyright (c) 2024 Alibaba Cloud
//
// SPDX-License-Identifier: Apache-2.0
//

//! Quotes through the Linux TSM_REPORTS configfs interface.
//!
//! Each quote uses its own report entry, created as a directory under the
//! configfs root and removed again when the quote has been read.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use log::debug;

use crate::{config::TsmReportConfig, QuoteProvider};

pub struct TsmReportQuoteProvider {
    root: PathBuf,
    provider: Option<String>,
}

impl TsmReportQuoteProvider {
    pub fn new(root: impl Into<PathBuf>, provider: Option<String>) -> Self {
        Self {
            root: root.into(),
            provider,
        }
    }

    pub fn from_config(config: &TsmReportConfig) -> Self {
        Self::new(&config.path, config.provider.clone())
    }
}

fn read_generation(entry: &Path) -> Result<u64> {
    fs::read_to_string(entry.join("generation"))
        .context("failed to read report generation")?
        .trim()
        .parse::<u64>()
        .context("failed to parse report generation")
}

impl QuoteProvider for TsmReportQuoteProvider {
    fn get_quote(&self, report_data: &[u8]) -> Result<Vec<u8>> {
        if !self.root.exists() {
            bail!(
                "TSM report configfs not found at {}. Is TSM_REPORTS enabled in the kernel?",
                self.root.display()
            );
        }

        let entry = tempfile::Builder::new()
            .prefix("cc-attester")
            .tempdir_in(&self.root)
            .context("failed to create TSM report entry")?;

        if let Some(expected) = &self.provider {
            let provider = fs::read_to_string(entry.path().join("provider"))
                .context("failed to read TSM report provider")?;
            if provider.trim() != expected {
                bail!(
                    "TSM report provider is {}, expected {expected}",
                    provider.trim()
                );
            }
        }

        fs::write(entry.path().join("inblob"), report_data)
            .context("failed to write TSM report inblob")?;
        let generation = read_generation(entry.path())?;

        let quote =
            fs::read(entry.path().join("outblob")).context("failed to read TSM report outblob")?;

        // Another writer to the same entry invalidates the quote.
        let current = read_generation(entry.path())?;
        if current != generation {
            bail!("TSM report entry was modified while reading the quote: generation {generation} became {current}");
        }

        debug!("TSM report returned a {} byte quote", quote.len());
        Ok(quote)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_configfs() {
        let dir = tempfile::tempdir().unwrap();
        let provider = TsmReportQuoteProvider::new(dir.path().join("report"), None);
        let err = provider.get_quote(&[0; 64]).unwrap_err();
        assert!(err.to_string().contains("configfs not found"));
    }

    #[test]
    fn entry_without_outblob() {
        let dir = tempfile::tempdir().unwrap();
        let provider = TsmReportQuoteProvider::new(dir.path(), None);
        let err = provider.get_quote(&[0; 64]).unwrap_err();
        assert!(err.to_string().contains("generation"));
        // The report entry is removed afterwards.
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn provider_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let provider = TsmReportQuoteProvider::new(dir.path(), Some("tdx_guest".into()));
        let err = provider.get_quote(&[0; 64]).unwrap_err();
        assert!(err.to_string().contains("provider"));
    }
}
