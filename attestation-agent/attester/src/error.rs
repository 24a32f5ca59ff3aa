// Copyright (c) 2024 Alibaba Cloud
//
// SPDX-License-Identifier: Apache-2.0
//

use std::path::PathBuf;

use thiserror::Error;

use crate::EvidenceKind;

pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of an [`Error`]. Every error is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorClass {
    /// Malformed tables, logs or runtime data.
    Structural,
    /// Evidence that does not bind to what was requested.
    Integrity,
    /// Algorithms, devices or configurations that are not handled.
    Unsupported,
    /// Failures of the filesystem or an external collaborator.
    Io,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("ACPI table cannot be read: {0}")]
    AcpiTableRead(String),

    #[error("invalid ACPI table signature, expected {expected}, got {got}")]
    InvalidSignature { expected: String, got: String },

    #[error("invalid ACPI table length, header declares {declared}, got {actual} bytes")]
    InvalidLength { declared: u32, actual: usize },

    #[error("invalid CCEL table type {0}")]
    InvalidType(u8),

    #[error("invalid CCEL table subtype {0}")]
    InvalidSubType(u8),

    #[error("event log data too short, need at least {minimum} bytes, got {actual}")]
    DataTooShort { minimum: u64, actual: usize },

    #[error("invalid event log: {0}")]
    InvalidEventLog(String),

    #[error("unsupported digest algorithm 0x{0:x}")]
    UnsupportedAlgorithm(u16),

    #[error("invalid runtime data: {0}")]
    InvalidRuntimeData(String),

    #[error("report data in runtime data does not match the expected report data")]
    ReportDataMismatch,

    #[error("{0} adapter returned an empty quote")]
    EmptyQuote(EvidenceKind),

    #[error("certificate chain verification failed: {0}")]
    CertificateChain(String),

    #[error("unsupported GPU architecture {0}")]
    UnsupportedArchitecture(String),

    #[error("unsupported device: {0}")]
    UnsupportedDevice(String),

    #[error("invalid nonce: {0}")]
    InvalidNonce(String),

    #[error("no evidence adapter configured")]
    NoAdapters,

    #[error("more than one {0} adapter configured")]
    DuplicateAdapter(EvidenceKind),

    #[error("failed to access {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("quote generation failed")]
    Quote(#[source] anyhow::Error),

    #[error("device access failed")]
    Device(#[source] anyhow::Error),

    #[error("serialization failed")]
    Serialize(#[from] serde_json::Error),

    #[error("invalid configuration")]
    Config(#[from] config::ConfigError),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            Error::AcpiTableRead(_)
            | Error::InvalidSignature { .. }
            | Error::InvalidLength { .. }
            | Error::InvalidType(_)
            | Error::InvalidSubType(_)
            | Error::DataTooShort { .. }
            | Error::InvalidEventLog(_)
            | Error::InvalidRuntimeData(_) => ErrorClass::Structural,
            Error::ReportDataMismatch | Error::EmptyQuote(_) | Error::CertificateChain(_) => {
                ErrorClass::Integrity
            }
            Error::UnsupportedAlgorithm(_)
            | Error::UnsupportedArchitecture(_)
            | Error::UnsupportedDevice(_)
            | Error::InvalidNonce(_)
            | Error::NoAdapters
            | Error::DuplicateAdapter(_) => ErrorClass::Unsupported,
            Error::Io { .. }
            | Error::Quote(_)
            | Error::Device(_)
            | Error::Serialize(_)
            | Error::Config(_) => ErrorClass::Io,
        }
    }
}

impl From<openssl::error::ErrorStack> for Error {
    fn from(e: openssl::error::ErrorStack) -> Self {
        Error::CertificateChain(e.to_string())
    }
}
