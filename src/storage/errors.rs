//! Slot file error types
//!
//! Error codes:
//! - STORAGE_IO_ERROR (ERROR)
//! - STORAGE_WRITE_FAILED (ERROR)
//! - STORAGE_READ_FAILED (ERROR)
//! - STORAGE_DATA_CORRUPTION (FATAL)
//! - STORAGE_SCHEMA_MISMATCH (FATAL)

use std::fmt;
use std::io;

/// Severity levels for storage errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Operation fails, store continues
    Error,
    /// The store must not open or continue on this file
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Storage-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageErrorCode {
    /// Disk I/O failure outside a read or append
    IoError,
    /// Append or fsync failed
    WriteFailed,
    /// Read failed
    ReadFailed,
    /// Checksum, framing or header failure
    DataCorruption,
    /// File was written for a different record layout
    SchemaMismatch,
}

impl StorageErrorCode {
    /// Returns the stable string code
    pub fn code(&self) -> &'static str {
        match self {
            StorageErrorCode::IoError => "STORAGE_IO_ERROR",
            StorageErrorCode::WriteFailed => "STORAGE_WRITE_FAILED",
            StorageErrorCode::ReadFailed => "STORAGE_READ_FAILED",
            StorageErrorCode::DataCorruption => "STORAGE_DATA_CORRUPTION",
            StorageErrorCode::SchemaMismatch => "STORAGE_SCHEMA_MISMATCH",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        match self {
            StorageErrorCode::IoError | StorageErrorCode::WriteFailed | StorageErrorCode::ReadFailed => {
                Severity::Error
            }
            StorageErrorCode::DataCorruption | StorageErrorCode::SchemaMismatch => Severity::Fatal,
        }
    }
}

impl fmt::Display for StorageErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Storage error with code, message and optional context
#[derive(Debug)]
pub struct StorageError {
    code: StorageErrorCode,
    message: String,
    details: Option<String>,
    source: Option<io::Error>,
}

impl StorageError {
    fn with_code(code: StorageErrorCode, message: impl Into<String>, source: Option<io::Error>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
            source,
        }
    }

    pub fn io_error(message: impl Into<String>, source: io::Error) -> Self {
        Self::with_code(StorageErrorCode::IoError, message, Some(source))
    }

    pub fn write_failed(message: impl Into<String>, source: io::Error) -> Self {
        Self::with_code(StorageErrorCode::WriteFailed, message, Some(source))
    }

    /// Write failure with no underlying I/O error, e.g. an injected fault
    pub fn write_rejected(message: impl Into<String>) -> Self {
        Self::with_code(StorageErrorCode::WriteFailed, message, None)
    }

    pub fn read_failed(message: impl Into<String>, source: io::Error) -> Self {
        Self::with_code(StorageErrorCode::ReadFailed, message, Some(source))
    }

    pub fn data_corruption(message: impl Into<String>) -> Self {
        Self::with_code(StorageErrorCode::DataCorruption, message, None)
    }

    /// Corruption found while scanning, at a byte offset
    pub fn corruption_at_offset(offset: u64, reason: impl Into<String>) -> Self {
        Self {
            details: Some(format!("byte_offset: {}", offset)),
            ..Self::data_corruption(reason)
        }
    }

    /// Corruption found while decoding the record for one slot
    pub fn corruption_for_slot(slot: u32, reason: impl Into<String>) -> Self {
        Self {
            details: Some(format!("slot: {}", slot)),
            ..Self::data_corruption(reason)
        }
    }

    pub fn schema_mismatch(expected_fields: usize, found_fields: usize) -> Self {
        Self::with_code(
            StorageErrorCode::SchemaMismatch,
            format!(
                "slot file holds {} fields per record, schema defines {}",
                found_fields, expected_fields
            ),
            None,
        )
    }

    pub fn code(&self) -> StorageErrorCode {
        self.code
    }

    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn details(&self) -> Option<&str> {
        self.details.as_deref()
    }

    /// Whether the file must not be used further
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.code.severity(), self.code.code(), self.message)?;
        if let Some(ref details) = self.details {
            write!(f, " ({})", details)?;
        }
        Ok(())
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
