// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/fogbarn

//! Error types for parsing and configuration boundaries
//!
//! The streaming core never fails: unknown devices are ignored and empty
//! windows simply produce no aggregate. Errors only surface where text from
//! outside the process is turned into typed values.

/// Errors raised while parsing identifiers or validating configuration
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FogError {
    #[error("Unknown sensor type: {0}")]
    UnknownSensorType(String),

    #[error("Unknown device status: {0}")]
    UnknownDeviceStatus(String),

    #[error("Unknown aggregation window: {0}")]
    UnknownWindow(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result alias for fallible parsing and validation
pub type FogResult<T> = std::result::Result<T, FogError>;
