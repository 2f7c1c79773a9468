//! Device descriptor
//!
//! Identity and limits of the remote device, captured from the unsolicited
//! handshake frame and owned by the session for its lifetime.

use std::fmt;

use crate::error::{CoralError, Result};
use crate::protocol::RawResponse;

/// Operational limits a device reports during handshake
#[derive(Debug, Clone, Copy)]
pub struct Limits {
    /// Longest key the device accepts, in bytes
    pub max_key_size: u32,

    /// Largest value the device accepts, in bytes
    pub max_value_size: u32,

    /// Most keys a single range page may return
    pub max_key_range_count: u32,
}

/// Information about a remote device, immutable once captured
#[derive(Debug, Clone)]
pub struct Device {
    /// Cluster version to echo on every command
    pub cluster_version: i64,

    /// Connection id the device assigned to this session
    pub connection_id: i64,

    /// World-wide-name identifier
    pub wwn: String,

    pub limits: Limits,
}

impl Device {
    /// Extract the descriptor from a decoded handshake frame
    pub fn from_handshake(raw: &RawResponse) -> Result<Device> {
        let header = &raw.command.header;

        let report = raw
            .command
            .body
            .get_log
            .as_ref()
            .ok_or_else(|| CoralError::Handshake("handshake carried no device report".into()))?;

        let configuration = report
            .configuration
            .as_ref()
            .ok_or_else(|| CoralError::Handshake("handshake carried no configuration".into()))?;

        let limits = report
            .limits
            .as_ref()
            .ok_or_else(|| CoralError::Handshake("handshake carried no limits".into()))?;

        Ok(Device {
            cluster_version: header.cluster_version,
            connection_id: header.connection_id,
            wwn: String::from_utf8_lossy(&configuration.world_wide_name).into_owned(),
            limits: Limits {
                max_key_size: limits.max_key_size,
                max_value_size: limits.max_value_size,
                max_key_range_count: limits.max_key_range_count,
            },
        })
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Device {}", self.wwn)
    }
}
