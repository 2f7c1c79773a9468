//! Device discovery
//!
//! Devices announce themselves as JSON datagrams on a multicast group. The
//! listener runs on a background thread and invokes a callback per parsed
//! announcement; malformed datagrams are logged and skipped.

use std::net::{Ipv4Addr, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use serde::Deserialize;

use crate::error::Result;

/// Multicast group devices announce on
pub const DEFAULT_GROUP: Ipv4Addr = Ipv4Addr::new(239, 1, 2, 3);

/// Port devices announce on
pub const DEFAULT_PORT: u16 = 8123;

/// One network interface of an announced device
#[derive(Debug, Clone, Deserialize)]
pub struct NetworkInterface {
    pub name: String,
    pub ipv4_addr: Option<String>,
    pub ipv6_addr: Option<String>,
    pub mac_addr: Option<String>,
}

/// A device self-announcement
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceAnnouncement {
    pub world_wide_name: String,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub firmware_version: Option<String>,
    pub serial_number: Option<String>,
    pub protocol_version: Option<String>,
    pub port: Option<u16>,
    #[serde(rename = "tlsPort")]
    pub tls_port: Option<u16>,
    #[serde(default)]
    pub network_interfaces: Vec<NetworkInterface>,
}

/// Background listener for device announcements
pub struct Discovery {
    stopping: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Discovery {
    /// Listen on the default multicast group and port
    pub fn listen<F>(on_device: F) -> Result<Discovery>
    where
        F: FnMut(DeviceAnnouncement) + Send + 'static,
    {
        Self::listen_on(DEFAULT_GROUP, DEFAULT_PORT, on_device)
    }

    /// Join `group` and invoke `on_device` for every announcement received
    pub fn listen_on<F>(group: Ipv4Addr, port: u16, mut on_device: F) -> Result<Discovery>
    where
        F: FnMut(DeviceAnnouncement) + Send + 'static,
    {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, port))?;
        socket.join_multicast_v4(&group, &Ipv4Addr::UNSPECIFIED)?;
        // Short poll interval so stop() is honored promptly
        socket.set_read_timeout(Some(Duration::from_millis(250)))?;

        let stopping = Arc::new(AtomicBool::new(false));
        let thread_stopping = Arc::clone(&stopping);
        let thread_socket = socket;

        let handle = std::thread::Builder::new()
            .name("coralkv-discovery".into())
            .spawn(move || {
                let mut buf = vec![0u8; 64 * 1024];
                loop {
                    if thread_stopping.load(Ordering::SeqCst) {
                        return;
                    }
                    let n = match thread_socket.recv_from(&mut buf) {
                        Ok((n, _)) => n,
                        Err(ref e)
                            if e.kind() == std::io::ErrorKind::WouldBlock
                                || e.kind() == std::io::ErrorKind::TimedOut =>
                        {
                            continue
                        }
                        Err(e) => {
                            if !thread_stopping.load(Ordering::SeqCst) {
                                tracing::warn!(error = %e, "discovery listener stopped");
                            }
                            return;
                        }
                    };

                    match serde_json::from_slice::<DeviceAnnouncement>(&buf[..n]) {
                        Ok(announcement) => on_device(announcement),
                        Err(e) => {
                            tracing::debug!(error = %e, "ignoring malformed announcement");
                        }
                    }
                }
            })?;

        Ok(Discovery {
            stopping,
            handle: Some(handle),
        })
    }

    /// Stop listening and join the background thread
    pub fn stop(mut self) {
        self.stopping.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Discovery {
    fn drop(&mut self) {
        self.stopping.store(true, Ordering::SeqCst);
        // Socket closes with the struct; the thread exits on its next poll
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
