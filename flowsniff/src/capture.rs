use std::{
    io, mem,
    os::fd::{AsRawFd, FromRawFd, OwnedFd},
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
    },
};

use anyhow::{anyhow, Result};
use chrono::Local;
use flowsniff_core::RawFrame;
use log::{info, warn};
use tokio::sync::mpsc::{self, error::TrySendError};

use crate::util;

const ETH_P_ALL: u16 = 0x0003;
const BUFFER_SIZE: usize = 65535;

/// Anything that yields captured frames in arrival order.
pub trait FrameSource: Send {
    fn name(&self) -> &str;

    /// `Ok(None)` when nothing arrived before the read timeout.
    fn next_frame(&mut self) -> io::Result<Option<RawFrame>>;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn next_frame(&mut self) -> io::Result<Option<RawFrame>> {
        (**self).next_frame()
    }
}

/// AF_PACKET raw socket bound to one interface.
pub struct RawSocket {
    fd: OwnedFd,
    buffer: Vec<u8>,
    iface: String,
}

impl RawSocket {
    pub fn open(iface: &str) -> Result<Self> {
        let fd = unsafe {
            libc::socket(
                libc::AF_PACKET,
                libc::SOCK_RAW,
                (ETH_P_ALL as u32).to_be() as i32,
            )
        };
        if fd < 0 {
            return Err(anyhow!(
                "socket(AF_PACKET) failed: {}",
                io::Error::last_os_error()
            ));
        }
        let fd = unsafe { OwnedFd::from_raw_fd(fd) };

        let mut sll: libc::sockaddr_ll = unsafe { mem::zeroed() };
        sll.sll_family = libc::AF_PACKET as u16;
        sll.sll_protocol = ETH_P_ALL.to_be();
        sll.sll_ifindex = util::if_index(iface)? as i32;

        let ret = unsafe {
            libc::bind(
                fd.as_raw_fd(),
                &sll as *const libc::sockaddr_ll as *const libc::sockaddr,
                mem::size_of::<libc::sockaddr_ll>() as libc::socklen_t,
            )
        };
        if ret < 0 {
            return Err(anyhow!(
                "bind(AF_PACKET, {}) failed: {}",
                iface,
                io::Error::last_os_error()
            ));
        }

        // wake up regularly so the reader can notice a stop request
        let timeout = libc::timeval {
            tv_sec: 0,
            tv_usec: 500_000,
        };
        let ret = unsafe {
            libc::setsockopt(
                fd.as_raw_fd(),
                libc::SOL_SOCKET,
                libc::SO_RCVTIMEO,
                &timeout as *const libc::timeval as *const libc::c_void,
                mem::size_of::<libc::timeval>() as libc::socklen_t,
            )
        };
        if ret < 0 {
            warn!(
                "SO_RCVTIMEO failed on {}: {}",
                iface,
                io::Error::last_os_error()
            );
        }

        Ok(Self {
            fd,
            buffer: vec![0u8; BUFFER_SIZE],
            iface: iface.to_owned(),
        })
    }
}

impl FrameSource for RawSocket {
    fn name(&self) -> &str {
        &self.iface
    }

    fn next_frame(&mut self) -> io::Result<Option<RawFrame>> {
        // MSG_TRUNC reports the full frame length even when it did not fit
        let n = unsafe {
            libc::recv(
                self.fd.as_raw_fd(),
                self.buffer.as_mut_ptr() as *mut libc::c_void,
                self.buffer.len(),
                libc::MSG_TRUNC,
            )
        };
        if n < 0 {
            let err = io::Error::last_os_error();
            return match err.kind() {
                io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::Interrupted => {
                    Ok(None)
                }
                _ => Err(err),
            };
        }

        let wire_len = n as usize;
        let data = self.buffer[..wire_len.min(self.buffer.len())].to_vec();
        Ok(Some(RawFrame {
            data,
            captured_len: wire_len,
            timestamp: Local::now(),
        }))
    }
}

/// What acquisition does when the frame queue is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueuePolicy {
    Block,
    Drop,
}

/// Moves frames from `source` into the queue until the stop flag is set,
/// the consumer goes away, or the source fails.
pub fn pump<S: FrameSource>(
    mut source: S,
    tx: mpsc::Sender<RawFrame>,
    policy: QueuePolicy,
    stop: Arc<AtomicBool>,
    dropped: Arc<AtomicU64>,
) -> io::Result<()> {
    info!("start capturing on {}", source.name());

    while !stop.load(Ordering::Relaxed) {
        let frame = match source.next_frame()? {
            Some(frame) => frame,
            None => continue,
        };

        match policy {
            QueuePolicy::Block => {
                if tx.blocking_send(frame).is_err() {
                    break;
                }
            }
            QueuePolicy::Drop => match tx.try_send(frame) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    dropped.fetch_add(1, Ordering::Relaxed);
                }
                Err(TrySendError::Closed(_)) => break,
            },
        }
    }

    info!("stop capturing on {}", source.name());
    Ok(())
}
