use crate::error::EngineError;
use crate::filter::FilterId;
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::thread::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;

/// What the engine decided for the classified connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    Allow,
    Drop,
}

/// Endpoint addresses as the engine puts them on the wire. IPv4 words are
/// the raw network-order value read out of the packet header.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RawAddrs {
    V4 { local: u32, remote: u32 },
    V6 { local: [u8; 16], remote: [u8; 16] },
}

/// Classification event exactly as delivered by the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawClassifyEvent {
    pub kind: EventKind,
    pub filter_id: FilterId,
    pub ip_protocol: u8,
    pub addrs: RawAddrs,
    pub local_port: u16,
    pub remote_port: u16,
    pub app_id: Vec<u8>,
}

impl RawClassifyEvent {
    /// Normalize to host-order address types.
    pub fn decode(self) -> ClassifyEvent {
        let (local, remote) = match self.addrs {
            RawAddrs::V4 { local, remote } => (
                IpAddr::V4(Ipv4Addr::from(u32::from_be(local))),
                IpAddr::V4(Ipv4Addr::from(u32::from_be(remote))),
            ),
            RawAddrs::V6 { local, remote } => (
                IpAddr::V6(Ipv6Addr::from(local)),
                IpAddr::V6(Ipv6Addr::from(remote)),
            ),
        };
        ClassifyEvent {
            kind: self.kind,
            filter_id: self.filter_id,
            ip_protocol: self.ip_protocol,
            local,
            local_port: self.local_port,
            remote,
            remote_port: self.remote_port,
            app_id: self.app_id,
        }
    }
}

/// A decoded classification event.
#[derive(Debug, Clone)]
pub struct ClassifyEvent {
    pub kind: EventKind,
    pub filter_id: FilterId,
    pub ip_protocol: u8,
    pub local: IpAddr,
    pub local_port: u16,
    pub remote: IpAddr,
    pub remote_port: u16,
    pub app_id: Vec<u8>,
}

/// Events flow from the engine-owned reader thread into an async stream the
/// monitor command can `select!` over.
pub type EventStream = ReceiverStream<Result<ClassifyEvent, EngineError>>;

/// Live event subscription. Dropping it tears the subscription down and
/// joins the reader thread; callers must drop it before the engine session
/// it came from.
pub struct EventSubscription {
    teardown: Option<Box<dyn FnOnce() + Send>>,
    reader: Option<JoinHandle<()>>,
}

impl EventSubscription {
    pub(crate) fn new(
        teardown: impl FnOnce() + Send + 'static,
        reader: Option<JoinHandle<()>>,
    ) -> Self {
        Self {
            teardown: Some(Box::new(teardown)),
            reader,
        }
    }
}

impl Drop for EventSubscription {
    fn drop(&mut self) {
        if let Some(teardown) = self.teardown.take() {
            teardown();
        }
        if let Some(reader) = self.reader.take() {
            let _ = reader.join();
        }
    }
}

/// Read one length-prefixed event frame off the subscription handle.
/// Returns `None` on a clean end of stream (the engine completes pending
/// reads once the subscription is torn down).
pub(crate) fn read_event_frame(reader: &mut impl Read) -> std::io::Result<Option<Vec<u8>>> {
    let mut len = [0u8; 4];
    let mut filled = 0;
    while filled < len.len() {
        match reader.read(&mut len[filled..])? {
            0 if filled == 0 => return Ok(None),
            0 => return Err(std::io::ErrorKind::UnexpectedEof.into()),
            n => filled += n,
        }
    }
    let mut payload = vec![0u8; u32::from_le_bytes(len) as usize];
    reader.read_exact(&mut payload)?;
    Ok(Some(payload))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn v4_words_are_normalized_to_host_order() {
        // 1.2.3.4 sits on the wire in network order regardless of host.
        let raw = RawClassifyEvent {
            kind: EventKind::Allow,
            filter_id: 9,
            ip_protocol: 6,
            addrs: RawAddrs::V4 {
                local: u32::from_ne_bytes([192, 168, 1, 5]),
                remote: u32::from_ne_bytes([1, 2, 3, 4]),
            },
            local_port: 50000,
            remote_port: 443,
            app_id: Vec::new(),
        };
        let event = raw.decode();
        assert_eq!(event.local, "192.168.1.5".parse::<IpAddr>().unwrap());
        assert_eq!(event.remote, "1.2.3.4".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn v6_addresses_pass_through() {
        let addr: Ipv6Addr = "fe80::1".parse().unwrap();
        let raw = RawClassifyEvent {
            kind: EventKind::Drop,
            filter_id: 1,
            ip_protocol: 17,
            addrs: RawAddrs::V6 {
                local: addr.octets(),
                remote: addr.octets(),
            },
            local_port: 53,
            remote_port: 53,
            app_id: Vec::new(),
        };
        assert_eq!(raw.decode().local, IpAddr::V6(addr));
    }

    #[test]
    fn frame_reader_handles_clean_eof() {
        let mut empty: &[u8] = &[];
        assert!(read_event_frame(&mut empty).unwrap().is_none());

        let mut framed: &[u8] = &[3, 0, 0, 0, b'a', b'b', b'c'];
        assert_eq!(read_event_frame(&mut framed).unwrap().unwrap(), b"abc");
    }

    #[test]
    fn truncated_frame_is_an_error() {
        let mut truncated: &[u8] = &[8, 0, 0, 0, 1, 2];
        assert!(read_event_frame(&mut truncated).is_err());
    }
}
