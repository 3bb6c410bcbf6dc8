use crate::error::EngineError;
use crate::events::{read_event_frame, EventStream, EventSubscription, RawClassifyEvent};
use crate::filter::{
    sort_by_weight, FilterId, FilterRecord, ProviderInfo, SublayerInfo,
};
use crate::guid::Guid;
use crate::wire::{Request, Response};
use std::fs::{File, OpenOptions};
use std::io::BufReader;
use std::os::fd::{AsRawFd, RawFd};
use std::path::Path;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, warn};

/// Control device exposed by the in-kernel filtering engine.
pub const ENGINE_DEVICE: &str = "/dev/pfe0";

/// Upper bound requested per layer enumeration.
pub const MAX_FILTERS_PER_LAYER: u32 = 5000;

/// One round-trip through the engine: the ioctl hands the serialized
/// request to the driver and the driver fills the response buffer,
/// reporting the needed size when the buffer is too small.
#[repr(C)]
struct EngineXfer {
    req: *const u8,
    req_len: usize,
    resp: *mut u8,
    resp_cap: usize,
    resp_len: usize,
}

nix::ioctl_readwrite!(pfe_transact, b'F', 0x10, EngineXfer);

/// The operations the rest of the tool consumes. `KernelEngine` talks to
/// the real engine; the `mock` feature provides an in-memory stand-in.
pub trait Engine {
    fn add(&self, filter: &FilterRecord) -> Result<FilterId, EngineError>;
    fn delete_by_id(&self, id: FilterId) -> Result<(), EngineError>;

    /// Filters installed in one layer, sorted by descending 8-bit weight
    /// (ties keep enumeration order).
    fn filters_for_layer(&self, layer: &Guid) -> Result<Vec<FilterRecord>, EngineError>;

    /// Union across several layers, in the given layer order.
    fn filters_for_layers(&self, layers: &[Guid]) -> Result<Vec<FilterRecord>, EngineError> {
        let mut all = Vec::new();
        for layer in layers {
            all.extend(self.filters_for_layer(layer)?);
        }
        Ok(all)
    }

    fn filter_by_id(&self, id: FilterId) -> Result<Option<FilterRecord>, EngineError>;
    fn sublayer_by_key(&self, key: &Guid) -> Result<Option<SublayerInfo>, EngineError>;
    fn provider_by_key(&self, key: &Guid) -> Result<Option<ProviderInfo>, EngineError>;

    /// Resolve the engine's application-identity blob for an executable.
    fn app_id_from_path(&self, path: &Path) -> Result<Vec<u8>, EngineError>;

    /// Subscribe to classification events. The subscription must be dropped
    /// before the engine value it came from.
    fn subscribe(&self) -> Result<(EventSubscription, EventStream), EngineError>;
}

/// Handle on the kernel engine. The device is held open for the lifetime of
/// the value and released on drop, whatever the exit path.
pub struct KernelEngine {
    device: File,
    path: String,
}

impl KernelEngine {
    pub fn open() -> Result<Self, EngineError> {
        Self::open_at(ENGINE_DEVICE)
    }

    pub fn open_at(path: &str) -> Result<Self, EngineError> {
        let device = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|source| EngineError::Open {
                path: path.to_string(),
                source,
            })?;
        debug!(path, "opened engine device");
        Ok(Self {
            device,
            path: path.to_string(),
        })
    }

    fn transact(&self, call: &'static str, req: &Request) -> Result<Response, EngineError> {
        transact_fd(self.device.as_raw_fd(), call, req)
    }
}

fn transact_fd(fd: RawFd, call: &'static str, req: &Request) -> Result<Response, EngineError> {
    let payload = serde_json::to_vec(req)?;
    let mut cap = 4096usize;
    loop {
        let mut buf = vec![0u8; cap];
        let mut xfer = EngineXfer {
            req: payload.as_ptr(),
            req_len: payload.len(),
            resp: buf.as_mut_ptr(),
            resp_cap: buf.len(),
            resp_len: 0,
        };
        // SAFETY: the buffers outlive the call and the lengths describe them.
        let result = unsafe { pfe_transact(fd, &mut xfer) };
        match result {
            Ok(_) => {
                buf.truncate(xfer.resp_len);
                return match serde_json::from_slice(&buf)? {
                    Response::Error { code } => Err(EngineError::Status { call, code }),
                    response => Ok(response),
                };
            }
            Err(nix::errno::Errno::ENOBUFS) => {
                // Driver reports the size it needs in resp_len.
                cap = xfer.resp_len.max(cap * 2);
            }
            Err(errno) => {
                return Err(EngineError::Status {
                    call,
                    code: errno as i32,
                })
            }
        }
    }
}

impl Engine for KernelEngine {
    fn add(&self, filter: &FilterRecord) -> Result<FilterId, EngineError> {
        match self.transact("add_filter", &Request::AddFilter(filter.clone()))? {
            Response::FilterAdded(id) => Ok(id),
            _ => Err(EngineError::Protocol { call: "add_filter" }),
        }
    }

    fn delete_by_id(&self, id: FilterId) -> Result<(), EngineError> {
        match self.transact("delete_filter", &Request::DeleteFilter(id))? {
            Response::Deleted => Ok(()),
            _ => Err(EngineError::Protocol {
                call: "delete_filter",
            }),
        }
    }

    fn filters_for_layer(&self, layer: &Guid) -> Result<Vec<FilterRecord>, EngineError> {
        let request = Request::EnumerateFilters {
            layer: *layer,
            max: MAX_FILTERS_PER_LAYER,
        };
        match self.transact("enumerate_filters", &request)? {
            Response::Filters(mut filters) => {
                sort_by_weight(&mut filters);
                Ok(filters)
            }
            _ => Err(EngineError::Protocol {
                call: "enumerate_filters",
            }),
        }
    }

    fn filter_by_id(&self, id: FilterId) -> Result<Option<FilterRecord>, EngineError> {
        match self.transact("get_filter", &Request::GetFilter(id))? {
            Response::Filter(filter) => Ok(filter),
            _ => Err(EngineError::Protocol { call: "get_filter" }),
        }
    }

    fn sublayer_by_key(&self, key: &Guid) -> Result<Option<SublayerInfo>, EngineError> {
        match self.transact("get_sublayer", &Request::GetSublayer(*key))? {
            Response::Sublayer(sublayer) => Ok(sublayer),
            _ => Err(EngineError::Protocol {
                call: "get_sublayer",
            }),
        }
    }

    fn provider_by_key(&self, key: &Guid) -> Result<Option<ProviderInfo>, EngineError> {
        match self.transact("get_provider", &Request::GetProvider(*key))? {
            Response::Provider(provider) => Ok(provider),
            _ => Err(EngineError::Protocol {
                call: "get_provider",
            }),
        }
    }

    fn app_id_from_path(&self, path: &Path) -> Result<Vec<u8>, EngineError> {
        match self.transact("app_id_from_path", &Request::AppIdFromPath(path.to_path_buf()))? {
            Response::AppId(blob) => Ok(blob),
            _ => Err(EngineError::Protocol {
                call: "app_id_from_path",
            }),
        }
    }

    fn subscribe(&self) -> Result<(EventSubscription, EventStream), EngineError> {
        // The subscription gets its own device handle so event frames do not
        // interleave with control traffic on the session handle.
        let sub_device = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&self.path)
            .map_err(|source| EngineError::Open {
                path: self.path.clone(),
                source,
            })?;
        match transact_fd(sub_device.as_raw_fd(), "subscribe", &Request::Subscribe)? {
            Response::Subscribed => {}
            _ => return Err(EngineError::Protocol { call: "subscribe" }),
        }

        let reader_device = sub_device.try_clone().map_err(EngineError::Io)?;
        let (tx, rx) = mpsc::channel(1024);
        let reader = std::thread::spawn(move || {
            let mut reader = BufReader::new(reader_device);
            loop {
                let frame = match read_event_frame(&mut reader) {
                    Ok(Some(frame)) => frame,
                    // Clean end of stream: the engine completes the pending
                    // read once the subscription is torn down.
                    Ok(None) => break,
                    Err(err) => {
                        let _ = tx.blocking_send(Err(EngineError::Io(err)));
                        break;
                    }
                };
                let event = serde_json::from_slice::<RawClassifyEvent>(&frame)
                    .map(RawClassifyEvent::decode)
                    .map_err(EngineError::Decode);
                if tx.blocking_send(event).is_err() {
                    // Receiver gone; stop reading.
                    break;
                }
            }
        });

        let subscription = EventSubscription::new(
            move || {
                if let Err(err) =
                    transact_fd(sub_device.as_raw_fd(), "unsubscribe", &Request::Unsubscribe)
                {
                    warn!("failed to unsubscribe from engine events: {err}");
                }
            },
            Some(reader),
        );
        Ok((subscription, ReceiverStream::new(rx)))
    }
}

impl Drop for KernelEngine {
    fn drop(&mut self) {
        debug!(path = %self.path, "closing engine device");
    }
}
