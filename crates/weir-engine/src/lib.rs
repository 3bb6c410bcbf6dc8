//! Typed facade over the kernel packet filtering engine.
//!
//! The engine itself lives in the kernel and is reached through a control
//! device; this crate owns the handle lifecycle, the request/response
//! protocol, filter enumeration, and the classification-event subscription.
//! Everything user-facing (friendly names, display formats) also lives here
//! so callers print engine objects consistently.

mod error;
mod events;
mod filter;
mod guid;
mod names;
mod print;
mod session;
mod wire;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use error::EngineError;
pub use events::{ClassifyEvent, EventKind, EventStream, EventSubscription};
pub use filter::{
    ActionType, ConditionValue, FilterCondition, FilterFlags, FilterId, FilterRecord, MatchType,
    ProviderInfo, SublayerInfo, Weight,
};
pub use guid::{
    Guid, AUTH_LAYERS, FIELD_APP_ID, FIELD_LOCAL_INTERFACE, FIELD_LOCAL_IP, FIELD_LOCAL_PORT,
    FIELD_PROTOCOL, FIELD_REMOTE_IP, FIELD_REMOTE_PORT, LAYER_AUTH_CONNECT_V4,
    LAYER_AUTH_CONNECT_V6, LAYER_AUTH_RECV_V4, LAYER_AUTH_RECV_V6, WEIR_PROVIDER_KEY,
    WEIR_SUBLAYER_KEY, ZERO_GUID,
};
pub use names::{guid_name, ip_proto_name, ResolvedName};
pub use session::{Engine, KernelEngine, ENGINE_DEVICE, MAX_FILTERS_PER_LAYER};
