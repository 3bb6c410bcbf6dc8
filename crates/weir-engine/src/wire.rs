//! Request/response payloads crossing the engine control device.
//!
//! Every facade call is one serialized `Request` handed to the engine via
//! the transact ioctl, answered by one serialized `Response`. Lookups that
//! can miss answer with an `Option` rather than an error status so callers
//! can treat "not found" as data.

use crate::filter::{FilterId, FilterRecord, ProviderInfo, SublayerInfo};
use crate::guid::Guid;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Request {
    AddFilter(FilterRecord),
    DeleteFilter(FilterId),
    EnumerateFilters { layer: Guid, max: u32 },
    GetFilter(FilterId),
    GetSublayer(Guid),
    GetProvider(Guid),
    AppIdFromPath(PathBuf),
    Subscribe,
    Unsubscribe,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Response {
    FilterAdded(FilterId),
    Deleted,
    Filters(Vec<FilterRecord>),
    Filter(Option<FilterRecord>),
    Sublayer(Option<SublayerInfo>),
    Provider(Option<ProviderInfo>),
    AppId(Vec<u8>),
    Subscribed,
    Unsubscribed,
    /// Native engine status for a failed call.
    Error { code: i32 },
}
