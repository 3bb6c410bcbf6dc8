use crate::guid::Guid;
use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, Ipv6Addr};

/// Identifier the engine assigns to an installed filter.
pub type FilterId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionType {
    Permit,
    Block,
}

/// Filter priority as the engine stores it. Only the 8-bit form is ever
/// installed by this tool, but enumeration can surface the other kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Weight {
    /// Priority managed by the engine itself.
    Auto,
    U8(u8),
    U64(u64),
}

impl Weight {
    /// The 8-bit view used for ordering. `Auto` and the 64-bit kind fall
    /// back to 0 here; dereferencing the wide form during enumeration is
    /// not reliable, so ordering sticks to the narrow view.
    pub fn effective_u8(&self) -> u8 {
        match self {
            Weight::U8(w) => *w,
            Weight::Auto | Weight::U64(_) => 0,
        }
    }
}

/// How a condition value is compared against traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchType {
    Equal,
    Greater,
    Less,
    GreaterOrEqual,
    LessOrEqual,
    Range,
    NotEqual,
    Prefix,
    NotPrefix,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConditionValue {
    Uint8(u8),
    Uint16(u16),
    /// IPv4 network as address plus full mask.
    V4AddrMask { addr: Ipv4Addr, mask: u32 },
    /// IPv6 network as address plus prefix length.
    V6AddrMask { addr: Ipv6Addr, prefix_len: u8 },
    /// Opaque blob, e.g. an application identity.
    ByteBlob(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCondition {
    pub field: Guid,
    pub match_type: MatchType,
    pub value: ConditionValue,
}

impl FilterCondition {
    pub fn equal(field: Guid, value: ConditionValue) -> Self {
        Self {
            field,
            match_type: MatchType::Equal,
            value,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FilterFlags {
    /// Filter survives engine restarts.
    pub persistent: bool,
    /// Engine keeps the filter in its fast lookup index.
    pub indexed: bool,
}

impl FilterFlags {
    pub const PERSISTENT_INDEXED: FilterFlags = FilterFlags {
        persistent: true,
        indexed: true,
    };
}

/// An engine-ready filter. `id` is 0 until the engine assigns one on `add`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterRecord {
    pub id: FilterId,
    /// Display data shown when the filter is printed.
    pub name: String,
    pub provider_key: Option<Guid>,
    pub sublayer_key: Guid,
    pub layer_key: Guid,
    pub action: ActionType,
    pub weight: Weight,
    pub flags: FilterFlags,
    pub conditions: Vec<FilterCondition>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderInfo {
    pub key: Guid,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SublayerInfo {
    pub key: Guid,
    pub name: String,
}

/// Order filters the way the engine evaluates them: descending 8-bit
/// weight, ties kept in enumeration order.
pub fn sort_by_weight(filters: &mut [FilterRecord]) {
    filters.sort_by(|a, b| b.weight.effective_u8().cmp(&a.weight.effective_u8()));
}
