//! Human-readable names for engine-internal identifiers.
//!
//! The tables are fixed process-wide data; lookups fall back to an
//! `UNKNOWN-<kind>` form that carries the stringified key so unexpected
//! identifiers stay diagnosable.

use crate::events::EventKind;
use crate::filter::{ActionType, MatchType};
use crate::guid::{
    Guid, FIELD_APP_ID, FIELD_LOCAL_INTERFACE, FIELD_LOCAL_IP, FIELD_LOCAL_PORT, FIELD_PROTOCOL,
    FIELD_REMOTE_IP, FIELD_REMOTE_PORT, LAYER_AUTH_CONNECT_V4, LAYER_AUTH_CONNECT_V6,
    LAYER_AUTH_RECV_V4, LAYER_AUTH_RECV_V6, WEIR_PROVIDER_KEY, WEIR_SUBLAYER_KEY,
};

/// A friendly display name plus the raw identifier name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedName {
    pub friendly: String,
    pub raw: String,
}

static GUID_NAMES: &[(Guid, (&str, &str))] = &[
    // Layers
    (LAYER_AUTH_CONNECT_V4, ("[Ipv4 outbound]", "LAYER_AUTH_CONNECT_V4")),
    (LAYER_AUTH_CONNECT_V6, ("[Ipv6 outbound]", "LAYER_AUTH_CONNECT_V6")),
    (LAYER_AUTH_RECV_V4, ("[Ipv4 inbound]", "LAYER_AUTH_RECV_V4")),
    (LAYER_AUTH_RECV_V6, ("[Ipv6 inbound]", "LAYER_AUTH_RECV_V6")),
    // Condition fields
    (FIELD_APP_ID, ("app_id", "FIELD_APP_ID")),
    (FIELD_LOCAL_IP, ("local_ip", "FIELD_LOCAL_IP")),
    (FIELD_LOCAL_PORT, ("local_port", "FIELD_LOCAL_PORT")),
    (FIELD_REMOTE_IP, ("remote_ip", "FIELD_REMOTE_IP")),
    (FIELD_REMOTE_PORT, ("remote_port", "FIELD_REMOTE_PORT")),
    (FIELD_PROTOCOL, ("protocol", "FIELD_PROTOCOL")),
    (FIELD_LOCAL_INTERFACE, ("local_interface", "FIELD_LOCAL_INTERFACE")),
    // Tool-owned objects
    (WEIR_PROVIDER_KEY, ("weir", "WEIR_PROVIDER_KEY")),
    (WEIR_SUBLAYER_KEY, ("weir filters", "WEIR_SUBLAYER_KEY")),
];

pub fn guid_name(key: &Guid) -> ResolvedName {
    match GUID_NAMES.iter().find(|(guid, _)| guid == key) {
        Some((_, (friendly, raw))) => ResolvedName {
            friendly: (*friendly).to_string(),
            raw: (*raw).to_string(),
        },
        None => {
            let unknown = format!("UNKNOWN-GUID: {key}");
            ResolvedName {
                friendly: unknown.clone(),
                raw: unknown,
            }
        }
    }
}

pub fn match_type_name(match_type: MatchType) -> &'static str {
    match match_type {
        MatchType::Equal => "equal",
        MatchType::Greater => "greater",
        MatchType::Less => "less than",
        MatchType::GreaterOrEqual => "greater or equal",
        MatchType::LessOrEqual => "less or equal",
        MatchType::Range => "range match",
        MatchType::NotEqual => "not equal",
        MatchType::Prefix => "prefix equal",
        MatchType::NotPrefix => "prefix not equal",
    }
}

pub fn action_name(action: ActionType) -> &'static str {
    match action {
        ActionType::Permit => "permit",
        ActionType::Block => "block",
    }
}

pub fn event_kind_name(kind: EventKind) -> &'static str {
    match kind {
        EventKind::Allow => "allow",
        EventKind::Drop => "drop",
    }
}

pub fn ip_proto_name(proto: u8) -> String {
    match proto {
        1 => "icmp".to_string(),
        2 => "igmp".to_string(),
        6 => "tcp".to_string(),
        17 => "udp".to_string(),
        58 => "ipv6 icmp".to_string(),
        other => format!("UNKNOWN-IPPROTO: {other}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_guid_resolves_both_names() {
        let name = guid_name(&LAYER_AUTH_CONNECT_V4);
        assert_eq!(name.friendly, "[Ipv4 outbound]");
        assert_eq!(name.raw, "LAYER_AUTH_CONNECT_V4");
    }

    #[test]
    fn unknown_guid_falls_back_with_the_key() {
        let stray = Guid::new(0xdead_beef, 0, 0, [0; 8]);
        let name = guid_name(&stray);
        assert!(name.friendly.starts_with("UNKNOWN-GUID: deadbeef-"));
        assert_eq!(name.friendly, name.raw);
    }

    #[test]
    fn proto_names_cover_the_common_numbers() {
        assert_eq!(ip_proto_name(6), "tcp");
        assert_eq!(ip_proto_name(58), "ipv6 icmp");
        assert_eq!(ip_proto_name(99), "UNKNOWN-IPPROTO: 99");
    }
}
