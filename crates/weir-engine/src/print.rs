//! Display implementations for engine objects.
//!
//! Everything the CLI prints about filters, conditions and events is
//! canonicalized here through the name tables so output stays uniform.

use crate::events::ClassifyEvent;
use crate::filter::{ConditionValue, FilterCondition, FilterRecord, Weight};
use crate::names::{action_name, event_kind_name, guid_name, ip_proto_name, match_type_name};
use std::fmt;
use std::net::Ipv4Addr;
use std::path::Path;

impl fmt::Display for FilterRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.weight {
            Weight::Auto => write!(f, "[Id: {}] [Weight(auto): engine]", self.id)?,
            Weight::U8(w) => write!(f, "[Id: {}] [Weight(8u): {:2}]", self.id, w)?,
            Weight::U64(w) => write!(f, "[Id: {}] [Weight(64u): {:2}]", self.id, w)?,
        }

        write!(
            f,
            " {:>8} {} ",
            action_name(self.action),
            guid_name(&self.layer_key).friendly
        )?;

        if self.conditions.is_empty() {
            write!(f, "None")?;
        } else {
            for (index, condition) in self.conditions.iter().enumerate() {
                if index > 0 {
                    write!(f, " ")?;
                }
                write!(f, "{condition}")?;
            }
        }

        Ok(())
    }
}

impl fmt::Display for FilterCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<{} {} ",
            guid_name(&self.field).friendly,
            match_type_name(self.match_type)
        )?;

        match &self.value {
            ConditionValue::Uint8(v) => write!(f, "{v}")?,
            ConditionValue::Uint16(v) => write!(f, "{v}")?,
            ConditionValue::V4AddrMask { addr, mask } => {
                write!(f, "{addr} / {}", Ipv4Addr::from(*mask))?;
            }
            ConditionValue::V6AddrMask { addr, prefix_len } => {
                write!(f, "{addr} / {prefix_len}")?;
            }
            ConditionValue::ByteBlob(blob) => {
                write!(f, "{}", String::from_utf8_lossy(blob))?;
            }
        }

        write!(f, ">")
    }
}

impl fmt::Display for ClassifyEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[protocol: {}] [FilterId: {}] {} {} {}:{} -> {}:{}",
            ip_proto_name(self.ip_protocol),
            self.filter_id,
            event_kind_name(self.kind),
            app_basename(&self.app_id),
            self.local,
            self.local_port,
            self.remote,
            self.remote_port,
        )
    }
}

/// Clip an application-identity blob to the executable's base name.
fn app_basename(app_id: &[u8]) -> String {
    let full = String::from_utf8_lossy(app_id);
    Path::new(full.as_ref())
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| full.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;
    use crate::filter::{ActionType, FilterFlags, MatchType};
    use crate::guid::{FIELD_REMOTE_IP, LAYER_AUTH_CONNECT_V4, WEIR_SUBLAYER_KEY};

    #[test]
    fn unconditioned_filter_prints_none() {
        let record = FilterRecord {
            id: 12,
            name: "weir".to_string(),
            provider_key: None,
            sublayer_key: WEIR_SUBLAYER_KEY,
            layer_key: LAYER_AUTH_CONNECT_V4,
            action: ActionType::Permit,
            weight: Weight::U8(10),
            flags: FilterFlags::default(),
            conditions: Vec::new(),
        };
        assert_eq!(
            record.to_string(),
            "[Id: 12] [Weight(8u): 10]   permit [Ipv4 outbound] None"
        );
    }

    #[test]
    fn v4_condition_prints_dotted_mask() {
        let condition = FilterCondition {
            field: FIELD_REMOTE_IP,
            match_type: MatchType::Equal,
            value: ConditionValue::V4AddrMask {
                addr: "192.168.0.0".parse().unwrap(),
                mask: 0xFFFF_0000,
            },
        };
        assert_eq!(
            condition.to_string(),
            "<remote_ip equal 192.168.0.0 / 255.255.0.0>"
        );
    }

    #[test]
    fn event_line_clips_the_app_path() {
        let event = ClassifyEvent {
            kind: EventKind::Allow,
            filter_id: 44,
            ip_protocol: 6,
            local: "10.0.0.2".parse().unwrap(),
            local_port: 51000,
            remote: "1.1.1.1".parse().unwrap(),
            remote_port: 443,
            app_id: b"/usr/bin/curl".to_vec(),
        };
        assert_eq!(
            event.to_string(),
            "[protocol: tcp] [FilterId: 44] allow curl 10.0.0.2:51000 -> 1.1.1.1:443"
        );
    }
}
