//! Lowering: walk a validated ruleset and turn each rule into one or more
//! engine-ready filter records.
//!
//! A single rule fans out along two axes. Layer fan-out first: the
//! direction picks connect vs receive, and the rule's address families pick
//! the v4 and/or v6 variant. Then value fan-out: multiple values for the
//! same field become multiple records (never repeated conditions within one
//! record), in canonical field order with authoring order preserved.

use crate::ast::{Action, Direction, FilterRule, IpAddresses, IpVersion, Ruleset, Transport};
use tracing::debug;
use weir_engine::{
    ActionType, ConditionValue, Engine, EngineError, FilterCondition, FilterFlags, FilterRecord,
    Guid, Weight, FIELD_APP_ID, FIELD_LOCAL_IP, FIELD_LOCAL_PORT, FIELD_PROTOCOL,
    FIELD_REMOTE_IP, FIELD_REMOTE_PORT, LAYER_AUTH_CONNECT_V4, LAYER_AUTH_CONNECT_V6,
    LAYER_AUTH_RECV_V4, LAYER_AUTH_RECV_V6, WEIR_PROVIDER_KEY, WEIR_SUBLAYER_KEY,
};

/// Priority for filters installed from rule files.
pub const RULE_WEIGHT: u8 = 10;

const PROTO_TCP: u8 = 6;
const PROTO_UDP: u8 = 17;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InstallSummary {
    /// Rules in the source ruleset.
    pub rules: usize,
    /// Filter records accepted by the engine.
    pub installed: usize,
    /// Rules or records the engine rejected.
    pub failed: usize,
}

/// Lower one rule into its engine records, in installation order.
pub fn lower_filter(
    rule: &FilterRule,
    engine: &dyn Engine,
) -> Result<Vec<FilterRecord>, EngineError> {
    let display_name = engine
        .provider_by_key(&WEIR_PROVIDER_KEY)?
        .map(|provider| provider.name)
        .unwrap_or_else(|| "weir".to_string());

    let conditions = &rule.conditions;
    let app_id = match &conditions.source_app {
        Some(path) => Some(engine.app_id_from_path(std::path::Path::new(path))?),
        None => None,
    };

    let action = match rule.action {
        Action::Permit => ActionType::Permit,
        Action::Block => ActionType::Block,
    };

    let mut records = Vec::new();
    for layer in layers_for(rule) {
        let v4_layer = layer == LAYER_AUTH_CONNECT_V4 || layer == LAYER_AUTH_RECV_V4;

        // Canonical field order: source-app, source-ip, source-port,
        // dest-ip, dest-port, transport. The DSL's "from" is the local
        // endpoint and "to" the remote endpoint.
        let slots = vec![
            app_id
                .iter()
                .map(|blob| {
                    FilterCondition::equal(FIELD_APP_ID, ConditionValue::ByteBlob(blob.clone()))
                })
                .collect(),
            ip_conditions(&conditions.source_ips, v4_layer, FIELD_LOCAL_IP),
            port_conditions(&conditions.source_ports, FIELD_LOCAL_PORT),
            ip_conditions(&conditions.dest_ips, v4_layer, FIELD_REMOTE_IP),
            port_conditions(&conditions.dest_ports, FIELD_REMOTE_PORT),
            transport_condition(conditions.transport)
                .into_iter()
                .collect(),
        ];

        for combo in fan_out(slots) {
            records.push(FilterRecord {
                id: 0,
                name: display_name.clone(),
                provider_key: Some(WEIR_PROVIDER_KEY),
                sublayer_key: WEIR_SUBLAYER_KEY,
                layer_key: layer,
                action,
                weight: Weight::U8(RULE_WEIGHT),
                flags: FilterFlags::PERSISTENT_INDEXED,
                conditions: combo,
            });
        }
    }
    Ok(records)
}

/// Lower and submit an entire ruleset, in ruleset order. Rules the engine
/// rejects are reported and counted; the rest still install.
pub fn install_ruleset(ruleset: &Ruleset, engine: &dyn Engine) -> InstallSummary {
    let mut summary = InstallSummary {
        rules: ruleset.filters.len(),
        ..InstallSummary::default()
    };

    for rule in &ruleset.filters {
        println!("Adding rule: {rule}");

        let records = match lower_filter(rule, engine) {
            Ok(records) => records,
            Err(err) => {
                eprintln!("Warning: could not lower rule: {err}");
                summary.failed += 1;
                continue;
            }
        };

        for record in records {
            match engine.add(&record) {
                Ok(id) => {
                    debug!(id, layer = %record.layer_key, "installed filter");
                    summary.installed += 1;
                }
                Err(err) => {
                    eprintln!("Error: failed to add filter: {err}");
                    summary.failed += 1;
                }
            }
        }
    }

    summary
}

/// Which layers a rule lands in. The v4 variant is used when the rule is
/// v4-only, has v4 addresses, or constrains no addresses at all; the v6
/// variant needs an explicit v6 signal (version or addresses).
fn layers_for(rule: &FilterRule) -> Vec<Guid> {
    let conditions = &rule.conditions;
    let has_v4 = !conditions.source_ips.v4.is_empty() || !conditions.dest_ips.v4.is_empty();
    let has_v6 = !conditions.source_ips.v6.is_empty() || !conditions.dest_ips.v6.is_empty();
    let unconstrained = !has_v4 && !has_v6;

    let want_v4 = match conditions.ip_version {
        IpVersion::V4Only => true,
        IpVersion::V6Only => false,
        IpVersion::BothV4V6 => has_v4 || unconstrained,
    };
    let want_v6 = match conditions.ip_version {
        IpVersion::V6Only => true,
        IpVersion::V4Only => false,
        IpVersion::BothV4V6 => has_v6,
    };

    let (v4_layer, v6_layer) = match rule.direction {
        Direction::Out => (LAYER_AUTH_CONNECT_V4, LAYER_AUTH_CONNECT_V6),
        Direction::In => (LAYER_AUTH_RECV_V4, LAYER_AUTH_RECV_V6),
    };

    let mut layers = Vec::new();
    if want_v4 {
        layers.push(v4_layer);
    }
    if want_v6 {
        layers.push(v6_layer);
    }
    layers
}

fn ip_conditions(ips: &IpAddresses, v4_layer: bool, field: Guid) -> Vec<FilterCondition> {
    if v4_layer {
        ips.v4
            .iter()
            .map(|net| {
                FilterCondition::equal(
                    field,
                    ConditionValue::V4AddrMask {
                        addr: net.addr(),
                        mask: u32::from(net.netmask()),
                    },
                )
            })
            .collect()
    } else {
        ips.v6
            .iter()
            .map(|net| {
                FilterCondition::equal(
                    field,
                    ConditionValue::V6AddrMask {
                        addr: net.addr(),
                        prefix_len: net.prefix_len(),
                    },
                )
            })
            .collect()
    }
}

fn port_conditions(ports: &[u16], field: Guid) -> Vec<FilterCondition> {
    ports
        .iter()
        .map(|port| FilterCondition::equal(field, ConditionValue::Uint16(*port)))
        .collect()
}

fn transport_condition(transport: Transport) -> Option<FilterCondition> {
    let proto = match transport {
        Transport::All => return None,
        Transport::Tcp => PROTO_TCP,
        Transport::Udp => PROTO_UDP,
    };
    Some(FilterCondition::equal(
        FIELD_PROTOCOL,
        ConditionValue::Uint8(proto),
    ))
}

/// Cartesian fan-out over per-field condition slots. Empty slots constrain
/// nothing; earlier slots iterate outermost so authoring order determines
/// record order. With every slot empty this yields one unconditioned combo.
fn fan_out(slots: Vec<Vec<FilterCondition>>) -> Vec<Vec<FilterCondition>> {
    let mut combos: Vec<Vec<FilterCondition>> = vec![Vec::new()];
    for slot in slots {
        if slot.is_empty() {
            continue;
        }
        let mut next = Vec::with_capacity(combos.len() * slot.len());
        for combo in &combos {
            for condition in &slot {
                let mut extended = combo.clone();
                extended.push(condition.clone());
                next.push(extended);
            }
        }
        combos = next;
    }
    combos
}
