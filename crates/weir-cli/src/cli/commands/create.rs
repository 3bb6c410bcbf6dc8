use crate::cli::args::CreateArgs;
use crate::exit_codes;
use std::path::Path;
use weir_engine::{
    ActionType, ConditionValue, Engine, FilterCondition, FilterFlags, FilterRecord, Weight,
    FIELD_APP_ID, LAYER_AUTH_CONNECT_V4, WEIR_PROVIDER_KEY, WEIR_SUBLAYER_KEY,
};

/// Application the demo filter is conditioned on.
const DEMO_APP_PATH: &str = "/usr/bin/curl";

/// Weight reserved for demo filters, distinct from loaded rules.
const DEMO_WEIGHT: u8 = 5;

/// Install a fixed demo filter: permit the demo application on the
/// v4-connect layer. Handy for verifying the engine plumbing end to end.
pub fn run(engine: &dyn Engine, _args: CreateArgs) -> anyhow::Result<i32> {
    println!("Trying to add a demo filter to the engine");

    let name = engine
        .provider_by_key(&WEIR_PROVIDER_KEY)?
        .map(|provider| provider.name)
        .unwrap_or_else(|| "weir".to_string());
    let app_id = engine.app_id_from_path(Path::new(DEMO_APP_PATH))?;

    let record = FilterRecord {
        id: 0,
        name,
        provider_key: Some(WEIR_PROVIDER_KEY),
        sublayer_key: WEIR_SUBLAYER_KEY,
        layer_key: LAYER_AUTH_CONNECT_V4,
        action: ActionType::Permit,
        weight: Weight::U8(DEMO_WEIGHT),
        flags: FilterFlags::PERSISTENT_INDEXED,
        conditions: vec![FilterCondition::equal(
            FIELD_APP_ID,
            ConditionValue::ByteBlob(app_id),
        )],
    };

    let id = engine.add(&record)?;
    println!("Created filter with id {id}.");
    Ok(exit_codes::OK)
}

#[cfg(test)]
mod tests {
    use super::*;
    use weir_engine::mock::MockEngine;

    #[test]
    fn demo_filter_is_a_weight_five_app_permit() {
        let engine = MockEngine::new();
        assert_eq!(run(&engine, CreateArgs {}).unwrap(), exit_codes::OK);

        let installed = engine.installed();
        assert_eq!(installed.len(), 1);

        let record = &installed[0];
        assert_eq!(record.layer_key, LAYER_AUTH_CONNECT_V4);
        assert_eq!(record.action, ActionType::Permit);
        assert_eq!(record.weight, Weight::U8(DEMO_WEIGHT));
        assert_eq!(record.conditions.len(), 1);
        assert_eq!(record.conditions[0].field, FIELD_APP_ID);
    }
}
