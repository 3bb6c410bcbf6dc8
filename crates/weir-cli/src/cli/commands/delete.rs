use crate::cli::args::DeleteArgs;
use crate::exit_codes;
use anyhow::Context;
use dialoguer::{theme::ColorfulTheme, Confirm};
use weir_engine::{Engine, FilterId, AUTH_LAYERS, WEIR_PROVIDER_KEY};

pub fn run(engine: &dyn Engine, args: DeleteArgs) -> anyhow::Result<i32> {
    let bulk = args.filter.is_empty()
        || args
            .filter
            .iter()
            .any(|spec| spec == "owned" || spec == "all");

    let mut deleted = 0u32;
    if bulk {
        deleted = delete_owned(engine)?;
    } else {
        let ids = args
            .filter
            .iter()
            .map(|spec| {
                spec.parse::<FilterId>()
                    .with_context(|| format!("invalid filter id: {spec}"))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        println!("Will delete {} filters", ids.len());
        for id in ids {
            if delete_single(engine, id) {
                deleted += 1;
            }
        }
    }

    println!("Deleted {deleted} filters.");
    Ok(exit_codes::OK)
}

/// Collect every filter under the weir provider and delete after an
/// interactive confirmation that echoes the count.
fn delete_owned(engine: &dyn Engine) -> anyhow::Result<u32> {
    let owned: Vec<_> = engine
        .filters_for_layers(&AUTH_LAYERS)?
        .into_iter()
        .filter(|filter| filter.provider_key == Some(WEIR_PROVIDER_KEY))
        .collect();

    println!("This action will delete ALL weir filters");
    let confirmed = Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(format!(
            "Are you sure? (will delete {} filters)",
            owned.len()
        ))
        .default(false)
        .interact()
        .unwrap_or(false);

    let mut deleted = 0u32;
    if confirmed {
        for filter in owned {
            if delete_single(engine, filter.id) {
                deleted += 1;
            }
        }
    }
    Ok(deleted)
}

fn delete_single(engine: &dyn Engine, id: FilterId) -> bool {
    match engine.delete_by_id(id) {
        Ok(()) => {
            println!("Successfully deleted filter with id {id}.");
            true
        }
        Err(err) => {
            eprintln!("Error: Failed to delete filter with id {id}: {err}");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weir_engine::mock::MockEngine;
    use weir_engine::{
        ActionType, FilterFlags, FilterRecord, Weight, LAYER_AUTH_CONNECT_V4, WEIR_SUBLAYER_KEY,
    };

    fn install(engine: &MockEngine) -> FilterId {
        engine
            .add(&FilterRecord {
                id: 0,
                name: "weir".to_string(),
                provider_key: Some(WEIR_PROVIDER_KEY),
                sublayer_key: WEIR_SUBLAYER_KEY,
                layer_key: LAYER_AUTH_CONNECT_V4,
                action: ActionType::Permit,
                weight: Weight::U8(10),
                flags: FilterFlags::PERSISTENT_INDEXED,
                conditions: Vec::new(),
            })
            .expect("mock add")
    }

    #[test]
    fn explicit_ids_are_deleted_without_confirmation() {
        let engine = MockEngine::new();
        let id = install(&engine);

        let args = DeleteArgs {
            filter: vec![id.to_string()],
        };
        assert_eq!(run(&engine, args).unwrap(), exit_codes::OK);
        assert!(engine.installed().is_empty());
    }

    #[test]
    fn unparseable_ids_are_cli_errors() {
        let engine = MockEngine::new();
        install(&engine);

        let args = DeleteArgs {
            filter: vec!["banana".to_string()],
        };
        assert!(run(&engine, args).is_err());
        // Nothing was deleted on the error path.
        assert_eq!(engine.installed().len(), 1);
    }

    #[test]
    fn deleting_a_missing_id_counts_as_a_failure_but_continues() {
        let engine = MockEngine::new();
        let id = install(&engine);

        let args = DeleteArgs {
            filter: vec!["9999".to_string(), id.to_string()],
        };
        assert_eq!(run(&engine, args).unwrap(), exit_codes::OK);
        assert!(engine.installed().is_empty());
    }
}
