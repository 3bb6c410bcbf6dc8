use crate::cli::args::ListArgs;
use crate::exit_codes;
use crate::selector::Selector;
use std::collections::BTreeMap;
use weir_engine::{guid_name, Engine, FilterRecord, Guid, AUTH_LAYERS, WEIR_PROVIDER_KEY};

pub fn run(engine: &dyn Engine, args: ListArgs) -> anyhow::Result<i32> {
    // The literal pattern 'all' means unrestricted output.
    let unrestricted = args.search.iter().any(|pattern| pattern == "all");
    let selector = if unrestricted {
        Selector::empty()
    } else {
        Selector::new(&args.search)?
    };
    let layer_selector = Selector::new(&args.layer)?;

    let mut total = 0usize;
    for layer_key in AUTH_LAYERS {
        let layer_name = guid_name(&layer_key);
        if !layer_selector.selects([layer_name.friendly.as_str(), layer_name.raw.as_str()]) {
            continue;
        }

        // Per-layer failures are warnings; the rest of the layers still
        // get enumerated.
        let filters = match engine.filters_for_layer(&layer_key) {
            Ok(filters) => filters,
            Err(err) => {
                eprintln!("Warning: could not enumerate {}: {err}", layer_name.raw);
                continue;
            }
        };
        tracing::debug!(layer = %layer_name.raw, count = filters.len(), "enumerated layer");

        let mut by_sublayer: BTreeMap<Guid, Vec<FilterRecord>> = BTreeMap::new();
        let mut without_sublayer = Vec::new();
        for filter in filters {
            if args.owned && filter.provider_key != Some(WEIR_PROVIDER_KEY) {
                continue;
            }
            if !filter_selected(engine, &selector, &layer_name.friendly, &filter) {
                continue;
            }
            // Filters without a sublayer carry the zero key.
            if filter.sublayer_key.is_zero() {
                without_sublayer.push(filter);
            } else {
                by_sublayer
                    .entry(filter.sublayer_key)
                    .or_default()
                    .push(filter);
            }
        }

        if by_sublayer.is_empty() && without_sublayer.is_empty() {
            continue;
        }

        println!("\nLayer: {}", layer_name.raw);

        for (sublayer_key, group) in &by_sublayer {
            match engine.sublayer_by_key(sublayer_key) {
                Ok(Some(sublayer)) => println!("SubLayer: {}\n", sublayer.name),
                Ok(None) => eprintln!(
                    "Got an invalid subLayer key: {}",
                    guid_name(sublayer_key).raw
                ),
                Err(err) => {
                    eprintln!("Warning: could not resolve sublayer {sublayer_key}: {err}")
                }
            }

            for filter in group {
                println!("{filter}");
                total += 1;
            }
            if !group.is_empty() {
                println!();
            }
        }

        if !without_sublayer.is_empty() {
            println!("No SubLayer\n");
            for filter in &without_sublayer {
                println!("{filter}");
                total += 1;
            }
        }
    }

    println!("\nTotal number of filters: {total}");
    Ok(exit_codes::OK)
}

/// Union search semantics: a filter is selected when its layer, sublayer or
/// provider display name matches any pattern.
fn filter_selected(
    engine: &dyn Engine,
    selector: &Selector,
    layer_name: &str,
    filter: &FilterRecord,
) -> bool {
    if selector.is_empty() {
        return true;
    }

    let mut names = vec![layer_name.to_string()];
    if !filter.sublayer_key.is_zero() {
        if let Ok(Some(sublayer)) = engine.sublayer_by_key(&filter.sublayer_key) {
            names.push(sublayer.name);
        }
    }
    if let Some(provider_key) = &filter.provider_key {
        if let Ok(Some(provider)) = engine.provider_by_key(provider_key) {
            names.push(provider.name);
        }
    }

    selector.selects(names.iter().map(String::as_str))
}
