//! In-memory engine backend.
//!
//! Behaves like the kernel engine for everything the tool exercises:
//! id assignment, weight-ordered enumeration, provider/sublayer lookup and
//! event delivery. Used by unit tests across the workspace and available to
//! demos via the `mock` feature.

use crate::error::EngineError;
use crate::events::{ClassifyEvent, EventStream, EventSubscription};
use crate::filter::{
    sort_by_weight, FilterId, FilterRecord, ProviderInfo, SublayerInfo,
};
use crate::guid::{Guid, WEIR_PROVIDER_KEY, WEIR_SUBLAYER_KEY};
use crate::session::Engine;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

type EventSender = mpsc::Sender<Result<ClassifyEvent, EngineError>>;

struct State {
    filters: Vec<FilterRecord>,
    next_id: FilterId,
}

pub struct MockEngine {
    state: Mutex<State>,
    providers: Vec<ProviderInfo>,
    sublayers: Vec<SublayerInfo>,
    event_tx: Arc<Mutex<Option<EventSender>>>,
}

impl MockEngine {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                filters: Vec::new(),
                next_id: 1,
            }),
            providers: vec![ProviderInfo {
                key: WEIR_PROVIDER_KEY,
                name: "weir".to_string(),
                description: "weir packet filter administration".to_string(),
            }],
            sublayers: vec![SublayerInfo {
                key: WEIR_SUBLAYER_KEY,
                name: "weir filters".to_string(),
            }],
            event_tx: Arc::new(Mutex::new(None)),
        }
    }

    /// Register an extra provider so selector tests can exercise matching.
    pub fn with_provider(mut self, provider: ProviderInfo) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn with_sublayer(mut self, sublayer: SublayerInfo) -> Self {
        self.sublayers.push(sublayer);
        self
    }

    /// Snapshot of everything installed, in installation order.
    pub fn installed(&self) -> Vec<FilterRecord> {
        self.state.lock().expect("mock state").filters.clone()
    }

    /// Deliver an event to the active subscriber, if any.
    pub fn push_event(&self, event: ClassifyEvent) {
        if let Some(tx) = self.event_tx.lock().expect("event sender").as_ref() {
            let _ = tx.try_send(Ok(event));
        }
    }
}

impl Default for MockEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine for MockEngine {
    fn add(&self, filter: &FilterRecord) -> Result<FilterId, EngineError> {
        let mut state = self.state.lock().expect("mock state");
        let id = state.next_id;
        state.next_id += 1;
        let mut installed = filter.clone();
        installed.id = id;
        state.filters.push(installed);
        Ok(id)
    }

    fn delete_by_id(&self, id: FilterId) -> Result<(), EngineError> {
        let mut state = self.state.lock().expect("mock state");
        let before = state.filters.len();
        state.filters.retain(|f| f.id != id);
        if state.filters.len() == before {
            return Err(EngineError::Status {
                call: "delete_filter",
                code: libc::ENOENT,
            });
        }
        Ok(())
    }

    fn filters_for_layer(&self, layer: &Guid) -> Result<Vec<FilterRecord>, EngineError> {
        let state = self.state.lock().expect("mock state");
        let mut filters: Vec<_> = state
            .filters
            .iter()
            .filter(|f| f.layer_key == *layer)
            .cloned()
            .collect();
        sort_by_weight(&mut filters);
        Ok(filters)
    }

    fn filter_by_id(&self, id: FilterId) -> Result<Option<FilterRecord>, EngineError> {
        let state = self.state.lock().expect("mock state");
        Ok(state.filters.iter().find(|f| f.id == id).cloned())
    }

    fn sublayer_by_key(&self, key: &Guid) -> Result<Option<SublayerInfo>, EngineError> {
        Ok(self.sublayers.iter().find(|s| s.key == *key).cloned())
    }

    fn provider_by_key(&self, key: &Guid) -> Result<Option<ProviderInfo>, EngineError> {
        Ok(self.providers.iter().find(|p| p.key == *key).cloned())
    }

    fn app_id_from_path(&self, path: &Path) -> Result<Vec<u8>, EngineError> {
        // The engine canonicalizes executable paths to lowercase.
        Ok(path.to_string_lossy().to_lowercase().into_bytes())
    }

    fn subscribe(&self) -> Result<(EventSubscription, EventStream), EngineError> {
        let (tx, rx) = mpsc::channel(64);
        *self.event_tx.lock().expect("event sender") = Some(tx);
        let slot = Arc::clone(&self.event_tx);
        let subscription = EventSubscription::new(
            move || {
                slot.lock().expect("event sender").take();
            },
            None,
        );
        Ok((subscription, ReceiverStream::new(rx)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{ActionType, FilterFlags, Weight};
    use crate::guid::LAYER_AUTH_CONNECT_V4;

    fn permit(weight: u8) -> FilterRecord {
        FilterRecord {
            id: 0,
            name: "weir".to_string(),
            provider_key: Some(WEIR_PROVIDER_KEY),
            sublayer_key: WEIR_SUBLAYER_KEY,
            layer_key: LAYER_AUTH_CONNECT_V4,
            action: ActionType::Permit,
            weight: Weight::U8(weight),
            flags: FilterFlags::PERSISTENT_INDEXED,
            conditions: Vec::new(),
        }
    }

    #[test]
    fn add_assigns_increasing_ids() {
        let engine = MockEngine::new();
        let a = engine.add(&permit(10)).unwrap();
        let b = engine.add(&permit(10)).unwrap();
        assert!(b > a);
        assert_eq!(engine.installed().len(), 2);
    }

    #[test]
    fn enumeration_is_weight_ordered() {
        let engine = MockEngine::new();
        engine.add(&permit(1)).unwrap();
        engine.add(&permit(200)).unwrap();
        engine.add(&permit(50)).unwrap();
        let weights: Vec<_> = engine
            .filters_for_layer(&LAYER_AUTH_CONNECT_V4)
            .unwrap()
            .iter()
            .map(|f| f.weight.effective_u8())
            .collect();
        assert_eq!(weights, vec![200, 50, 1]);
    }

    #[test]
    fn deleting_a_missing_filter_reports_the_engine_status() {
        let engine = MockEngine::new();
        match engine.delete_by_id(999) {
            Err(EngineError::Status { code, .. }) => assert_eq!(code, libc::ENOENT),
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[test]
    fn lookups_miss_as_none_not_error() {
        let engine = MockEngine::new();
        assert!(engine.filter_by_id(1).unwrap().is_none());
        assert!(engine
            .sublayer_by_key(&Guid::new(1, 2, 3, [0; 8]))
            .unwrap()
            .is_none());
    }

    #[test]
    fn app_ids_are_lowercased_paths() {
        let engine = MockEngine::new();
        let blob = engine
            .app_id_from_path(Path::new("/Usr/Bin/Curl"))
            .unwrap();
        assert_eq!(blob, b"/usr/bin/curl");
    }
}
