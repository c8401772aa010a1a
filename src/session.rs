use chrono::{DateTime, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::AnalysisResult;
use crate::selection::{self, SelectionEvent, SelectionState};
use crate::view::{build_view, DashboardView};

#[derive(Debug, Clone)]
pub struct LoadedPayload {
    pub id: Uuid,
    pub received_at: DateTime<Utc>,
    pub result: AnalysisResult,
}

/// Holds the current payload and selection for one interactive session.
///
/// A new payload replaces the old one wholesale: the selection resets and
/// the cached view is dropped. Only the view for the latest (payload,
/// selection) pair is kept. Selection events carry the id of the payload
/// they were raised against and are discarded if that payload is gone.
#[derive(Debug, Default)]
pub struct Session {
    current: Option<LoadedPayload>,
    selection: SelectionState,
    cache: Option<((Uuid, SelectionState), DashboardView)>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(&mut self, result: AnalysisResult) -> Uuid {
        let id = Uuid::new_v4();
        info!(payload = %id, flow = %result.flow(), "analysis payload loaded");
        self.current = Some(LoadedPayload {
            id,
            received_at: Utc::now(),
            result,
        });
        self.selection = SelectionState::default();
        self.cache = None;
        id
    }

    pub fn reset(&mut self) {
        if let Some(previous) = self.current.take() {
            info!(payload = %previous.id, "analysis payload discarded");
        }
        self.selection = SelectionState::default();
        self.cache = None;
    }

    pub fn current(&self) -> Option<&LoadedPayload> {
        self.current.as_ref()
    }

    pub fn payload_id(&self) -> Option<Uuid> {
        self.current.as_ref().map(|loaded| loaded.id)
    }

    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    /// Applies `event` if `payload_id` is still current. Returns whether it
    /// was applied.
    pub fn dispatch(&mut self, payload_id: Uuid, event: &SelectionEvent) -> bool {
        let Some(loaded) = self.current.as_ref() else {
            debug!(payload = %payload_id, ?event, "no payload loaded, dropping event");
            return false;
        };
        if loaded.id != payload_id {
            debug!(
                stale = %payload_id,
                current = %loaded.id,
                ?event,
                "selection raised against a replaced payload, dropping event"
            );
            return false;
        }
        self.selection = selection::reduce(&loaded.result, &self.selection, event);
        true
    }

    /// Applies `event` against whatever payload is current.
    pub fn select(&mut self, event: &SelectionEvent) -> bool {
        match self.payload_id() {
            Some(id) => self.dispatch(id, event),
            None => false,
        }
    }

    pub fn view(&mut self) -> Option<DashboardView> {
        let loaded = self.current.as_ref()?;
        let key = (loaded.id, self.selection.clone());
        if let Some((cached_key, view)) = &self.cache {
            if *cached_key == key {
                return Some(view.clone());
            }
        }
        let view = build_view(&loaded.result, &self.selection);
        self.cache = Some((key, view.clone()));
        Some(view)
    }
}
