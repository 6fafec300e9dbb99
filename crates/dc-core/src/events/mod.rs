use std::sync::Arc;
use parking_lot::Mutex;
use ahash::AHashMap;

/// Composition-wide event bus
pub struct EventBus {
    handlers: Arc<Mutex<AHashMap<std::any::TypeId, Vec<Box<dyn EventHandler>>>>>,
}

/// Event trait that all events must implement
pub trait Event: Send + Sync + 'static {
    fn as_any(&self) -> &dyn std::any::Any;
}

/// Handler trait for event handlers
pub trait EventHandler: Send + Sync {
    fn handle(&mut self, event: &dyn Event);
}

/// Events published while composing a dashboard
pub mod events {
    use super::Event;
    use crate::chart::{ChartId, ChartType};
    use crate::SourceId;

    /// A source became the active one
    #[derive(Debug, Clone)]
    pub struct SourceActivated {
        pub source_id: SourceId,
        pub restored_charts: usize,
    }

    /// Preview rows for a source finished loading
    #[derive(Debug, Clone)]
    pub struct SourceLoaded {
        pub source_id: SourceId,
        pub row_count: usize,
        pub column_count: usize,
    }

    /// Preview rows for a source failed to load
    #[derive(Debug, Clone)]
    pub struct SourceLoadFailed {
        pub source_id: SourceId,
        pub error: String,
    }

    #[derive(Debug, Clone)]
    pub struct ChartAdded {
        pub chart_id: ChartId,
        pub chart_type: ChartType,
    }

    #[derive(Debug, Clone)]
    pub struct ChartRemoved {
        pub chart_id: ChartId,
    }

    /// An edit session applied its draft
    #[derive(Debug, Clone)]
    pub struct ChartCommitted {
        pub chart_id: ChartId,
    }

    /// A filter value changed and rows were re-evaluated
    #[derive(Debug, Clone)]
    pub struct FilterChanged {
        pub column: String,
        pub value: serde_json::Value,
        pub visible_rows: usize,
    }

    #[derive(Debug, Clone)]
    pub struct DashboardSaved {
        pub source_id: SourceId,
        pub name: Option<String>,
        pub chart_count: usize,
    }

    /// Severity of a user-facing notice
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum NotificationLevel {
        Info,
        Warning,
        Error,
    }

    /// Transient user-facing notice
    #[derive(Debug, Clone)]
    pub struct Notification {
        pub level: NotificationLevel,
        pub message: String,
    }

    // Implement Event trait for all event types
    macro_rules! impl_event {
        ($($t:ty),*) => {
            $(
                impl Event for $t {
                    fn as_any(&self) -> &dyn std::any::Any {
                        self
                    }
                }
            )*
        }
    }

    impl_event!(
        SourceActivated,
        SourceLoaded,
        SourceLoadFailed,
        ChartAdded,
        ChartRemoved,
        ChartCommitted,
        FilterChanged,
        DashboardSaved,
        Notification
    );
}

impl EventBus {
    /// Create a new event bus
    pub fn new() -> Self {
        Self {
            handlers: Arc::new(Mutex::new(AHashMap::new())),
        }
    }

    /// Subscribe to events of a specific type
    pub fn subscribe<E: Event>(&self, handler: Box<dyn EventHandler>) {
        let type_id = std::any::TypeId::of::<E>();
        let mut handlers = self.handlers.lock();
        handlers.entry(type_id).or_insert_with(Vec::new).push(handler);
    }

    /// Publish an event. Handlers must not publish on the same bus.
    pub fn publish<E: Event>(&self, event: E) {
        let type_id = std::any::TypeId::of::<E>();
        let mut handlers = self.handlers.lock();

        if let Some(event_handlers) = handlers.get_mut(&type_id) {
            for handler in event_handlers.iter_mut() {
                handler.handle(&event);
            }
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Helper struct for creating event handlers from closures
pub struct ClosureEventHandler<F> {
    handler: F,
}

impl<F> EventHandler for ClosureEventHandler<F>
where
    F: FnMut(&dyn Event) + Send + Sync,
{
    fn handle(&mut self, event: &dyn Event) {
        (self.handler)(event);
    }
}

/// Create an event handler from a closure
pub fn handler_from_fn<F>(f: F) -> Box<dyn EventHandler>
where
    F: FnMut(&dyn Event) + Send + Sync + 'static,
{
    Box::new(ClosureEventHandler { handler: f })
}

/// Downcast a published event to its concrete type
pub fn downcast<E: Event>(event: &dyn Event) -> Option<&E> {
    event.as_any().downcast_ref::<E>()
}

#[cfg(test)]
mod tests {
    use super::events::*;
    use super::*;

    #[test]
    fn test_handlers_receive_only_their_type() {
        let bus = EventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = seen.clone();
        bus.subscribe::<Notification>(handler_from_fn(move |event| {
            if let Some(note) = downcast::<Notification>(event) {
                sink.lock().push(note.message.clone());
            }
        }));

        bus.publish(ChartRemoved { chart_id: uuid::Uuid::new_v4() });
        bus.publish(Notification {
            level: NotificationLevel::Warning,
            message: "Select a data source first".into(),
        });

        assert_eq!(seen.lock().as_slice(), ["Select a data source first"]);
    }
}
