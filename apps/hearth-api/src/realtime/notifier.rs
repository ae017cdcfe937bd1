//! Translates CRUD-side event facts into hub broadcasts.

use std::sync::Arc;

use serde_json::{json, Value};

use crate::error::ApiError;

use super::bus::BroadcastBus;
use super::events::HubEvent;

/// Stateless adapter: domain facts in, `event_update` /
/// `event_notification` broadcasts out. The CRUD service reaches it through
/// the internal notify routes.
#[derive(Clone)]
pub struct EventNotifier {
    bus: Arc<dyn BroadcastBus>,
}

impl EventNotifier {
    pub fn new(bus: Arc<dyn BroadcastBus>) -> Self {
        Self { bus }
    }

    /// An RSVP was toggled on one of the hub's events.
    pub async fn attendance_changed(
        &self,
        hub_id: i64,
        event_id: i64,
        attending: bool,
    ) -> Result<(), ApiError> {
        let action = if attending { "attending" } else { "not_attending" };
        self.bus
            .publish(
                hub_id,
                HubEvent::EventUpdate {
                    event: json!({ "event_id": event_id, "action": action }),
                },
            )
            .await
    }

    /// An event in the hub was created or updated; `event` is its serialized
    /// form, passed through verbatim.
    pub async fn event_saved(&self, hub_id: i64, event: Value) -> Result<(), ApiError> {
        self.bus
            .publish(hub_id, HubEvent::EventNotification { event })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::realtime::bus::LocalBus;

    #[tokio::test]
    async fn attendance_toggle_becomes_event_update() {
        let bus = Arc::new(LocalBus::new());
        let notifier = EventNotifier::new(bus.clone());
        let mut sub = bus.subscribe(7);

        notifier.attendance_changed(7, 99, true).await.unwrap();
        notifier.attendance_changed(7, 99, false).await.unwrap();

        let msg = sub.recv().await.unwrap();
        match &msg.event {
            HubEvent::EventUpdate { event } => {
                assert_eq!(event["event_id"], 99);
                assert_eq!(event["action"], "attending");
            }
            other => panic!("wrong event: {other:?}"),
        }

        let msg = sub.recv().await.unwrap();
        match &msg.event {
            HubEvent::EventUpdate { event } => {
                assert_eq!(event["action"], "not_attending");
            }
            other => panic!("wrong event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn saved_event_is_passed_through_as_notification() {
        let bus = Arc::new(LocalBus::new());
        let notifier = EventNotifier::new(bus.clone());
        let mut sub = bus.subscribe(7);

        let event = json!({ "id": 5, "title": "game night", "start_time": "2026-09-01T18:00:00Z" });
        notifier.event_saved(7, event.clone()).await.unwrap();

        let msg = sub.recv().await.unwrap();
        match &msg.event {
            HubEvent::EventNotification { event: got } => assert_eq!(got, &event),
            other => panic!("wrong event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn notifications_are_scoped_to_the_hub_group() {
        let bus = Arc::new(LocalBus::new());
        let notifier = EventNotifier::new(bus.clone());
        let mut other = bus.subscribe(8);
        let mut target = bus.subscribe(7);

        notifier.attendance_changed(7, 1, true).await.unwrap();
        notifier.attendance_changed(8, 2, true).await.unwrap();

        let msg = target.recv().await.unwrap();
        assert_eq!(msg.hub_id, 7);
        let msg = other.recv().await.unwrap();
        assert_eq!(msg.hub_id, 8);
    }
}
