use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchStatus {
    Succeeded,
    Failed,
    Cancelled,
}

/// Emitted once per dispatched id, as soon as its slot is filled
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchEvent {
    pub phase: String,
    pub id: String,
    pub index: usize,
    pub status: DispatchStatus,
    pub completed: usize,
    pub total: usize,
}

impl DispatchEvent {
    pub fn percentage(&self) -> usize {
        if self.total == 0 {
            return 100;
        }
        (self.completed * 100) / self.total
    }

    pub fn is_final(&self) -> bool {
        self.completed == self.total
    }
}

pub trait ProgressSink: Send + Sync {
    fn on_event(&self, event: DispatchEvent);
}

/// Discards every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl ProgressSink for NoopSink {
    fn on_event(&self, _event: DispatchEvent) {}
}

impl ProgressSink for UnboundedSender<DispatchEvent> {
    fn on_event(&self, event: DispatchEvent) {
        // Receiver gone means nobody is listening any more
        let _ = self.send(event);
    }
}

impl<F> ProgressSink for F
where
    F: Fn(DispatchEvent) + Send + Sync,
{
    fn on_event(&self, event: DispatchEvent) {
        self(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn event(completed: usize, total: usize) -> DispatchEvent {
        DispatchEvent {
            phase: "fetch".to_string(),
            id: "A".to_string(),
            index: 0,
            status: DispatchStatus::Succeeded,
            completed,
            total,
        }
    }

    #[test]
    fn test_percentage() {
        assert_eq!(event(1, 4).percentage(), 25);
        assert_eq!(event(0, 0).percentage(), 100);
        assert!(event(4, 4).is_final());
        assert!(!event(3, 4).is_final());
    }

    #[tokio::test]
    async fn test_channel_sink_forwards_events() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        tx.on_event(event(1, 2));
        let received = rx.recv().await.unwrap();
        assert_eq!(received.completed, 1);
    }

    #[test]
    fn test_channel_sink_ignores_closed_receiver() {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        drop(rx);
        tx.on_event(event(1, 1));
    }

    #[test]
    fn test_closure_sink() {
        let seen = Mutex::new(Vec::new());
        let sink = |e: DispatchEvent| seen.lock().unwrap().push(e.completed);
        sink.on_event(event(1, 3));
        sink.on_event(event(2, 3));
        assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_event_serializes_camel_case() {
        let json = serde_json::to_value(event(1, 2)).unwrap();
        assert_eq!(json["status"], "succeeded");
        assert_eq!(json["completed"], 1);
        assert_eq!(json["phase"], "fetch");
    }
}
