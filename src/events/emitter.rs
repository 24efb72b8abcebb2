//! Broadcast event emitter.

use crate::core::EngineError;
use crate::events::record::{EngineEvent, LogLevel, LogRecord};

use serde_json::Value;
use std::sync::RwLock;
use tokio::sync::broadcast;

/// Publishes engine events to any number of subscribers.
///
/// Every record is also logged through `tracing` under the
/// `adaptive_engine::events` target, whether or not anyone subscribed.
/// Sending never blocks and never fails: slow subscribers lag and a closed
/// emitter drops events.
#[derive(Debug)]
pub struct EventEmitter {
    sender: RwLock<Option<broadcast::Sender<EngineEvent>>>,
}

impl EventEmitter {
    /// Creates an emitter buffering up to `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender: RwLock::new(Some(sender)),
        }
    }

    /// Subscribes to the event stream.
    pub fn subscribe(&self) -> Result<broadcast::Receiver<EngineEvent>, EngineError> {
        self.sender
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .as_ref()
            .map(broadcast::Sender::subscribe)
            .ok_or(EngineError::ShutDown)
    }

    /// Logs a record and publishes it.
    pub fn log(&self, level: LogLevel, message: &str, fields: Value) {
        match level {
            LogLevel::Debug => {
                tracing::debug!(target: "adaptive_engine::events", fields = %fields, "{}", message)
            }
            LogLevel::Info => {
                tracing::info!(target: "adaptive_engine::events", fields = %fields, "{}", message)
            }
            LogLevel::Warn => {
                tracing::warn!(target: "adaptive_engine::events", fields = %fields, "{}", message)
            }
            LogLevel::Error => {
                tracing::error!(target: "adaptive_engine::events", fields = %fields, "{}", message)
            }
        }

        self.emit(EngineEvent::Log(LogRecord::new(level, message, fields)));
    }

    /// Publishes an event.
    pub fn emit(&self, event: EngineEvent) {
        let guard = self
            .sender
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(sender) = guard.as_ref() {
            // No receivers is not an error.
            let _ = sender.send(event);
        }
    }

    /// Closes the stream. Subscribers drain what is buffered, then see
    /// `Closed`.
    pub fn close(&self) {
        let sender = self
            .sender
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if sender.is_some() {
            tracing::debug!(target: "adaptive_engine::events", "Event stream closed");
        }
    }

    /// Returns `true` once [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.sender
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .is_none()
    }
}

impl Default for EventEmitter {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::sync::broadcast::error::RecvError;

    #[tokio::test]
    async fn test_subscriber_receives_logs() {
        let emitter = EventEmitter::new(8);
        let mut rx = emitter.subscribe().unwrap();

        emitter.log(LogLevel::Info, "Strategy selected", json!({"strategy": "fast"}));

        match rx.recv().await.unwrap() {
            EngineEvent::Log(record) => {
                assert_eq!(record.level, LogLevel::Info);
                assert_eq!(record.message, "Strategy selected");
                assert_eq!(record.fields["strategy"], "fast");
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_emit_without_subscribers() {
        let emitter = EventEmitter::new(1);
        emitter.emit(EngineEvent::CircuitClosed);
        emitter.log(LogLevel::Error, "nobody listening", Value::Null);
    }

    #[tokio::test]
    async fn test_lagging_subscriber_does_not_block() {
        let emitter = EventEmitter::new(2);
        let mut rx = emitter.subscribe().unwrap();

        for _ in 0..5 {
            emitter.emit(EngineEvent::CircuitClosed);
        }

        assert!(matches!(rx.recv().await, Err(RecvError::Lagged(_))));
    }

    #[tokio::test]
    async fn test_close_ends_stream() {
        let emitter = EventEmitter::new(4);
        let mut rx = emitter.subscribe().unwrap();
        emitter.emit(EngineEvent::CircuitClosed);
        emitter.close();

        assert!(emitter.is_closed());
        assert!(matches!(rx.recv().await, Ok(EngineEvent::CircuitClosed)));
        assert!(matches!(rx.recv().await, Err(RecvError::Closed)));
        assert!(matches!(emitter.subscribe(), Err(EngineError::ShutDown)));

        // Emitting after close is silently dropped.
        emitter.emit(EngineEvent::CircuitClosed);
    }
}
