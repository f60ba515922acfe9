use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use iam_models::CreateAuditLog;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

/// Implemented by the actual persistence layer the buffered sink flushes
/// into. Kept separate from `iam_storage::AuditSink` so `iam-audit` does not
/// need to depend on `iam-storage` — callers wire the two together.
#[async_trait]
pub trait AuditRecorder: Send + Sync {
    async fn persist(&self, event: CreateAuditLog) -> Result<(), String>;
}

#[derive(Debug, Clone, Copy)]
pub struct BufferedAuditSinkConfig {
    pub capacity: usize,
}

impl Default for BufferedAuditSinkConfig {
    fn default() -> Self {
        Self { capacity: 4096 }
    }
}

struct Buffer {
    queue: Mutex<VecDeque<CreateAuditLog>>,
    notify: Notify,
    capacity: usize,
    dropped: AtomicU64,
}

/// Append-only, best-effort audit sink. `record` never awaits storage I/O —
/// it pushes onto an in-process bounded buffer and returns immediately. A
/// background task drains the buffer into the wrapped `AuditRecorder`. When
/// the buffer is full, the oldest pending event is dropped rather than
/// blocking the caller or rejecting the newest event.
pub struct BufferedAuditSink {
    buffer: Arc<Buffer>,
    flusher: Option<JoinHandle<()>>,
}

impl BufferedAuditSink {
    pub fn spawn(recorder: Arc<dyn AuditRecorder>, config: BufferedAuditSinkConfig) -> Self {
        let buffer = Arc::new(Buffer {
            queue: Mutex::new(VecDeque::with_capacity(config.capacity)),
            notify: Notify::new(),
            capacity: config.capacity,
            dropped: AtomicU64::new(0),
        });

        let flusher_buffer = buffer.clone();
        let handle = tokio::spawn(async move {
            loop {
                flusher_buffer.notify.notified().await;
                loop {
                    let next = {
                        let mut queue = flusher_buffer.queue.lock().expect("audit buffer poisoned");
                        queue.pop_front()
                    };
                    let Some(event) = next else { break };
                    let event_type = event.event_type.clone();
                    if let Err(err) = recorder.persist(event).await {
                        tracing::error!(event_type, error = %err, "audit event flush failed");
                    }
                }
            }
        });

        Self {
            buffer,
            flusher: Some(handle),
        }
    }

    /// Enqueues `event` without awaiting persistence. Safe to call from any
    /// hot path; this function itself never fails the caller's operation.
    pub fn record(&self, event: CreateAuditLog) {
        let mut queue = self.buffer.queue.lock().expect("audit buffer poisoned");
        if queue.len() >= self.buffer.capacity {
            queue.pop_front();
            let dropped = self.buffer.dropped.fetch_add(1, Ordering::Relaxed) + 1;
            tracing::warn!(dropped, "audit buffer full, dropped oldest pending event");
        }
        queue.push_back(event);
        drop(queue);
        self.buffer.notify.notify_one();
    }

    pub fn dropped_count(&self) -> u64 {
        self.buffer.dropped.load(Ordering::Relaxed)
    }
}

impl Drop for BufferedAuditSink {
    fn drop(&mut self) {
        if let Some(handle) = self.flusher.take() {
            handle.abort();
        }
    }
}
