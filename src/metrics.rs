use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Process-wide counters, updated lock-free from connection tasks and the coordinator shell.
#[derive(Debug, Default)]
pub struct ServerMetrics {
    // Connection metrics
    pub total_connections: AtomicU64,
    pub active_connections: AtomicU64,
    pub disconnections: AtomicU64,
    pub rejected_connections: AtomicU64,

    // Room metrics
    pub rooms_created: AtomicU64,
    pub rooms_deleted: AtomicU64,
    pub owner_successions: AtomicU64,

    // Admission metrics
    pub join_requests: AtomicU64,
    pub join_approvals: AtomicU64,
    pub join_rejections: AtomicU64,

    // Messaging metrics
    pub messages_broadcast: AtomicU64,
    pub envelopes_delivered: AtomicU64,
    pub envelopes_dropped: AtomicU64,

    // Error tracking
    pub malformed_envelopes: AtomicU64,
    pub rate_limit_rejections: AtomicU64,
    pub client_errors: AtomicU64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub connections: ConnectionMetrics,
    pub rooms: RoomMetrics,
    pub admission: AdmissionMetrics,
    pub messaging: MessagingMetrics,
    pub errors: ErrorMetrics,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ConnectionMetrics {
    pub total_connections: u64,
    pub active_connections: u64,
    pub disconnections: u64,
    pub rejected_connections: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct RoomMetrics {
    pub rooms_created: u64,
    pub rooms_deleted: u64,
    pub active_rooms: u64,
    pub owner_successions: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct AdmissionMetrics {
    pub join_requests: u64,
    pub join_approvals: u64,
    pub join_rejections: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct MessagingMetrics {
    pub messages_broadcast: u64,
    pub envelopes_delivered: u64,
    pub envelopes_dropped: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ErrorMetrics {
    pub malformed_envelopes: u64,
    pub rate_limit_rejections: u64,
    pub client_errors: u64,
}

impl ServerMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    // Connection metrics
    pub fn increment_connections(&self) {
        self.total_connections.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn decrement_active_connections(&self) {
        // Saturate at zero rather than wrapping
        let _ = self
            .active_connections
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |current| {
                current.checked_sub(1)
            });
        self.disconnections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_rejected_connections(&self) {
        self.rejected_connections.fetch_add(1, Ordering::Relaxed);
    }

    // Room metrics
    pub fn increment_rooms_created(&self) {
        self.rooms_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_rooms_deleted(&self) {
        self.rooms_deleted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_owner_successions(&self) {
        self.owner_successions.fetch_add(1, Ordering::Relaxed);
    }

    // Admission metrics
    pub fn increment_join_requests(&self) {
        self.join_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_join_approvals(&self) {
        self.join_approvals.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_join_rejections(&self) {
        self.join_rejections.fetch_add(1, Ordering::Relaxed);
    }

    // Messaging metrics
    pub fn increment_messages_broadcast(&self) {
        self.messages_broadcast.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_envelopes_delivered(&self) {
        self.envelopes_delivered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_envelopes_dropped(&self) {
        self.envelopes_dropped.fetch_add(1, Ordering::Relaxed);
    }

    // Error tracking
    pub fn increment_malformed_envelopes(&self) {
        self.malformed_envelopes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_rate_limit_rejections(&self) {
        self.rate_limit_rejections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_client_errors(&self) {
        self.client_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Read every counter. `active_rooms` is supplied by the caller since the
    /// room count lives behind the coordinator lock.
    pub fn snapshot(&self, active_rooms: usize) -> MetricsSnapshot {
        let load = |counter: &AtomicU64| counter.load(Ordering::Relaxed);

        MetricsSnapshot {
            timestamp: chrono::Utc::now(),
            connections: ConnectionMetrics {
                total_connections: load(&self.total_connections),
                active_connections: load(&self.active_connections),
                disconnections: load(&self.disconnections),
                rejected_connections: load(&self.rejected_connections),
            },
            rooms: RoomMetrics {
                rooms_created: load(&self.rooms_created),
                rooms_deleted: load(&self.rooms_deleted),
                active_rooms: active_rooms as u64,
                owner_successions: load(&self.owner_successions),
            },
            admission: AdmissionMetrics {
                join_requests: load(&self.join_requests),
                join_approvals: load(&self.join_approvals),
                join_rejections: load(&self.join_rejections),
            },
            messaging: MessagingMetrics {
                messages_broadcast: load(&self.messages_broadcast),
                envelopes_delivered: load(&self.envelopes_delivered),
                envelopes_dropped: load(&self.envelopes_dropped),
            },
            errors: ErrorMetrics {
                malformed_envelopes: load(&self.malformed_envelopes),
                rate_limit_rejections: load(&self.rate_limit_rejections),
                client_errors: load(&self.client_errors),
            },
        }
    }
}
