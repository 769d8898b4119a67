use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::metrics::ServerMetrics;
use crate::protocol::{ServerMessage, SessionId};

use super::RegisterClientError;

/// The relay's view of one transport: where to queue envelopes and how to close it.
#[derive(Debug, Clone)]
pub(crate) struct ConnectionHandle {
    pub sender: mpsc::Sender<Arc<ServerMessage>>,
    pub shutdown: CancellationToken,
    pub client_addr: SocketAddr,
}

pub(crate) struct ConnectionManager {
    clients: DashMap<SessionId, ConnectionHandle>,
    connections_per_ip: DashMap<IpAddr, usize>,
    metrics: Arc<ServerMetrics>,
    max_connections_per_ip: usize,
}

impl ConnectionManager {
    pub fn new(max_connections_per_ip: usize, metrics: Arc<ServerMetrics>) -> Self {
        Self {
            clients: DashMap::new(),
            connections_per_ip: DashMap::new(),
            metrics,
            max_connections_per_ip,
        }
    }

    /// Claim a connection slot for `ip`, counting the connection on success.
    pub fn reserve_ip_slot(&self, ip: IpAddr) -> Result<usize, RegisterClientError> {
        match self.try_reserve_ip_slot(ip) {
            Ok(count) => {
                self.metrics.increment_connections();
                Ok(count)
            }
            Err(current) => {
                warn!(
                    %ip,
                    current,
                    max = self.max_connections_per_ip,
                    "IP connection limit exceeded"
                );
                self.metrics.increment_rejected_connections();
                Err(RegisterClientError::IpLimitExceeded {
                    current,
                    limit: self.max_connections_per_ip,
                })
            }
        }
    }

    pub fn insert(&self, session: SessionId, handle: ConnectionHandle) {
        self.clients.insert(session, handle);
    }

    pub fn get(&self, session: SessionId) -> Option<ConnectionHandle> {
        self.clients.get(&session).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, session: SessionId) -> bool {
        self.clients.contains_key(&session)
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn sessions(&self) -> Vec<SessionId> {
        self.clients.iter().map(|entry| *entry.key()).collect()
    }

    /// Forget the session and release its IP slot.
    pub fn remove(&self, session: SessionId) -> Option<ConnectionHandle> {
        self.clients.remove(&session).map(|(_, handle)| {
            self.release_ip_slot(handle.client_addr.ip());
            handle
        })
    }

    fn try_reserve_ip_slot(&self, ip: IpAddr) -> Result<usize, usize> {
        match self.connections_per_ip.entry(ip) {
            dashmap::mapref::entry::Entry::Occupied(mut entry) => {
                let current = *entry.get();
                if current >= self.max_connections_per_ip {
                    Err(current)
                } else {
                    let count = entry.get_mut();
                    *count += 1;
                    Ok(*count)
                }
            }
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                if self.max_connections_per_ip == 0 {
                    Err(0)
                } else {
                    entry.insert(1);
                    Ok(1)
                }
            }
        }
    }

    fn release_ip_slot(&self, ip: IpAddr) {
        if let Some(mut entry) = self.connections_per_ip.get_mut(&ip) {
            if *entry > 1 {
                *entry -= 1;
                return;
            }
        }
        self.connections_per_ip.remove(&ip);
    }
}
