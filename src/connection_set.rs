use std::collections::HashMap;

use tracing::debug;

use crate::connection::Connection;

pub type ConnectionId = u64;

pub struct ConnectionSet {
    connections: HashMap<ConnectionId, Connection>,
    id_generator: ConnectionId,
    max_connections: Option<usize>,
}

impl ConnectionSet {
    pub fn new(max_connections: Option<usize>) -> Self {
        Self {
            connections: HashMap::new(),
            id_generator: 0,
            max_connections,
        }
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    #[cfg(test)]
    pub fn contains(&self, id: ConnectionId) -> bool {
        self.connections.contains_key(&id)
    }

    pub fn has_capacity(&self) -> bool {
        match self.max_connections {
            Some(max) => self.connections.len() < max,
            None => true,
        }
    }

    fn next_id(&mut self) -> ConnectionId {
        let id = self.id_generator;
        self.id_generator += 1;
        id
    }

    pub fn insert(&mut self, connection: Connection) -> ConnectionId {
        let id = self.next_id();
        self.connections.insert(id, connection);
        id
    }

    pub async fn update_all(&mut self) -> usize {
        if self.connections.is_empty() {
            return 0;
        }

        let mut failed = vec![];
        for (id, connection) in self.connections.iter_mut() {
            if !connection.update().await {
                failed.push(*id);
            }
        }

        for id in failed.iter() {
            if let Some(connection) = self.connections.remove(id) {
                debug!("Pruned connection #{} from {}", id, connection.peer());
            }
        }

        failed.len()
    }
}
