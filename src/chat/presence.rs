use std::sync::{Arc, Mutex};

use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceEntry {
    pub user_id: Uuid,
    pub conn_id: Uuid,
}

/// Process-local roster of live realtime connections. One entry per user for
/// the lifetime of that connection; nothing here is persisted or shared
/// across instances, so this stays strictly single-process.
#[derive(Clone, Default)]
pub struct Presence(Arc<Mutex<Vec<PresenceEntry>>>);

impl Presence {
    /// First writer wins: a user opening a second tab keeps the mapping of
    /// the first. Returns whether the entry was inserted.
    pub fn register(&self, user_id: Uuid, conn_id: Uuid) -> bool {
        let mut entries = self.0.lock().unwrap();
        if entries.iter().any(|e| e.user_id == user_id) {
            return false;
        }
        entries.push(PresenceEntry { user_id, conn_id });
        true
    }

    /// Drops every entry held by the closing connection.
    pub fn unregister(&self, conn_id: Uuid) {
        self.0.lock().unwrap().retain(|e| e.conn_id != conn_id);
    }

    /// `None` means the target is offline; the caller drops the realtime
    /// delivery silently, durable storage is the message store's job.
    pub fn route(&self, user_id: Uuid) -> Option<Uuid> {
        self.0
            .lock()
            .unwrap()
            .iter()
            .find(|e| e.user_id == user_id)
            .map(|e| e.conn_id)
    }

    pub fn roster(&self) -> Vec<PresenceEntry> {
        self.0.lock().unwrap().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_writer_wins() {
        let presence = Presence::default();
        let user = Uuid::now_v7();
        let (c1, c2) = (Uuid::now_v7(), Uuid::now_v7());

        assert!(presence.register(user, c1));
        assert!(!presence.register(user, c2));
        assert_eq!(presence.route(user), Some(c1));
        assert_eq!(presence.roster().len(), 1);
    }

    #[test]
    fn disconnect_clears_route() {
        let presence = Presence::default();
        let user = Uuid::now_v7();
        let conn = Uuid::now_v7();

        presence.register(user, conn);
        presence.unregister(conn);
        assert_eq!(presence.route(user), None);
        assert!(presence.roster().is_empty());
    }

    #[test]
    fn route_misses_for_unknown_user() {
        let presence = Presence::default();
        presence.register(Uuid::now_v7(), Uuid::now_v7());
        assert_eq!(presence.route(Uuid::now_v7()), None);
    }

    #[test]
    fn unregister_only_touches_own_connection() {
        let presence = Presence::default();
        let (u1, u2) = (Uuid::now_v7(), Uuid::now_v7());
        let (c1, c2) = (Uuid::now_v7(), Uuid::now_v7());

        presence.register(u1, c1);
        presence.register(u2, c2);
        presence.unregister(c1);

        assert_eq!(presence.route(u1), None);
        assert_eq!(presence.route(u2), Some(c2));
    }
}
