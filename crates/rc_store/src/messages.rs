//! Message log operations.
//!
//! Reads are snapshots: each call returns a fully materialised `Vec`,
//! ordered by `(timestamp, id)` ascending.

use rc_proto::ConversationId;

use crate::{
    db::Store,
    error::StoreError,
    models::{MessageRow, NewMessage, StoredMessage},
};

const SELECT_COLUMNS: &str = "SELECT id, sender, payload, conversation_id, timestamp, is_unread FROM messages";

impl Store {
    /// Append a message and return its id.
    pub async fn append(&self, message: NewMessage, mark_unread: bool) -> Result<i64, StoreError> {
        self.append_stored(message, mark_unread).await.map(|m| m.id)
    }

    /// Append a message and return the stored record.
    ///
    /// Insert and eviction share one transaction: after commit the partition
    /// holds at most `max_messages_per_conversation` entries, the newest ones.
    pub async fn append_stored(&self, message: NewMessage, mark_unread: bool) -> Result<StoredMessage, StoreError> {
        let pool = self.pool()?;
        let cap = self.config().max_messages_per_conversation as i64;
        let key = message.conversation.storage_key().to_string();
        let timestamp = self.next_timestamp();

        // Write first so the transaction takes the write lock up front.
        let mut tx = pool.begin().await?;

        let id = sqlx::query(
            "INSERT INTO messages (sender, payload, conversation_id, timestamp, is_unread) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&message.sender)
        .bind(&message.payload)
        .bind(&key)
        .bind(timestamp)
        .bind(mark_unread)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        let evicted = sqlx::query(
            "DELETE FROM messages WHERE conversation_id = ? AND id NOT IN (
                SELECT id FROM messages WHERE conversation_id = ?
                ORDER BY timestamp DESC, id DESC LIMIT ?
            )",
        )
        .bind(&key)
        .bind(&key)
        .bind(cap)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        tx.commit().await?;

        if evicted > 0 {
            tracing::debug!(
                target: "rc_store",
                event = "messages_evicted",
                conversation = %message.conversation,
                evicted
            );
        }

        Ok(StoredMessage {
            id,
            sender: message.sender,
            payload: message.payload,
            conversation: message.conversation,
            timestamp,
            unread: mark_unread,
        })
    }

    pub async fn list_by_conversation(&self, conversation: &ConversationId) -> Result<Vec<StoredMessage>, StoreError> {
        let rows: Vec<MessageRow> = sqlx::query_as(&format!(
            "{SELECT_COLUMNS} WHERE conversation_id = ? ORDER BY timestamp ASC, id ASC"
        ))
        .bind(conversation.storage_key())
        .fetch_all(self.pool()?)
        .await?;
        Ok(rows.into_iter().map(StoredMessage::from).collect())
    }

    pub async fn list_all(&self) -> Result<Vec<StoredMessage>, StoreError> {
        let rows: Vec<MessageRow> = sqlx::query_as(&format!("{SELECT_COLUMNS} ORDER BY timestamp ASC, id ASC"))
            .fetch_all(self.pool()?)
            .await?;
        Ok(rows.into_iter().map(StoredMessage::from).collect())
    }

    /// Clear the unread flag on every message in the conversation. Idempotent.
    pub async fn mark_read(&self, conversation: &ConversationId) -> Result<(), StoreError> {
        let updated = sqlx::query("UPDATE messages SET is_unread = 0 WHERE conversation_id = ? AND is_unread = 1")
            .bind(conversation.storage_key())
            .execute(self.pool()?)
            .await?
            .rows_affected();
        if updated > 0 {
            tracing::debug!(
                target: "rc_store",
                event = "marked_read",
                conversation = %conversation,
                updated
            );
        }
        Ok(())
    }

    pub async fn has_unread(&self, conversation: &ConversationId) -> Result<bool, StoreError> {
        let unread: i64 = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM messages WHERE conversation_id = ? AND is_unread = 1)",
        )
        .bind(conversation.storage_key())
        .fetch_one(self.pool()?)
        .await?;
        Ok(unread != 0)
    }

    pub async fn count(&self, conversation: &ConversationId) -> Result<usize, StoreError> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM messages WHERE conversation_id = ?")
            .bind(conversation.storage_key())
            .fetch_one(self.pool()?)
            .await?;
        Ok(n as usize)
    }

    /// Every conversation with at least one stored message.
    pub async fn conversation_ids(&self) -> Result<Vec<ConversationId>, StoreError> {
        let keys: Vec<String> = sqlx::query_scalar("SELECT DISTINCT conversation_id FROM messages ORDER BY conversation_id")
            .fetch_all(self.pool()?)
            .await?;
        Ok(keys.iter().map(|k| ConversationId::from_storage_key(k)).collect())
    }

    pub async fn clear_conversation(&self, conversation: &ConversationId) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM messages WHERE conversation_id = ?")
            .bind(conversation.storage_key())
            .execute(self.pool()?)
            .await?;
        Ok(())
    }

    pub async fn clear_all(&self) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM messages").execute(self.pool()?).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::StoreConfig;
    use tempfile::{tempdir, TempDir};

    const ALICE: &str = "a11ce0000000000000000000000000000000000000000000000000000000000a";

    async fn open_store(cap: usize) -> (TempDir, Store) {
        let dir = tempdir().unwrap();
        let store = Store::open(
            &dir.path().join("messages.db"),
            StoreConfig {
                max_messages_per_conversation: cap,
            },
        )
        .await
        .expect("open store");
        (dir, store)
    }

    fn msg(sender: &str, payload: &str, conversation: ConversationId) -> NewMessage {
        NewMessage::new(sender, payload, conversation)
    }

    #[tokio::test]
    async fn appends_list_in_order() {
        let (_dir, store) = open_store(100).await;
        store.append(msg("Alice", "hi", ConversationId::Group), false).await.unwrap();
        store.append(msg("Bob", "yo", ConversationId::Group), false).await.unwrap();

        let list = store.list_by_conversation(&ConversationId::Group).await.unwrap();
        let pairs: Vec<_> = list.iter().map(|m| (m.sender.as_str(), m.payload.as_str())).collect();
        assert_eq!(pairs, vec![("Alice", "hi"), ("Bob", "yo")]);
        assert!(list[0].timestamp < list[1].timestamp);
    }

    #[tokio::test]
    async fn empty_conversation_lists_nothing() {
        let (_dir, store) = open_store(100).await;
        assert!(store
            .list_by_conversation(&ConversationId::peer(ALICE))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn cap_evicts_oldest_first() {
        let (_dir, store) = open_store(100).await;
        let group = ConversationId::Group;
        let mut first_ts = None;
        for i in 0..101 {
            let stored = store
                .append_stored(msg("Alice", &format!("m{i}"), group.clone()), false)
                .await
                .unwrap();
            first_ts.get_or_insert(stored.timestamp);
        }

        let list = store.list_by_conversation(&group).await.unwrap();
        assert_eq!(list.len(), 100);
        assert_eq!(list.first().unwrap().payload, "m1");
        assert_eq!(list.last().unwrap().payload, "m100");
        assert!(list.iter().all(|m| Some(m.timestamp) != first_ts));
    }

    #[tokio::test]
    async fn cap_keeps_n_most_recent_for_small_cap() {
        let (_dir, store) = open_store(3).await;
        let peer = ConversationId::peer(ALICE);
        for i in 0..10 {
            store.append(msg("Alice", &i.to_string(), peer.clone()), false).await.unwrap();
        }
        let payloads: Vec<_> = store
            .list_by_conversation(&peer)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.payload)
            .collect();
        assert_eq!(payloads, vec!["7", "8", "9"]);
    }

    #[tokio::test]
    async fn cap_is_per_conversation() {
        let (_dir, store) = open_store(2).await;
        let peer = ConversationId::peer(ALICE);
        for i in 0..5 {
            store.append(msg("a", &i.to_string(), ConversationId::Group), false).await.unwrap();
        }
        store.append(msg("b", "only", peer.clone()), false).await.unwrap();
        assert_eq!(store.count(&ConversationId::Group).await.unwrap(), 2);
        assert_eq!(store.count(&peer).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn concurrent_appends_respect_cap_and_order() {
        let (_dir, store) = open_store(10).await;
        let mut handles = Vec::new();
        for i in 0..40 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .append(msg("x", &i.to_string(), ConversationId::Group), false)
                    .await
            }));
        }
        for h in handles {
            h.await.unwrap().unwrap();
        }
        let list = store.list_by_conversation(&ConversationId::Group).await.unwrap();
        assert_eq!(list.len(), 10);
        assert!(list.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
    }

    #[tokio::test]
    async fn list_all_spans_conversations_in_time_order() {
        let (_dir, store) = open_store(100).await;
        let peer = ConversationId::peer(ALICE);
        store.append(msg("a", "1", ConversationId::Group), false).await.unwrap();
        store.append(msg("b", "2", peer.clone()), false).await.unwrap();
        store.append(msg("c", "3", ConversationId::Group), false).await.unwrap();

        let all = store.list_all().await.unwrap();
        let payloads: Vec<_> = all.iter().map(|m| m.payload.as_str()).collect();
        assert_eq!(payloads, vec!["1", "2", "3"]);
        assert_eq!(all[1].conversation, peer);
        assert!(all.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
    }

    #[tokio::test]
    async fn mark_read_clears_unread() {
        let (_dir, store) = open_store(100).await;
        let peer = ConversationId::peer(ALICE);
        assert!(!store.has_unread(&peer).await.unwrap());

        store.append(msg("Alice", "1", peer.clone()), true).await.unwrap();
        store.append(msg("Me", "2", peer.clone()), false).await.unwrap();
        store.append(msg("Alice", "3", peer.clone()), true).await.unwrap();
        assert!(store.has_unread(&peer).await.unwrap());
        assert!(!store.has_unread(&ConversationId::Group).await.unwrap());

        store.mark_read(&peer).await.unwrap();
        assert!(!store.has_unread(&peer).await.unwrap());
        store.mark_read(&peer).await.unwrap();
        assert!(store
            .list_by_conversation(&peer)
            .await
            .unwrap()
            .iter()
            .all(|m| !m.unread));
    }

    #[tokio::test]
    async fn mark_read_leaves_other_conversations_alone() {
        let (_dir, store) = open_store(100).await;
        let peer = ConversationId::peer(ALICE);
        store.append(msg("Alice", "dm", peer.clone()), true).await.unwrap();
        store.append(msg("Bob", "group", ConversationId::Group), true).await.unwrap();
        store.mark_read(&ConversationId::Group).await.unwrap();
        assert!(store.has_unread(&peer).await.unwrap());
    }

    #[tokio::test]
    async fn clear_conversation_and_all() {
        let (_dir, store) = open_store(100).await;
        let peer = ConversationId::peer(ALICE);
        store.append(msg("a", "g", ConversationId::Group), false).await.unwrap();
        store.append(msg("b", "p", peer.clone()), false).await.unwrap();

        store.clear_conversation(&peer).await.unwrap();
        store.clear_conversation(&peer).await.unwrap();
        assert_eq!(store.count(&peer).await.unwrap(), 0);
        assert_eq!(store.conversation_ids().await.unwrap(), vec![ConversationId::Group]);

        store.clear_all().await.unwrap();
        store.clear_all().await.unwrap();
        assert!(store.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn history_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("messages.db");
        let first_ts = {
            let store = Store::open(&path, StoreConfig::default()).await.unwrap();
            let m = store
                .append_stored(msg("a", "kept", ConversationId::Group), true)
                .await
                .unwrap();
            store.close().await;
            m.timestamp
        };

        let store = Store::open(&path, StoreConfig::default()).await.unwrap();
        let list = store.list_by_conversation(&ConversationId::Group).await.unwrap();
        assert_eq!(list.len(), 1);
        assert!(list[0].unread);
        let next = store
            .append_stored(msg("b", "later", ConversationId::Group), false)
            .await
            .unwrap();
        assert!(next.timestamp > first_ts);
    }

    #[tokio::test]
    async fn operations_after_close_fail_fast() {
        let (_dir, store) = open_store(100).await;
        store.close().await;
        assert!(matches!(
            store.append(msg("a", "b", ConversationId::Group), false).await,
            Err(StoreError::NotInitialised)
        ));
        assert!(matches!(store.list_all().await, Err(StoreError::NotInitialised)));
        assert!(matches!(
            store.has_unread(&ConversationId::Group).await,
            Err(StoreError::NotInitialised)
        ));
    }
}
