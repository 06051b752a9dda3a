//! PostgreSQL implementation of ChatRepository.
//!
//! Sessions live in `chat_sessions`, messages in `chat_messages` keyed by
//! `(session_id, id)`. Schema: `migrations/20260101000000_chat.sql`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::domain::chat::{
    ChatMessage, ChatSession, ChatSessionStatus, SenderType, Viewer, Visitor,
};
use crate::domain::foundation::{
    ChatSessionId, ClientMessageId, DomainError, ErrorCode, MessageId, SessionKey, Timestamp,
    UserId,
};
use crate::ports::ChatRepository;

const SESSION_COLUMNS: &str = "id, session_key, visitor_user_id, visitor_anonymous_id, status, \
     assigned_agent_id, started_at, ended_at, last_message_id, last_activity_at";

const MESSAGE_COLUMNS: &str =
    "session_id, id, body, sender_type, sender_id, created_at, is_read, client_message_id";

/// PostgreSQL implementation of ChatRepository.
#[derive(Clone)]
pub struct PostgresChatRepository {
    pool: PgPool,
}

impl PostgresChatRepository {
    /// Creates a new PostgresChatRepository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies the embedded schema migrations.
    pub async fn migrate(&self) -> Result<(), DomainError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| DomainError::database("Failed to run chat migrations", e))
    }

    async fn update_session_with<'e, E>(executor: E, session: &ChatSession) -> Result<(), DomainError>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE chat_sessions SET
                status = $2,
                assigned_agent_id = $3,
                ended_at = $4,
                last_message_id = $5,
                last_activity_at = $6
            WHERE session_key = $1
            "#,
        )
        .bind(session.session_key().as_str())
        .bind(session.status().as_str())
        .bind(session.assigned_agent().map(|id| id.value()))
        .bind(session.ended_at().map(|t| *t.as_datetime()))
        .bind(session.last_message_id().map(|id| id.value()))
        .bind(session.last_activity_at().as_datetime())
        .execute(executor)
        .await
        .map_err(|e| DomainError::database("Failed to update chat session", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::SessionNotFound,
                format!("Chat session not found: {}", session.session_key()),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl ChatRepository for PostgresChatRepository {
    async fn create_session(&self, visitor: &Visitor) -> Result<ChatSession, DomainError> {
        let key = SessionKey::generate();
        let now = Timestamp::now();
        let (user_id, anonymous_id) = visitor_columns(visitor);

        let row = sqlx::query(
            r#"
            INSERT INTO chat_sessions (
                session_key, visitor_user_id, visitor_anonymous_id, status,
                started_at, last_activity_at
            ) VALUES ($1, $2, $3, 'active', $4, $4)
            RETURNING id
            "#,
        )
        .bind(key.as_str())
        .bind(user_id)
        .bind(anonymous_id)
        .bind(now.as_datetime())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to insert chat session", e))?;

        let id: i64 = column(&row, "id")?;
        Ok(ChatSession::reconstitute(
            ChatSessionId::new(id),
            key,
            visitor.clone(),
            ChatSessionStatus::Active,
            None,
            now,
            None,
            None,
            now,
        ))
    }

    async fn find_by_key(&self, key: &SessionKey) -> Result<Option<ChatSession>, DomainError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM chat_sessions WHERE session_key = $1",
            SESSION_COLUMNS
        ))
        .bind(key.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to fetch chat session", e))?;

        row.map(|r| row_to_session(&r)).transpose()
    }

    async fn find_open_for_visitor(
        &self,
        visitor: &Visitor,
        active_since: &Timestamp,
    ) -> Result<Option<ChatSession>, DomainError> {
        let (user_id, anonymous_id) = visitor_columns(visitor);
        let row = sqlx::query(&format!(
            r#"
            SELECT {} FROM chat_sessions
            WHERE status <> 'ended'
              AND last_activity_at >= $3
              AND ((visitor_user_id = $1) OR (visitor_anonymous_id = $2))
            ORDER BY last_activity_at DESC, id DESC
            LIMIT 1
            "#,
            SESSION_COLUMNS
        ))
        .bind(user_id)
        .bind(anonymous_id)
        .bind(active_since.as_datetime())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to find open chat session", e))?;

        row.map(|r| row_to_session(&r)).transpose()
    }

    async fn update_session(&self, session: &ChatSession) -> Result<(), DomainError> {
        Self::update_session_with(&self.pool, session).await
    }

    async fn append_message(
        &self,
        session: &ChatSession,
        message: &ChatMessage,
    ) -> Result<(), DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DomainError::database("Failed to begin transaction", e))?;

        sqlx::query(
            r#"
            INSERT INTO chat_messages (
                session_id, id, body, sender_type, sender_id, created_at, is_read,
                client_message_id
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(message.session_id.value())
        .bind(message.id.value())
        .bind(&message.body)
        .bind(message.sender_type.as_str())
        .bind(message.sender_id.map(|id| id.value()))
        .bind(message.created_at.as_datetime())
        .bind(message.is_read)
        .bind(message.client_message_id.map(|id| *id.as_uuid()))
        .execute(&mut *tx)
        .await
        .map_err(|e| DomainError::database("Failed to insert chat message", e))?;

        Self::update_session_with(&mut *tx, session).await?;

        tx.commit()
            .await
            .map_err(|e| DomainError::database("Failed to commit chat message", e))
    }

    async fn list_messages(
        &self,
        session_id: ChatSessionId,
        since: Option<MessageId>,
    ) -> Result<Vec<ChatMessage>, DomainError> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {} FROM chat_messages
            WHERE session_id = $1 AND ($2::BIGINT IS NULL OR id > $2)
            ORDER BY id ASC
            "#,
            MESSAGE_COLUMNS
        ))
        .bind(session_id.value())
        .bind(since.map(|id| id.value()))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to list chat messages", e))?;

        rows.iter().map(row_to_message).collect()
    }

    async fn mark_read(
        &self,
        session_id: ChatSessionId,
        viewer: Viewer,
        up_to: Option<MessageId>,
    ) -> Result<u64, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE chat_messages SET is_read = TRUE
            WHERE session_id = $1
              AND NOT is_read
              AND sender_type = ANY($2)
              AND ($3::BIGINT IS NULL OR id <= $3)
            "#,
        )
        .bind(session_id.value())
        .bind(sender_types(viewer))
        .bind(up_to.map(|id| id.value()))
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to mark chat messages read", e))?;

        Ok(result.rows_affected())
    }

    async fn unread_count(
        &self,
        session_id: ChatSessionId,
        viewer: Viewer,
    ) -> Result<u64, DomainError> {
        let (count,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM chat_messages
            WHERE session_id = $1 AND NOT is_read AND sender_type = ANY($2)
            "#,
        )
        .bind(session_id.value())
        .bind(sender_types(viewer))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to count unread chat messages", e))?;

        Ok(count.max(0) as u64)
    }

    async fn list_sessions(&self, include_ended: bool) -> Result<Vec<ChatSession>, DomainError> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {} FROM chat_sessions
            WHERE $1 OR status <> 'ended'
            ORDER BY last_activity_at DESC, id DESC
            "#,
            SESSION_COLUMNS
        ))
        .bind(include_ended)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to list chat sessions", e))?;

        rows.iter().map(row_to_session).collect()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Row mapping
// ─────────────────────────────────────────────────────────────────────────────

fn visitor_columns(visitor: &Visitor) -> (Option<i64>, Option<String>) {
    match visitor {
        Visitor::User { user_id } => (Some(user_id.value()), None),
        Visitor::Anonymous { anonymous_id } => (None, Some(anonymous_id.clone())),
    }
}

fn visitor_from_columns(
    user_id: Option<i64>,
    anonymous_id: Option<String>,
) -> Result<Visitor, DomainError> {
    match (user_id, anonymous_id) {
        (Some(id), None) => Ok(Visitor::user(UserId::new(id))),
        (None, Some(anonymous_id)) => Ok(Visitor::anonymous(anonymous_id)),
        _ => Err(DomainError::new(
            ErrorCode::DatabaseError,
            "Chat session row must have exactly one visitor identity",
        )),
    }
}

fn sender_types(viewer: Viewer) -> Vec<String> {
    viewer
        .incoming_sender_types()
        .iter()
        .map(|s| s.as_str().to_string())
        .collect()
}

fn column<'r, T>(row: &'r PgRow, name: &str) -> Result<T, DomainError>
where
    T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
{
    row.try_get(name)
        .map_err(|e| DomainError::database(&format!("Failed to get {}", name), e))
}

fn row_to_session(row: &PgRow) -> Result<ChatSession, DomainError> {
    let key: String = column(row, "session_key")?;
    let key = SessionKey::new(key).map_err(|e| DomainError::database("Invalid session_key", e))?;

    let status: String = column(row, "status")?;
    let status = ChatSessionStatus::parse(&status).ok_or_else(|| {
        DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid chat session status: {}", status),
        )
    })?;

    let started_at: DateTime<Utc> = column(row, "started_at")?;
    let ended_at: Option<DateTime<Utc>> = column(row, "ended_at")?;
    let last_activity_at: DateTime<Utc> = column(row, "last_activity_at")?;
    let assigned_agent: Option<i64> = column(row, "assigned_agent_id")?;
    let last_message_id: Option<i64> = column(row, "last_message_id")?;

    Ok(ChatSession::reconstitute(
        ChatSessionId::new(column(row, "id")?),
        key,
        visitor_from_columns(
            column(row, "visitor_user_id")?,
            column(row, "visitor_anonymous_id")?,
        )?,
        status,
        assigned_agent.map(UserId::new),
        Timestamp::from_datetime(started_at),
        ended_at.map(Timestamp::from_datetime),
        last_message_id.map(MessageId::new),
        Timestamp::from_datetime(last_activity_at),
    ))
}

fn row_to_message(row: &PgRow) -> Result<ChatMessage, DomainError> {
    let sender_type: String = column(row, "sender_type")?;
    let sender_type = SenderType::parse(&sender_type).ok_or_else(|| {
        DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid sender_type: {}", sender_type),
        )
    })?;
    let sender_id: Option<i64> = column(row, "sender_id")?;
    let created_at: DateTime<Utc> = column(row, "created_at")?;
    let client_message_id: Option<Uuid> = column(row, "client_message_id")?;

    Ok(ChatMessage {
        id: MessageId::new(column(row, "id")?),
        session_id: ChatSessionId::new(column(row, "session_id")?),
        body: column(row, "body")?,
        sender_type,
        sender_id: sender_id.map(UserId::new),
        created_at: Timestamp::from_datetime(created_at),
        is_read: column(row, "is_read")?,
        client_message_id: client_message_id.map(ClientMessageId::from_uuid),
    })
}
