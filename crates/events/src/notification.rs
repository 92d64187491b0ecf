//! Notification record.
//!
//! Notifications are append-only. The only permitted mutation after insert is
//! the one-way `is_sent` flag (false → true).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use pharmacy_core::{
    Column, ColumnType, DomainError, DomainResult, Entity, EntityKind, NotificationId, Reference,
    Row, UserId,
};

use crate::event::Event;

/// Maximum stored message length, in characters.
pub const MAX_MESSAGE_LEN: usize = 255;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub user_id: UserId,
    pub message: String,
    pub is_sent: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub version: u64,
}

impl Notification {
    /// Unsaved, unsent notification. Messages longer than
    /// [`MAX_MESSAGE_LEN`] characters are cut on a character boundary.
    pub fn new(user_id: UserId, message: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: NotificationId::UNASSIGNED,
            user_id,
            message: truncate_chars(message.into(), MAX_MESSAGE_LEN),
            is_sent: false,
            created_at,
            version: 0,
        }
    }

    pub fn from_event<E: Event>(event: &E) -> Self {
        Self::new(event.recipient(), event.message(), event.occurred_at())
    }

    /// Flip the delivery flag. Returns `false` if it was already set.
    pub fn mark_sent(&mut self) -> bool {
        if self.is_sent {
            return false;
        }
        self.is_sent = true;
        true
    }
}

fn truncate_chars(mut s: String, max: usize) -> String {
    if let Some((byte_idx, _)) = s.char_indices().nth(max) {
        s.truncate(byte_idx);
    }
    s
}

impl Entity for Notification {
    type Id = NotificationId;

    const KIND: EntityKind = EntityKind::Notification;

    const COLUMNS: &'static [Column] = &[
        Column::required("user_id", ColumnType::Int),
        Column::required("message", ColumnType::Text),
        Column::required("is_sent", ColumnType::Bool),
        Column::required("created_at", ColumnType::Timestamp),
    ];

    const REFERENCES: &'static [Reference] = &[Reference::new("user_id", EntityKind::User)];

    fn id(&self) -> NotificationId {
        self.id
    }

    fn version(&self) -> u64 {
        self.version
    }

    fn to_row(&self) -> Row {
        Row::new()
            .with("user_id", self.user_id.get())
            .with("message", self.message.as_str())
            .with("is_sent", self.is_sent)
            .with("created_at", self.created_at)
    }

    fn from_row(id: NotificationId, version: u64, row: &Row) -> DomainResult<Self> {
        let message = row.text("message")?;
        if message.chars().count() > MAX_MESSAGE_LEN {
            return Err(DomainError::decode(format!(
                "notification {id} message exceeds {MAX_MESSAGE_LEN} characters"
            )));
        }
        Ok(Self {
            id,
            user_id: UserId::new(row.int("user_id")?),
            message,
            is_sent: row.bool("is_sent")?,
            created_at: row.timestamp("created_at")?,
            version,
        })
    }
}
