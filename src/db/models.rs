use sqlx::types::Json;
use std::collections::HashMap;
use uuid::Uuid;

/// A stored poll.
///
/// Backed by `polls (id UUID PRIMARY KEY, title TEXT, options TEXT[],
/// results JSONB NOT NULL DEFAULT '{}')`. `results` maps option name to the
/// number of votes flushed so far.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Poll {
    pub id: Uuid,
    pub title: String,
    pub options: Vec<String>,
    pub results: Json<HashMap<String, i64>>,
}
