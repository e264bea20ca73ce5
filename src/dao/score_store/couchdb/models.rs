use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::{dao::models::ScoreEntity, game::Difficulty};

use super::error::CouchDaoError;

pub const SCORE_PREFIX: &str = "score::";
pub const END_SUFFIX: &str = "\u{ffff}";

#[derive(Debug, Deserialize)]
pub struct AllDocsResponse {
    pub rows: Vec<AllDocsRow>,
}

#[derive(Debug, Deserialize)]
pub struct AllDocsRow {
    pub id: String,
    #[serde(default)]
    pub doc: Option<Value>,
}

/// `score::{uuid}` document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouchScoreDocument {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_rev", skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    pub player_name: String,
    pub score: u32,
    pub difficulty: Difficulty,
    pub time_taken: u32,
    pub created_at: SystemTime,
}

pub fn score_doc_id(id: Uuid) -> String {
    format!("{SCORE_PREFIX}{id}")
}

impl From<&ScoreEntity> for CouchScoreDocument {
    fn from(score: &ScoreEntity) -> Self {
        Self {
            id: score_doc_id(score.id),
            rev: None,
            player_name: score.player_name.clone(),
            score: score.score,
            difficulty: score.difficulty,
            time_taken: score.time_taken,
            created_at: score.created_at,
        }
    }
}

impl CouchScoreDocument {
    /// Decode an `_all_docs` row body.
    pub fn from_row(doc_id: &str, doc: Value) -> Result<Self, CouchDaoError> {
        serde_json::from_value(doc).map_err(|source| CouchDaoError::InvalidDocument {
            doc_id: doc_id.to_owned(),
            source,
        })
    }

    /// Rebuild the entity; a malformed id yields a fresh one rather than
    /// dropping the row.
    pub fn into_entity(self) -> ScoreEntity {
        let id = self
            .id
            .strip_prefix(SCORE_PREFIX)
            .and_then(|raw| Uuid::parse_str(raw).ok())
            .unwrap_or_else(Uuid::new_v4);
        ScoreEntity {
            id,
            player_name: self.player_name,
            score: self.score,
            difficulty: self.difficulty,
            time_taken: self.time_taken,
            created_at: self.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_round_trips_entity_fields() {
        let entity = ScoreEntity {
            id: Uuid::new_v4(),
            player_name: "ada".into(),
            score: 1491,
            difficulty: Difficulty::Normal,
            time_taken: 3,
            created_at: SystemTime::UNIX_EPOCH,
        };
        let doc = CouchScoreDocument::from(&entity);
        assert!(doc.id.starts_with(SCORE_PREFIX));

        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value["_id"], doc.id.as_str());
        assert!(value.get("_rev").is_none());

        let decoded = CouchScoreDocument::from_row(&doc.id, value).unwrap();
        assert_eq!(decoded.into_entity(), entity);
    }

    #[test]
    fn malformed_body_is_reported_with_its_id() {
        let err = CouchScoreDocument::from_row("score::x", serde_json::json!({ "score": "high" }))
            .unwrap_err();
        assert!(matches!(err, CouchDaoError::InvalidDocument { doc_id, .. } if doc_id == "score::x"));
    }
}
