use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

pub const AUTHORS_COLLECTION: &str = "authors";

/// The author fields embedded in post responses. Authors are managed elsewhere.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Author {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
}
