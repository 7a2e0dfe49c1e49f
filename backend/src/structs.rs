use std::convert::Infallible;
use std::fmt;

use rocket::data::{self, Data, FromData, Limits};
use rocket::http::Status;
use rocket::request::{FromParam, Request};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Note {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub user: String,
}

pub type NoteVector = Vec<Note>;

/// Body of create and replace requests. Absent or `null` fields are stored as
/// empty strings, other scalars as their JSON text.
#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct NoteInput {
    #[serde(deserialize_with = "loose_string")]
    pub title: String,
    #[serde(deserialize_with = "loose_string")]
    pub content: String,
    #[serde(deserialize_with = "loose_string")]
    pub user: String,
}

/// Body of a partial update. Absent or `null` fields keep the stored value.
#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct NotePatch {
    #[serde(deserialize_with = "loose_optional_string")]
    pub title: Option<String>,
    #[serde(deserialize_with = "loose_optional_string")]
    pub content: Option<String>,
    #[serde(deserialize_with = "loose_optional_string")]
    pub user: Option<String>,
}

fn loose_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(loose_optional_string(deserializer)?.unwrap_or_default())
}

fn loose_optional_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => None,
        Value::String(text) => Some(text),
        other => Some(other.to_string()),
    })
}

#[derive(Debug, Error)]
pub enum BodyError {
    #[error("failed reading request body: {0}")]
    Io(#[from] std::io::Error),
    #[error("request body exceeds the json limit")]
    TooLarge,
    #[error("request body is not valid json: {0}")]
    Json(#[from] serde_json::Error),
}

/// JSON request body where an empty payload reads as `{}`.
pub struct NoteBody<T>(pub T);

impl<T> NoteBody<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

#[rocket::async_trait]
impl<'r, T: DeserializeOwned + Default> FromData<'r> for NoteBody<T> {
    type Error = BodyError;

    async fn from_data(request: &'r Request<'_>, data: Data<'r>) -> data::Outcome<'r, Self> {
        let limit = request.limits().get("json").unwrap_or(Limits::JSON);
        let raw = match data.open(limit).into_string().await {
            Ok(raw) if raw.is_complete() => raw.into_inner(),
            Ok(_) => return data::Outcome::Error((Status::PayloadTooLarge, BodyError::TooLarge)),
            Err(e) => return data::Outcome::Error((Status::BadRequest, e.into())),
        };

        if raw.trim().is_empty() {
            return data::Outcome::Success(NoteBody(T::default()));
        }
        match serde_json::from_str(&raw) {
            Ok(body) => data::Outcome::Success(NoteBody(body)),
            Err(e) => data::Outcome::Error((Status::BadRequest, e.into())),
        }
    }
}

impl NotePatch {
    pub fn apply(self, note: &Note) -> NoteInput {
        NoteInput {
            title: self.title.unwrap_or_else(|| note.title.clone()),
            content: self.content.unwrap_or_else(|| note.content.clone()),
            user: self.user.unwrap_or_else(|| note.user.clone()),
        }
    }
}

/// Note ID taken from the path. Parses a leading integer and ignores the rest,
/// so `12abc` is note 12. Anything without leading digits becomes `NaN` and
/// matches no note. A digit run too long for `i64` matches nothing either but
/// still prints as a number.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteId {
    value: Option<i64>,
    shown: String,
}

impl NoteId {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim_start();
        let negative = trimmed.starts_with('-');
        let unsigned = trimmed.strip_prefix(|c: char| c == '+' || c == '-').unwrap_or(trimmed);
        let digits = &unsigned[..unsigned.find(|c: char| !c.is_ascii_digit()).unwrap_or(unsigned.len())];

        if digits.is_empty() {
            return NoteId { value: None, shown: "NaN".to_string() };
        }

        let significant = match digits.trim_start_matches('0') {
            "" => "0",
            rest => rest,
        };
        let shown = if negative && significant != "0" {
            format!("-{}", significant)
        } else {
            significant.to_string()
        };

        NoteId { value: shown.parse().ok(), shown }
    }

    pub fn value(&self) -> Option<i64> {
        self.value
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.shown)
    }
}

impl<'a> FromParam<'a> for NoteId {
    type Error = Infallible;

    fn from_param(param: &'a str) -> Result<Self, Self::Error> {
        Ok(NoteId::parse(param))
    }
}
