use chrono::{DateTime, Utc};
use moor_common::{ClassId, Dbref, ObjectId, PropertyAccess, Value};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Class {
    pub id: ClassId,
    pub name: String,
    pub parent_id: Option<ClassId>,
    pub default_properties: BTreeMap<String, Value>,
    pub description: String,
    pub is_abstract: bool,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub enum PlayerFlag {
    Admin,
    Moderator,
    Programmer,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerData {
    pub password_hash: String,
    pub session_id: Option<String>,
    pub last_login: Option<DateTime<Utc>>,
    pub flags: BTreeSet<PlayerFlag>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Object {
    pub id: ObjectId,
    pub dbref: Dbref,
    pub class_id: Option<ClassId>,
    pub name: String,
    pub aliases: Vec<String>,
    pub instance_properties: BTreeMap<String, Value>,
    pub property_access: BTreeMap<String, PropertyAccess>,
    pub location: Option<ObjectId>,
    pub owner: ObjectId,
    /// `Some` iff this object is a player (spec.md §3.1 "Player — an object
    /// subtype"). Modeled as an optional field rather than a separate
    /// collection-with-foreign-key so that the one `objects` collection
    /// remains the single source of truth for containment/location.
    pub player: Option<PlayerData>,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl Object {
    pub fn is_player(&self) -> bool {
        self.player.is_some()
    }

    pub fn has_flag(&self, flag: PlayerFlag) -> bool {
        self.player.as_ref().is_some_and(|p| p.flags.contains(&flag))
    }

    pub fn is_system_object(&self) -> bool {
        matches!(
            self.instance_properties.get("isSystemObject"),
            Some(Value::Bool(true))
        ) || self.name.eq_ignore_ascii_case("system")
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum Permission {
    Public,
    Owner,
    Wizard,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Verb {
    pub id: ObjectId,
    pub object_id: ObjectId,
    pub name: String,
    pub aliases: Vec<String>,
    pub pattern: Option<String>,
    pub code: String,
    pub permissions: Permission,
    pub description: String,
    pub created_by: ObjectId,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl Verb {
    /// True if `word` matches the verb's name or any whitespace-separated
    /// alias, case-insensitively (spec.md §4.4).
    pub fn matches_name(&self, word: &str) -> bool {
        if self.name.eq_ignore_ascii_case(word) {
            return true;
        }
        self.aliases
            .iter()
            .flat_map(|a| a.split_whitespace())
            .any(|a| a.eq_ignore_ascii_case(word))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Function {
    pub id: ObjectId,
    pub object_id: ObjectId,
    pub name: String,
    pub parameter_types: Vec<String>,
    pub parameter_names: Vec<String>,
    pub return_type: String,
    pub code: String,
    pub permissions: Permission,
    pub description: String,
    pub metadata: BTreeMap<String, String>,
    pub created_by: ObjectId,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}
