//! Entities and schema shared by the SQLite integration tests.

#![allow(dead_code)]

use sqlchain::prelude::*;
use sqlchain_sqlite::SqliteConnection;

pub const NOW: i64 = 1_700_000_000_000_000;

const SCHEMA: &str = "
    CREATE TABLE heroes (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        age INTEGER,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL
    );
    CREATE TABLE profiles (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        hero_id INTEGER NOT NULL DEFAULT 0,
        bio TEXT NOT NULL
    );
    CREATE TABLE audit_log (message TEXT NOT NULL);
    CREATE TABLE notes (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        body TEXT NOT NULL,
        status TEXT NOT NULL DEFAULT 'draft'
    );
    CREATE TABLE flags (
        key TEXT NOT NULL UNIQUE,
        state TEXT NOT NULL DEFAULT 'off'
    );
    CREATE TABLE teams (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL
    );
    CREATE TABLE members (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        team_id INTEGER NOT NULL DEFAULT 0
    );
    CREATE TABLE tags (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        label TEXT NOT NULL UNIQUE
    );
    CREATE TABLE team_tags (
        team_id INTEGER NOT NULL,
        tag_id INTEGER NOT NULL
    );
";

pub fn open_db() -> SqliteConnection {
    let conn = SqliteConnection::open_in_memory().expect("open sqlite memory db");
    conn.execute_batch(SCHEMA).expect("create schema");
    conn
}

pub fn engine() -> Engine {
    Engine::builder()
        .dialect(Sqlite::new())
        .clock(Clock::fixed(NOW))
        .build()
}

pub fn count(conn: &SqliteConnection, table: &str) -> i64 {
    let sql = format!("SELECT COUNT(*) FROM {}", table);
    conn.query_one(&sql, &[])
        .expect("count query")
        .and_then(|row| row.get(0).and_then(Value::as_i64))
        .expect("count value")
}

fn int(column: &str, value: &Value) -> Result<i64> {
    value
        .as_i64()
        .ok_or_else(|| sqlchain_core::type_mismatch(column, "integer", value))
}

fn text(value: &Value) -> String {
    value.as_str().unwrap_or_default().to_string()
}

/// Hero with timestamps and hooks that can be told to fail or to write audit rows.
#[derive(Debug, Default)]
pub struct Hero {
    pub id: i64,
    pub name: String,
    pub age: Option<i32>,
    pub created_at: i64,
    pub updated_at: i64,
    pub hooks_seen: Vec<&'static str>,
    pub fail_in: Option<&'static str>,
    pub audit: bool,
    pub profile: Option<Box<Profile>>,
}

impl Hero {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    fn hook(&mut self, hook: &'static str) -> Result<()> {
        self.hooks_seen.push(hook);
        if self.fail_in == Some(hook) {
            return Err(Error::custom(format!("{} is not allowed", self.name)));
        }
        Ok(())
    }
}

impl Entity for Hero {
    fn table_name(&self) -> &str {
        "heroes"
    }

    fn field_infos(&self) -> &'static [FieldInfo] {
        static FIELDS: &[FieldInfo] = &[
            FieldInfo::new("id", "id").primary_key(true),
            FieldInfo::new("name", "name"),
            FieldInfo::new("age", "age"),
            FieldInfo::new("created_at", "created_at"),
            FieldInfo::new("updated_at", "updated_at"),
            FieldInfo::relation(
                "profile",
                RelationshipInfo::has_one("profiles").foreign_keys(&["hero_id"]),
            ),
        ];
        FIELDS
    }

    fn has_related(&self, field: &str) -> bool {
        field == "profile" && self.profile.is_some()
    }

    fn related_mut(&mut self, field: &str) -> Vec<&mut dyn Entity> {
        match (field, self.profile.as_deref_mut()) {
            ("profile", Some(profile)) => vec![profile as &mut dyn Entity],
            _ => Vec::new(),
        }
    }

    fn column_value(&self, column: &str) -> Value {
        match column {
            "id" => Value::BigInt(self.id),
            "name" => Value::Text(self.name.clone()),
            "age" => self.age.map_or(Value::Null, Value::Int),
            "created_at" => Value::Timestamp(self.created_at),
            "updated_at" => Value::Timestamp(self.updated_at),
            _ => Value::Null,
        }
    }

    fn set_column(&mut self, column: &str, value: Value) -> Result<()> {
        match column {
            "id" => self.id = int(column, &value)?,
            "name" => self.name = text(&value),
            "age" => {
                self.age = match value {
                    Value::Null => None,
                    ref v => Some(
                        i32::try_from(int(column, v)?)
                            .map_err(|_| sqlchain_core::type_mismatch(column, "INTEGER", v))?,
                    ),
                };
            }
            "created_at" => self.created_at = int(column, &value)?,
            "updated_at" => self.updated_at = int(column, &value)?,
            _ => return Err(Error::field(column, "unknown column")),
        }
        Ok(())
    }

    fn hooks(&mut self) -> Option<&mut dyn CreateHooks> {
        Some(self)
    }
}

impl CreateHooks for Hero {
    fn before_save(&mut self, _cx: &HookContext<'_>) -> Result<()> {
        self.hook("before_save")
    }

    fn before_create(&mut self, _cx: &HookContext<'_>) -> Result<()> {
        self.name = self.name.trim().to_string();
        self.hook("before_create")
    }

    fn after_create(&mut self, cx: &HookContext<'_>) -> Result<()> {
        if self.audit {
            cx.execute(
                "INSERT INTO audit_log (message) VALUES (?)",
                &[Value::Text(format!("created hero {}", self.id))],
            )?;
        }
        self.hook("after_create")
    }

    fn after_save(&mut self, _cx: &HookContext<'_>) -> Result<()> {
        self.hook("after_save")
    }
}

/// The dependent side of a hero's has-one profile.
#[derive(Debug, Default)]
pub struct Profile {
    pub id: i64,
    pub hero_id: i64,
    pub bio: String,
}

impl Profile {
    pub fn new(bio: &str) -> Self {
        Self {
            bio: bio.to_string(),
            ..Self::default()
        }
    }
}

impl Entity for Profile {
    fn table_name(&self) -> &str {
        "profiles"
    }

    fn field_infos(&self) -> &'static [FieldInfo] {
        static FIELDS: &[FieldInfo] = &[
            FieldInfo::new("id", "id").primary_key(true),
            FieldInfo::new("hero_id", "hero_id"),
            FieldInfo::new("bio", "bio"),
        ];
        FIELDS
    }

    fn column_value(&self, column: &str) -> Value {
        match column {
            "id" => Value::BigInt(self.id),
            "hero_id" => Value::BigInt(self.hero_id),
            "bio" => Value::Text(self.bio.clone()),
            _ => Value::Null,
        }
    }

    fn set_column(&mut self, column: &str, value: Value) -> Result<()> {
        match column {
            "id" => self.id = int(column, &value)?,
            "hero_id" => self.hero_id = int(column, &value)?,
            "bio" => self.bio = text(&value),
            _ => return Err(Error::field(column, "unknown column")),
        }
        Ok(())
    }
}

/// Note whose `status` is filled in by the database.
#[derive(Debug, Default)]
pub struct Note {
    pub id: i64,
    pub body: String,
    pub status: String,
}

impl Note {
    pub fn new(body: &str) -> Self {
        Self {
            body: body.to_string(),
            ..Self::default()
        }
    }
}

impl Entity for Note {
    fn table_name(&self) -> &str {
        "notes"
    }

    fn field_infos(&self) -> &'static [FieldInfo] {
        static FIELDS: &[FieldInfo] = &[
            FieldInfo::new("id", "id").primary_key(true),
            FieldInfo::new("body", "body"),
            FieldInfo::new("status", "status").default("'draft'"),
        ];
        FIELDS
    }

    fn column_value(&self, column: &str) -> Value {
        match column {
            "id" => Value::BigInt(self.id),
            "body" => Value::Text(self.body.clone()),
            "status" => Value::Text(self.status.clone()),
            _ => Value::Null,
        }
    }

    fn set_column(&mut self, column: &str, value: Value) -> Result<()> {
        match column {
            "id" => self.id = int(column, &value)?,
            "body" => self.body = text(&value),
            "status" => self.status = text(&value),
            _ => return Err(Error::field(column, "unknown column")),
        }
        Ok(())
    }
}

/// Keyless row identified by a unique column, with a defaulted `state`.
#[derive(Debug, Default)]
pub struct Flag {
    pub key: String,
    pub state: String,
}

impl Entity for Flag {
    fn table_name(&self) -> &str {
        "flags"
    }

    fn field_infos(&self) -> &'static [FieldInfo] {
        static FIELDS: &[FieldInfo] = &[
            FieldInfo::new("key", "key").unique(true),
            FieldInfo::new("state", "state").default("'off'"),
        ];
        FIELDS
    }

    fn column_value(&self, column: &str) -> Value {
        match column {
            "key" => Value::Text(self.key.clone()),
            "state" => Value::Text(self.state.clone()),
            _ => Value::Null,
        }
    }

    fn set_column(&mut self, column: &str, value: Value) -> Result<()> {
        match column {
            "key" => self.key = text(&value),
            "state" => self.state = text(&value),
            _ => return Err(Error::field(column, "unknown column")),
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct Team {
    pub id: i64,
    pub name: String,
    pub members: Vec<Member>,
    pub tags: Vec<Tag>,
}

impl Team {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }
}

impl Entity for Team {
    fn table_name(&self) -> &str {
        "teams"
    }

    fn field_infos(&self) -> &'static [FieldInfo] {
        static FIELDS: &[FieldInfo] = &[
            FieldInfo::new("id", "id").primary_key(true),
            FieldInfo::new("name", "name"),
            FieldInfo::relation(
                "members",
                RelationshipInfo::has_many("members").foreign_keys(&["team_id"]),
            ),
            FieldInfo::relation(
                "tags",
                RelationshipInfo::many_to_many(
                    "tags",
                    LinkTableInfo::new("team_tags", "team_id", "tag_id"),
                ),
            ),
        ];
        FIELDS
    }

    fn column_value(&self, column: &str) -> Value {
        match column {
            "id" => Value::BigInt(self.id),
            "name" => Value::Text(self.name.clone()),
            _ => Value::Null,
        }
    }

    fn has_related(&self, field: &str) -> bool {
        match field {
            "members" => !self.members.is_empty(),
            "tags" => !self.tags.is_empty(),
            _ => false,
        }
    }

    fn set_column(&mut self, column: &str, value: Value) -> Result<()> {
        match column {
            "id" => self.id = int(column, &value)?,
            "name" => self.name = text(&value),
            _ => return Err(Error::field(column, "unknown column")),
        }
        Ok(())
    }

    fn related_mut(&mut self, field: &str) -> Vec<&mut dyn Entity> {
        match field {
            "members" => self
                .members
                .iter_mut()
                .map(|m| m as &mut dyn Entity)
                .collect(),
            "tags" => self.tags.iter_mut().map(|t| t as &mut dyn Entity).collect(),
            _ => Vec::new(),
        }
    }
}

#[derive(Debug, Default)]
pub struct Member {
    pub id: i64,
    pub name: String,
    pub team_id: i64,
    pub team: Option<Box<Team>>,
    pub hooks_seen: Vec<&'static str>,
    pub reject: bool,
}

impl Member {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }
}

impl Entity for Member {
    fn table_name(&self) -> &str {
        "members"
    }

    fn field_infos(&self) -> &'static [FieldInfo] {
        static FIELDS: &[FieldInfo] = &[
            FieldInfo::new("id", "id").primary_key(true),
            FieldInfo::new("name", "name"),
            FieldInfo::new("team_id", "team_id"),
            FieldInfo::relation(
                "team",
                RelationshipInfo::belongs_to("teams").foreign_keys(&["team_id"]),
            ),
        ];
        FIELDS
    }

    fn column_value(&self, column: &str) -> Value {
        match column {
            "id" => Value::BigInt(self.id),
            "name" => Value::Text(self.name.clone()),
            "team_id" => Value::BigInt(self.team_id),
            _ => Value::Null,
        }
    }

    fn has_related(&self, field: &str) -> bool {
        field == "team" && self.team.is_some()
    }

    fn set_column(&mut self, column: &str, value: Value) -> Result<()> {
        match column {
            "id" => self.id = int(column, &value)?,
            "name" => self.name = text(&value),
            "team_id" => self.team_id = int(column, &value)?,
            _ => return Err(Error::field(column, "unknown column")),
        }
        Ok(())
    }

    fn related_mut(&mut self, field: &str) -> Vec<&mut dyn Entity> {
        match (field, self.team.as_deref_mut()) {
            ("team", Some(team)) => vec![team as &mut dyn Entity],
            _ => Vec::new(),
        }
    }

    fn hooks(&mut self) -> Option<&mut dyn CreateHooks> {
        Some(self)
    }
}

impl CreateHooks for Member {
    fn before_create(&mut self, _cx: &HookContext<'_>) -> Result<()> {
        self.hooks_seen.push("before_create");
        if self.reject {
            return Err(Error::custom("member rejected"));
        }
        Ok(())
    }

    fn after_create(&mut self, _cx: &HookContext<'_>) -> Result<()> {
        self.hooks_seen.push("after_create");
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct Tag {
    pub id: i64,
    pub label: String,
}

impl Tag {
    pub fn new(label: &str) -> Self {
        Self {
            id: 0,
            label: label.to_string(),
        }
    }
}

impl Entity for Tag {
    fn table_name(&self) -> &str {
        "tags"
    }

    fn field_infos(&self) -> &'static [FieldInfo] {
        static FIELDS: &[FieldInfo] = &[
            FieldInfo::new("id", "id").primary_key(true),
            FieldInfo::new("label", "label").unique(true),
        ];
        FIELDS
    }

    fn column_value(&self, column: &str) -> Value {
        match column {
            "id" => Value::BigInt(self.id),
            "label" => Value::Text(self.label.clone()),
            _ => Value::Null,
        }
    }

    fn set_column(&mut self, column: &str, value: Value) -> Result<()> {
        match column {
            "id" => self.id = int(column, &value)?,
            "label" => self.label = text(&value),
            _ => return Err(Error::field(column, "unknown column")),
        }
        Ok(())
    }
}
