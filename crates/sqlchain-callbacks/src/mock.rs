//! Recording connection and sample entities for unit tests.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::sync::Arc;

use sqlchain_core::{
    Connection, CreateHooks, Dialect, Entity, Error, ExecResult, FieldInfo, HookContext,
    LinkTableInfo, QueryError, QueryErrorKind, RelationshipInfo, Result, Row, Sqlite, Transaction,
    Value, type_mismatch,
};

use crate::pipeline::{Clock, Pipeline};
use crate::registry::CallbackRegistry;

pub(crate) const NOW: i64 = 1_700_000_000_000_000;

pub(crate) fn pipeline_with(registry: CallbackRegistry) -> Pipeline {
    pipeline_with_dialect(registry, Arc::new(Sqlite::new()))
}

pub(crate) fn pipeline_with_dialect(registry: CallbackRegistry, dialect: Arc<dyn Dialect>) -> Pipeline {
    Pipeline::new(registry.compile(), dialect).clock(Clock::fixed(NOW))
}

#[derive(Default)]
struct MockState {
    statements: Vec<(String, Vec<Value>)>,
    events: Vec<&'static str>,
    next_id: i64,
    rows: VecDeque<Row>,
    no_last_insert_id: bool,
    insert_nothing: bool,
    fail_on: Option<String>,
    fail_begin: bool,
    fail_commit: bool,
    fail_rollback: bool,
}

/// Records every statement; INSERTs hand out sequential ids.
#[derive(Default)]
pub(crate) struct MockConnection {
    state: RefCell<MockState>,
}

impl MockConnection {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn without_last_insert_id(self) -> Self {
        self.state.borrow_mut().no_last_insert_id = true;
        self
    }

    /// INSERTs change no rows but still report a leftover id, like a
    /// driver after `INSERT OR IGNORE`.
    pub(crate) fn inserting_nothing(self) -> Self {
        self.state.borrow_mut().insert_nothing = true;
        self
    }

    pub(crate) fn failing_on(self, fragment: &str) -> Self {
        self.state.borrow_mut().fail_on = Some(fragment.to_string());
        self
    }

    pub(crate) fn failing_begin(self) -> Self {
        self.state.borrow_mut().fail_begin = true;
        self
    }

    pub(crate) fn failing_commit(self) -> Self {
        self.state.borrow_mut().fail_commit = true;
        self
    }

    pub(crate) fn failing_rollback(self) -> Self {
        self.state.borrow_mut().fail_rollback = true;
        self
    }

    /// Queue a row for the next non-INSERT query.
    pub(crate) fn push_row(&self, pairs: Vec<(&str, Value)>) {
        self.state.borrow_mut().rows.push_back(Row::from_pairs(pairs));
    }

    pub(crate) fn statements(&self) -> Vec<(String, Vec<Value>)> {
        self.state.borrow().statements.clone()
    }

    pub(crate) fn events(&self) -> Vec<&'static str> {
        self.state.borrow().events.clone()
    }

    fn record(&self, sql: &str, params: &[Value]) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if state.fail_on.as_deref().is_some_and(|f| sql.contains(f)) {
            return Err(QueryError::new(QueryErrorKind::Database, "mock failure")
                .with_sql(sql)
                .into());
        }
        state.statements.push((sql.to_string(), params.to_vec()));
        Ok(())
    }

    fn next_id(&self) -> i64 {
        let mut state = self.state.borrow_mut();
        state.next_id += 1;
        state.next_id
    }

    fn event(&self, event: &'static str) {
        self.state.borrow_mut().events.push(event);
    }
}

impl Connection for MockConnection {
    fn execute(&self, sql: &str, params: &[Value]) -> Result<ExecResult> {
        self.record(sql, params)?;
        if !sql.starts_with("INSERT") {
            return Ok(ExecResult::new(1));
        }
        let id = self.next_id();
        if self.state.borrow().insert_nothing {
            return Ok(ExecResult::new(0).with_last_insert_id(id));
        }
        if self.state.borrow().no_last_insert_id {
            Ok(ExecResult::new(1))
        } else {
            Ok(ExecResult::new(1).with_last_insert_id(id))
        }
    }

    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        self.record(sql, params)?;
        if sql.starts_with("INSERT") {
            let id = self.next_id();
            return Ok(vec![Row::from_pairs([("id", Value::BigInt(id))])]);
        }
        Ok(self.state.borrow_mut().rows.pop_front().into_iter().collect())
    }

    fn begin(&self) -> Result<Box<dyn Transaction + '_>> {
        if self.state.borrow().fail_begin {
            return Err(Error::custom("mock begin failure"));
        }
        self.event("BEGIN");
        Ok(Box::new(MockTransaction { conn: self }))
    }
}

struct MockTransaction<'c> {
    conn: &'c MockConnection,
}

impl Transaction for MockTransaction<'_> {
    fn execute(&self, sql: &str, params: &[Value]) -> Result<ExecResult> {
        self.conn.execute(sql, params)
    }

    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        self.conn.query(sql, params)
    }

    fn commit(self: Box<Self>) -> Result<()> {
        if self.conn.state.borrow().fail_commit {
            return Err(Error::custom("mock commit failure"));
        }
        self.conn.event("COMMIT");
        Ok(())
    }

    fn rollback(self: Box<Self>) -> Result<()> {
        if self.conn.state.borrow().fail_rollback {
            return Err(Error::custom("mock rollback failure"));
        }
        self.conn.event("ROLLBACK");
        Ok(())
    }
}

fn int(column: &str, value: &Value) -> Result<i64> {
    value.as_i64().ok_or_else(|| type_mismatch(column, "integer", value))
}

fn text(value: &Value) -> String {
    value.as_str().unwrap_or_default().to_string()
}

/// Plain entity with hooks and timestamps.
#[derive(Debug, Default)]
pub(crate) struct Hero {
    pub id: i64,
    pub name: String,
    pub age: i32,
    pub created_at: i64,
    pub updated_at: i64,
    pub hook_log: Vec<&'static str>,
    pub fail_hook: Option<&'static str>,
    pub frozen_id: bool,
}

impl Hero {
    pub(crate) fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    fn run_hook(&mut self, hook: &'static str) -> Result<()> {
        self.hook_log.push(hook);
        if self.fail_hook == Some(hook) {
            return Err(Error::custom(format!("{} refused", self.name)));
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
        ];
        FIELDS
    }

    fn column_value(&self, column: &str) -> Value {
        match column {
            "id" => Value::BigInt(self.id),
            "name" => Value::Text(self.name.clone()),
            "age" => Value::Int(self.age),
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
                self.age = i32::try_from(int(column, &value)?)
                    .map_err(|_| type_mismatch(column, "INTEGER", &value))?;
            }
            "created_at" => self.created_at = int(column, &value)?,
            "updated_at" => self.updated_at = int(column, &value)?,
            _ => return Err(Error::field(column, "unknown column")),
        }
        Ok(())
    }

    fn can_set(&self, column: &str) -> bool {
        !(self.frozen_id && column == "id")
    }

    fn hooks(&mut self) -> Option<&mut dyn CreateHooks> {
        Some(self)
    }
}

impl CreateHooks for Hero {
    fn before_save(&mut self, _cx: &HookContext<'_>) -> Result<()> {
        self.run_hook("before_save")
    }

    fn before_create(&mut self, _cx: &HookContext<'_>) -> Result<()> {
        self.run_hook("before_create")
    }

    fn after_create(&mut self, _cx: &HookContext<'_>) -> Result<()> {
        self.run_hook("after_create")
    }

    fn after_save(&mut self, _cx: &HookContext<'_>) -> Result<()> {
        self.run_hook("after_save")
    }
}

/// Entity whose `stamp` column is filled by the database.
#[derive(Debug, Default)]
pub(crate) struct Stamped {
    pub id: i64,
    pub stamp: String,
}

impl Entity for Stamped {
    fn table_name(&self) -> &str {
        "stamped"
    }

    fn field_infos(&self) -> &'static [FieldInfo] {
        static FIELDS: &[FieldInfo] = &[
            FieldInfo::new("id", "id").primary_key(true),
            FieldInfo::new("stamp", "stamp").default("CURRENT_TIMESTAMP"),
        ];
        FIELDS
    }

    fn column_value(&self, column: &str) -> Value {
        match column {
            "id" => Value::BigInt(self.id),
            "stamp" => Value::Text(self.stamp.clone()),
            _ => Value::Null,
        }
    }

    fn set_column(&mut self, column: &str, value: Value) -> Result<()> {
        match column {
            "id" => self.id = int(column, &value)?,
            "stamp" => self.stamp = text(&value),
            _ => return Err(Error::field(column, "unknown column")),
        }
        Ok(())
    }
}

/// Keyless entity with a defaulted column.
#[derive(Debug, Default)]
pub(crate) struct LogLine {
    pub message: String,
    pub stamp: String,
}

impl Entity for LogLine {
    fn table_name(&self) -> &str {
        "log_lines"
    }

    fn field_infos(&self) -> &'static [FieldInfo] {
        static FIELDS: &[FieldInfo] = &[
            FieldInfo::new("message", "message"),
            FieldInfo::new("stamp", "stamp").default("CURRENT_TIMESTAMP"),
        ];
        FIELDS
    }

    fn column_value(&self, column: &str) -> Value {
        match column {
            "message" => Value::Text(self.message.clone()),
            "stamp" => Value::Text(self.stamp.clone()),
            _ => Value::Null,
        }
    }

    fn set_column(&mut self, column: &str, value: Value) -> Result<()> {
        match column {
            "message" => self.message = text(&value),
            "stamp" => self.stamp = text(&value),
            _ => return Err(Error::field(column, "unknown column")),
        }
        Ok(())
    }
}

/// Owner side: has many members, many-to-many tags.
#[derive(Debug, Default)]
pub(crate) struct Team {
    pub id: i64,
    pub name: String,
    pub members: Vec<Member>,
    pub tags: Vec<Tag>,
}

impl Team {
    pub(crate) fn named(name: &str) -> Self {
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
            "members" => self.members.iter_mut().map(|m| m as &mut dyn Entity).collect(),
            "tags" => self.tags.iter_mut().map(|t| t as &mut dyn Entity).collect(),
            _ => Vec::new(),
        }
    }
}

/// Dependent side: belongs to a team.
#[derive(Debug, Default)]
pub(crate) struct Member {
    pub id: i64,
    pub name: String,
    pub team_id: i64,
    pub team: Option<Box<Team>>,
}

impl Member {
    pub(crate) fn named(name: &str) -> Self {
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
}

#[derive(Debug, Default)]
pub(crate) struct Tag {
    pub id: i64,
    pub label: String,
}

impl Tag {
    pub(crate) fn labelled(label: &str) -> Self {
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
