//! Per-call options for a create.

/// Options for one create call.
///
/// `select` and `omit` accept field names or column names. A non-empty
/// `select` list wins over `omit`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateOptions {
    /// Only these fields may be written.
    pub select: Vec<String>,
    /// These fields are never written.
    pub omit: Vec<String>,
    /// Keyword placed after `INSERT` (`IGNORE`, `OR REPLACE`).
    pub insert_modifier: Option<String>,
    /// Clause appended after the VALUES list (`ON CONFLICT DO NOTHING`).
    pub insert_option: Option<String>,
    /// Overrides the engine's association-saving default.
    pub save_associations: Option<bool>,
}

impl CreateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn select<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.select = fields.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn omit<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.omit = fields.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn insert_modifier(mut self, modifier: impl Into<String>) -> Self {
        self.insert_modifier = Some(modifier.into());
        self
    }

    #[must_use]
    pub fn insert_option(mut self, option: impl Into<String>) -> Self {
        self.insert_option = Some(option.into());
        self
    }

    #[must_use]
    pub fn save_associations(mut self, save: bool) -> Self {
        self.save_associations = Some(save);
        self
    }

    /// The modifier as it goes into the statement, upper-cased.
    ///
    /// `INTO` is already part of the statement and counts as no modifier.
    pub(crate) fn modifier_clause(&self) -> Option<String> {
        self.insert_modifier
            .as_deref()
            .map(|m| m.trim().to_uppercase())
            .filter(|m| !m.is_empty() && m != "INTO")
    }

    pub(crate) fn option_clause(&self) -> Option<&str> {
        self.insert_option
            .as_deref()
            .map(str::trim)
            .filter(|o| !o.is_empty())
    }
}
