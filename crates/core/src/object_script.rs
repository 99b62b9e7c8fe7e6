use thiserror::Error;

use crate::catalog::Catalog;

pub const TABLE_KIND: &str = "table";
pub const TABLE_PREVIEW_LIMIT: usize = 100;

const CREATE_KEYWORD: &str = "create";
const ALTER_KEYWORD: &str = "ALTER";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ObjectScriptError {
    #[error("a category title was selected, not an object")]
    NotAnItem,
    #[error("no catalog entry at category {category}, item {item}")]
    OutOfRange { category: usize, item: usize },
    #[error("object name cannot be empty")]
    EmptyName,
}

/// A sidebar object resolved to its kind (the lower-cased category) and name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectTarget {
    pub kind: String,
    pub name: String,
}

impl ObjectTarget {
    pub fn new(kind: &str, name: &str) -> Result<Self, ObjectScriptError> {
        if name.trim().is_empty() {
            return Err(ObjectScriptError::EmptyName);
        }
        Ok(Self {
            kind: kind.to_lowercase(),
            name: name.to_string(),
        })
    }

    /// Resolves a position in a displayed catalog. `item` is `None` when the
    /// category row itself was activated.
    pub fn from_position(
        catalog: &Catalog,
        category: usize,
        item: Option<usize>,
    ) -> Result<Self, ObjectScriptError> {
        let item = item.ok_or(ObjectScriptError::NotAnItem)?;
        let entry = catalog
            .entries
            .get(category)
            .ok_or(ObjectScriptError::OutOfRange { category, item })?;
        let name = entry
            .items
            .get(item)
            .ok_or(ObjectScriptError::OutOfRange { category, item })?;
        Self::new(&entry.category, name)
    }

    #[must_use]
    pub fn is_table(&self) -> bool {
        self.kind == TABLE_KIND
    }
}

#[must_use]
pub fn quote_bracket_identifier(identifier: &str) -> String {
    format!("[{}]", identifier.replace(']', "]]"))
}

#[must_use]
pub fn table_preview_sql(table: &str) -> String {
    format!(
        "select top {TABLE_PREVIEW_LIMIT} * from {}",
        quote_bracket_identifier(table)
    )
}

#[must_use]
pub fn object_definition_command(get_object_command: &str, target: &ObjectTarget) -> String {
    format!("{get_object_command} {} {}", target.kind, target.name)
}

/// Turns the first `CREATE` of a definition into `ALTER`: at the very start
/// of the text if present there, otherwise at the start of the first line
/// that begins with it. Matching ignores case.
#[must_use]
pub fn rewrite_create_as_alter(definition: &str) -> String {
    if starts_with_create(definition) {
        return format!("{ALTER_KEYWORD}{}", &definition[CREATE_KEYWORD.len()..]);
    }

    for (index, _) in definition.match_indices('\n') {
        let line_start = index + 1;
        if starts_with_create(&definition[line_start..]) {
            return format!(
                "{}{ALTER_KEYWORD}{}",
                &definition[..line_start],
                &definition[line_start + CREATE_KEYWORD.len()..]
            );
        }
    }

    definition.to_string()
}

fn starts_with_create(text: &str) -> bool {
    text.get(..CREATE_KEYWORD.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(CREATE_KEYWORD))
}
