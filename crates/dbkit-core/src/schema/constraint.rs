//! Keys, indexes and references.

use std::collections::BTreeSet;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::backend::Backend;

/// Referential action for ON UPDATE / ON DELETE.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    /// No action.
    #[default]
    NoAction,
    /// Restrict deletion/update.
    Restrict,
    /// Cascade the operation.
    Cascade,
    /// Set to NULL.
    SetNull,
    /// Set to default value.
    SetDefault,
}

impl Action {
    /// Returns the SQL representation of the action.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::NoAction => "NO ACTION",
            Self::Restrict => "RESTRICT",
            Self::Cascade => "CASCADE",
            Self::SetNull => "SET NULL",
            Self::SetDefault => "SET DEFAULT",
        }
    }

    /// Decodes PostgreSQL's single-letter `confupdtype`/`confdeltype`.
    #[must_use]
    pub const fn from_pg_code(code: char) -> Self {
        match code {
            'r' => Self::Restrict,
            'c' => Self::Cascade,
            'n' => Self::SetNull,
            'd' => Self::SetDefault,
            _ => Self::NoAction,
        }
    }
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().replace('_', " ").as_str() {
            "NO ACTION" => Ok(Self::NoAction),
            "RESTRICT" => Ok(Self::Restrict),
            "CASCADE" => Ok(Self::Cascade),
            "SET NULL" => Ok(Self::SetNull),
            "SET DEFAULT" => Ok(Self::SetDefault),
            _ => Err(format!("unknown referential action '{s}'")),
        }
    }
}

/// Kind of a key constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyKind {
    /// PRIMARY KEY.
    Primary,
    /// UNIQUE.
    #[default]
    Unique,
}

/// A primary or unique key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Key {
    /// Constraint name.
    pub name: String,
    /// Primary or unique.
    #[serde(default)]
    pub kind: KeyKind,
    /// Ordered column list.
    pub columns: Vec<String>,
}

impl Key {
    /// Whether both keys cover the same columns, in any order, with the same kind.
    #[must_use]
    pub fn same_shape(&self, other: &Self) -> bool {
        self.kind == other.kind && column_set(&self.columns) == column_set(&other.columns)
    }

    /// Whether the definitions are identical. Primary key names are ignored
    /// on backends that do not keep them.
    #[must_use]
    pub fn same_definition(&self, other: &Self, backend: Backend) -> bool {
        let name_matters = self.kind != KeyKind::Primary || backend.named_primary_keys();
        self.kind == other.kind
            && self.columns == other.columns
            && (!name_matters || self.name == other.name)
    }
}

/// A non-unique index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    /// Index name.
    pub name: String,
    /// Access method, e.g. `btree`.
    #[serde(default = "default_method")]
    pub method: String,
    /// Ordered column list.
    pub columns: Vec<String>,
}

fn default_method() -> String {
    String::from("btree")
}

impl Index {
    /// Whether both indexes cover the same column set with the same method.
    #[must_use]
    pub fn same_shape(&self, other: &Self) -> bool {
        self.method.eq_ignore_ascii_case(&other.method)
            && column_set(&self.columns) == column_set(&other.columns)
    }

    /// Whether the definitions are identical.
    #[must_use]
    pub fn same_definition(&self, other: &Self) -> bool {
        self.name == other.name
            && self.columns == other.columns
            && self.method.eq_ignore_ascii_case(&other.method)
    }
}

/// A foreign key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    /// Constraint name.
    pub name: String,
    /// Child columns.
    pub columns: Vec<String>,
    /// Parent table.
    pub parent_table: String,
    /// Parent columns, matched positionally with `columns`.
    pub parent_columns: Vec<String>,
    /// ON UPDATE action.
    #[serde(default)]
    pub on_update: Action,
    /// ON DELETE action.
    #[serde(default)]
    pub on_delete: Action,
}

impl Reference {
    /// Whether both references link the same column sets of the same tables.
    #[must_use]
    pub fn same_shape(&self, other: &Self) -> bool {
        self.parent_table == other.parent_table
            && column_set(&self.columns) == column_set(&other.columns)
            && column_set(&self.parent_columns) == column_set(&other.parent_columns)
    }

    /// Whether the definitions are identical, actions included.
    #[must_use]
    pub fn same_definition(&self, other: &Self) -> bool {
        self.name == other.name
            && self.columns == other.columns
            && self.parent_table == other.parent_table
            && self.parent_columns == other.parent_columns
            && self.on_update == other.on_update
            && self.on_delete == other.on_delete
    }
}

fn column_set(columns: &[String]) -> BTreeSet<&str> {
    columns.iter().map(String::as_str).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(name: &str, kind: KeyKind, cols: &[&str]) -> Key {
        Key {
            name: name.to_string(),
            kind,
            columns: cols.iter().map(|c| (*c).to_string()).collect(),
        }
    }

    #[test]
    fn test_key_shape_ignores_order_and_name() {
        let a = key("a", KeyKind::Unique, &["x", "y"]);
        let b = key("b", KeyKind::Unique, &["y", "x"]);
        assert!(a.same_shape(&b));
        assert!(!a.same_definition(&b, Backend::Postgres));
        assert!(!a.same_shape(&key("a", KeyKind::Primary, &["x", "y"])));
    }

    #[test]
    fn test_primary_name_ignored_on_mysql() {
        let declared = key("pk_users", KeyKind::Primary, &["id"]);
        let live = key("PRIMARY", KeyKind::Primary, &["id"]);
        assert!(declared.same_definition(&live, Backend::MySql));
        assert!(declared.same_definition(&live, Backend::MariaDb));
        assert!(!declared.same_definition(&live, Backend::Postgres));
    }

    #[test]
    fn test_action_parsing() {
        assert_eq!("set null".parse::<Action>(), Ok(Action::SetNull));
        assert_eq!("NO_ACTION".parse::<Action>(), Ok(Action::NoAction));
        assert!("explode".parse::<Action>().is_err());
        assert_eq!(Action::from_pg_code('c'), Action::Cascade);
        assert_eq!(Action::from_pg_code('a'), Action::NoAction);
    }
}
