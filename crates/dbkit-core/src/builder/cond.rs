//! Condition trees for WHERE, HAVING and JOIN ... ON.

use crate::value::{IntoParams, ToValue, Value};

use super::Query;

/// Creates a raw predicate with positional `?` parameters.
///
/// The fragment is copied verbatim; only the markers are replaced.
///
/// ```rust
/// use dbkit_core::builder::cond;
///
/// let p = cond("id = ?", 5);
/// let q = cond("a = ? OR b = ?", (1, "x"));
/// # let _ = (p, q);
/// ```
#[must_use]
pub fn cond(sql: impl Into<String>, params: impl IntoParams) -> Predicate {
    Predicate::Raw {
        sql: sql.into(),
        params: params.into_params(),
    }
}

/// Creates a column reference for typed predicates.
#[must_use]
pub fn col(name: &str) -> Column {
    Column {
        name: String::from(name),
    }
}

/// A column reference (`id` or `u.id`), validated at compile time.
#[derive(Debug, Clone)]
pub struct Column {
    name: String,
}

impl Column {
    fn compare<T: ToValue>(self, op: &'static str, value: T) -> Predicate {
        Predicate::Compare {
            column: self.name,
            op,
            value: value.to_value(),
        }
    }

    /// Creates an equality predicate.
    #[must_use]
    pub fn eq<T: ToValue>(self, value: T) -> Predicate {
        self.compare("=", value)
    }

    /// Creates an inequality predicate.
    #[must_use]
    pub fn not_eq<T: ToValue>(self, value: T) -> Predicate {
        self.compare("<>", value)
    }

    /// Creates a less-than predicate.
    #[must_use]
    pub fn lt<T: ToValue>(self, value: T) -> Predicate {
        self.compare("<", value)
    }

    /// Creates a less-than-or-equal predicate.
    #[must_use]
    pub fn lt_eq<T: ToValue>(self, value: T) -> Predicate {
        self.compare("<=", value)
    }

    /// Creates a greater-than predicate.
    #[must_use]
    pub fn gt<T: ToValue>(self, value: T) -> Predicate {
        self.compare(">", value)
    }

    /// Creates a greater-than-or-equal predicate.
    #[must_use]
    pub fn gt_eq<T: ToValue>(self, value: T) -> Predicate {
        self.compare(">=", value)
    }

    /// Creates a LIKE predicate.
    #[must_use]
    pub fn like<T: ToValue>(self, pattern: T) -> Predicate {
        self.compare("LIKE", pattern)
    }

    /// Creates an IS NULL predicate.
    #[must_use]
    pub fn is_null(self) -> Predicate {
        Predicate::Null {
            column: self.name,
            negated: false,
        }
    }

    /// Creates an IS NOT NULL predicate.
    #[must_use]
    pub fn is_not_null(self) -> Predicate {
        Predicate::Null {
            column: self.name,
            negated: true,
        }
    }

    /// Creates an IN predicate over a value list.
    #[must_use]
    pub fn in_list<T: ToValue>(self, values: Vec<T>) -> Predicate {
        Predicate::InList {
            column: self.name,
            values: values.into_iter().map(ToValue::to_value).collect(),
            negated: false,
        }
    }

    /// Creates a NOT IN predicate over a value list.
    #[must_use]
    pub fn not_in_list<T: ToValue>(self, values: Vec<T>) -> Predicate {
        Predicate::InList {
            column: self.name,
            values: values.into_iter().map(ToValue::to_value).collect(),
            negated: true,
        }
    }

    /// Creates an IN predicate over a subquery.
    #[must_use]
    pub fn in_query(self, query: Query) -> Predicate {
        Predicate::InQuery {
            column: self.name,
            query: Box::new(query),
            negated: false,
        }
    }

    /// Creates a NOT IN predicate over a subquery.
    #[must_use]
    pub fn not_in_query(self, query: Query) -> Predicate {
        Predicate::InQuery {
            column: self.name,
            query: Box::new(query),
            negated: true,
        }
    }
}

/// A single condition.
#[derive(Debug, Clone)]
pub enum Predicate {
    /// A verbatim fragment with `?` markers.
    Raw {
        /// SQL fragment.
        sql: String,
        /// One value per marker, in order.
        params: Vec<Value>,
    },
    /// `column op value`.
    Compare {
        /// Column reference.
        column: String,
        /// Comparison operator.
        op: &'static str,
        /// Right-hand value.
        value: Value,
    },
    /// `column IS [NOT] NULL`.
    Null {
        /// Column reference.
        column: String,
        /// `IS NOT NULL` when set.
        negated: bool,
    },
    /// `column [NOT] IN (values)`.
    InList {
        /// Column reference.
        column: String,
        /// Candidate values.
        values: Vec<Value>,
        /// `NOT IN` when set.
        negated: bool,
    },
    /// `column [NOT] IN (SELECT ...)`.
    InQuery {
        /// Column reference.
        column: String,
        /// The subquery, compiled with the parent's options.
        query: Box<Query>,
        /// `NOT IN` when set.
        negated: bool,
    },
}

/// How a node joins the nodes before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conjunction {
    /// `AND`.
    And,
    /// `OR`.
    Or,
}

impl Conjunction {
    pub(crate) const fn as_sql(self) -> &'static str {
        match self {
            Self::And => " AND ",
            Self::Or => " OR ",
        }
    }
}

/// A node of a condition tree.
#[derive(Debug, Clone)]
pub enum Node {
    /// A flat predicate.
    Predicate(Predicate),
    /// A parenthesized group.
    Group(Conditions),
}

/// An AND/OR tree of predicates.
///
/// Groups are built with closures, so every opened group is closed:
///
/// ```rust
/// use dbkit_core::builder::{Conditions, col, cond};
///
/// let c = Conditions::new()
///     .and(col("active").eq(true))
///     .and_group(|g| g.and(cond("role = ?", "admin")).or(cond("role = ?", "owner")));
/// assert_eq!(c.len(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Conditions {
    nodes: Vec<(Conjunction, Node)>,
}

impl Conditions {
    /// Creates an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a predicate joined with AND.
    #[must_use]
    pub fn and(mut self, predicate: Predicate) -> Self {
        self.nodes.push((Conjunction::And, Node::Predicate(predicate)));
        self
    }

    /// Appends a predicate joined with OR.
    #[must_use]
    pub fn or(mut self, predicate: Predicate) -> Self {
        self.nodes.push((Conjunction::Or, Node::Predicate(predicate)));
        self
    }

    /// Appends a parenthesized group joined with AND.
    #[must_use]
    pub fn and_group(mut self, build: impl FnOnce(Self) -> Self) -> Self {
        let group = build(Self::new());
        if !group.is_empty() {
            self.nodes.push((Conjunction::And, Node::Group(group)));
        }
        self
    }

    /// Appends a parenthesized group joined with OR.
    #[must_use]
    pub fn or_group(mut self, build: impl FnOnce(Self) -> Self) -> Self {
        let group = build(Self::new());
        if !group.is_empty() {
            self.nodes.push((Conjunction::Or, Node::Group(group)));
        }
        self
    }

    /// Number of top-level nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if the tree has no predicates.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub(crate) fn nodes(&self) -> &[(Conjunction, Node)] {
        &self.nodes
    }
}

impl From<Predicate> for Conditions {
    fn from(predicate: Predicate) -> Self {
        Self::new().and(predicate)
    }
}
