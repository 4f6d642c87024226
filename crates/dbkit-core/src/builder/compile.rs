//! Query compilation.
//!
//! The compiler walks the AST once, left to right, so parameters are
//! collected in exactly the order their placeholders appear.

use crate::backend::{Backend, Direction};
use crate::error::BuilderError;
use crate::ident::split_markers;
use crate::value::Value;

use super::cond::{Conditions, Node, Predicate};
use super::{BuildOptions, JoinKind, Mode, ParamMode, Query, Selectable};

pub(super) struct Compiler {
    options: BuildOptions,
    params: Vec<Value>,
}

impl Compiler {
    pub(super) const fn new(options: BuildOptions) -> Self {
        Self {
            options,
            params: Vec::new(),
        }
    }

    pub(super) fn statement(mut self, query: &Query) -> Result<(String, Vec<Value>), BuilderError> {
        let sql = match query.mode {
            Mode::Select => self.select(query)?,
            Mode::Insert => self.insert(query)?,
            Mode::Update => self.update(query)?,
            Mode::Delete => self.delete(query)?,
        };
        Ok((sql, self.params))
    }

    const fn backend(&self) -> Backend {
        self.options.backend
    }

    fn value(&mut self, value: &Value) -> String {
        if self.options.params == ParamMode::Inline || value.is_inlined() {
            value.to_sql_inline(self.backend())
        } else {
            self.params.push(value.clone());
            String::from("?")
        }
    }

    fn ident(&self, name: &str) -> Result<String, BuilderError> {
        self.backend().surround(name)
    }

    /// `*`, `col`, `t.col` or `t.*`.
    fn column_ref(&self, name: &str) -> Result<String, BuilderError> {
        if name == "*" {
            return Ok(String::from("*"));
        }
        match name.split_once('.') {
            Some((table, "*")) => Ok(format!("{}.*", self.ident(table)?)),
            Some((table, column)) => Ok(format!("{}.{}", self.ident(table)?, self.ident(column)?)),
            None => self.ident(name),
        }
    }

    /// Splits `name alias` / `name AS alias`.
    fn split_alias(text: &str) -> Result<(&str, Option<&str>), BuilderError> {
        let parts: Vec<&str> = text.split_whitespace().collect();
        match parts.as_slice() {
            [name] => Ok((*name, None)),
            [name, alias] => Ok((*name, Some(*alias))),
            [name, kw, alias] if kw.eq_ignore_ascii_case("as") => Ok((*name, Some(*alias))),
            _ => Err(BuilderError::InvalidIdentifier(text.to_string())),
        }
    }

    fn selectable(&self, item: &Selectable) -> Result<String, BuilderError> {
        match item {
            Selectable::Column(text) => {
                let (name, alias) = Self::split_alias(text)?;
                let column = self.column_ref(name)?;
                match alias {
                    Some(alias) => Ok(format!("{column} AS {}", self.ident(alias)?)),
                    None => Ok(column),
                }
            }
            Selectable::Expr { sql, alias } => match alias {
                Some(alias) => Ok(format!("{sql} AS {}", self.ident(alias)?)),
                None => Ok(sql.clone()),
            },
        }
    }

    fn source(&self, text: &str) -> Result<String, BuilderError> {
        let (name, alias) = Self::split_alias(text)?;
        let table = self.ident(name)?;
        match alias {
            Some(alias) => Ok(format!("{table} AS {}", self.ident(alias)?)),
            None => Ok(table),
        }
    }

    fn target(&self, query: &Query) -> Result<String, BuilderError> {
        let name = query
            .table
            .as_deref()
            .or_else(|| query.sources.first().map(String::as_str))
            .ok_or(BuilderError::MissingTable(query.mode.keyword()))?;
        self.ident(name)
    }

    fn conditions(&mut self, conditions: &Conditions) -> Result<String, BuilderError> {
        let mut sql = String::new();
        for (i, (conjunction, node)) in conditions.nodes().iter().enumerate() {
            if i > 0 {
                sql.push_str(conjunction.as_sql());
            }
            match node {
                Node::Predicate(p) => sql.push_str(&self.predicate(p)?),
                Node::Group(group) => {
                    sql.push('(');
                    sql.push_str(&self.conditions(group)?);
                    sql.push(')');
                }
            }
        }
        Ok(sql)
    }

    fn predicate(&mut self, predicate: &Predicate) -> Result<String, BuilderError> {
        match predicate {
            Predicate::Raw { sql, params } => {
                let segments = split_markers(self.backend(), sql);
                if segments.len() - 1 != params.len() {
                    return Err(BuilderError::ParameterCount {
                        sql: sql.clone(),
                        markers: segments.len() - 1,
                        params: params.len(),
                    });
                }
                let mut out = String::from(segments[0]);
                for (segment, value) in segments[1..].iter().zip(params) {
                    out.push_str(&self.value(value));
                    out.push_str(segment);
                }
                Ok(out)
            }
            Predicate::Compare { column, op, value } => {
                let column = self.column_ref(column)?;
                match (*op, value) {
                    ("=", Value::Null) => Ok(format!("{column} IS NULL")),
                    ("<>", Value::Null) => Ok(format!("{column} IS NOT NULL")),
                    _ => Ok(format!("{column} {op} {}", self.value(value))),
                }
            }
            Predicate::Null { column, negated } => {
                let column = self.column_ref(column)?;
                let keyword = if *negated { "IS NOT NULL" } else { "IS NULL" };
                Ok(format!("{column} {keyword}"))
            }
            Predicate::InList {
                column,
                values,
                negated,
            } => {
                let column = self.column_ref(column)?;
                if values.is_empty() {
                    // IN () is not valid SQL; an empty list matches nothing.
                    return Ok(String::from(if *negated { "1 = 1" } else { "1 = 0" }));
                }
                let items: Vec<String> = values.iter().map(|v| self.value(v)).collect();
                let keyword = if *negated { "NOT IN" } else { "IN" };
                Ok(format!("{column} {keyword} ({})", items.join(", ")))
            }
            Predicate::InQuery {
                column,
                query,
                negated,
            } => {
                let column = self.column_ref(column)?;
                let sub = self.select(query)?;
                let keyword = if *negated { "NOT IN" } else { "IN" };
                Ok(format!("{column} {keyword} ({sub})"))
            }
        }
    }

    fn select(&mut self, query: &Query) -> Result<String, BuilderError> {
        let mut sql = String::from("SELECT ");
        if query.distinct {
            sql.push_str("DISTINCT ");
        }

        if query.columns.is_empty() {
            sql.push('*');
        } else {
            let cols = query
                .columns
                .iter()
                .map(|c| self.selectable(c))
                .collect::<Result<Vec<_>, _>>()?;
            sql.push_str(&cols.join(", "));
        }

        let sources: Vec<&str> = if query.sources.is_empty() {
            query.table.as_deref().into_iter().collect()
        } else {
            query.sources.iter().map(String::as_str).collect()
        };
        if !sources.is_empty() {
            let rendered = sources
                .iter()
                .map(|s| self.source(s))
                .collect::<Result<Vec<_>, _>>()?;
            sql.push_str(" FROM ");
            sql.push_str(&rendered.join(", "));
        }

        for join in &query.joins {
            sql.push(' ');
            sql.push_str(join.kind.as_sql());
            sql.push(' ');
            sql.push_str(&self.source(&join.source)?);
            if join.kind != JoinKind::Cross && !join.on.is_empty() {
                sql.push_str(" ON ");
                sql.push_str(&self.conditions(&join.on)?);
            }
        }

        if !query.conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&self.conditions(&query.conditions)?);
        }

        if !query.group_by.is_empty() {
            let cols = query
                .group_by
                .iter()
                .map(|c| self.column_ref(c))
                .collect::<Result<Vec<_>, _>>()?;
            sql.push_str(" GROUP BY ");
            sql.push_str(&cols.join(", "));
        }

        if !query.having.is_empty() {
            sql.push_str(" HAVING ");
            sql.push_str(&self.conditions(&query.having)?);
        }

        if !query.order_by.is_empty() {
            let mut items = Vec::with_capacity(query.order_by.len());
            for item in &query.order_by {
                let column = self.column_ref(&item.column)?;
                let expr = if item.lexical {
                    self.backend().lexical_collation(&column)
                } else {
                    column
                };
                let direction: Direction = item.direction.parse()?;
                items.push((expr, direction));
            }
            sql.push(' ');
            sql.push_str(&self.backend().order_by(&items));
        }

        sql.push_str(&self.backend().limit_clause(query.limit, query.offset));
        Ok(sql)
    }

    fn insert(&mut self, query: &Query) -> Result<String, BuilderError> {
        let table = self.target(query)?;

        let (names, rows): (Vec<&str>, Vec<Vec<&Value>>) = if query.data.is_empty() {
            let names = query
                .columns
                .iter()
                .map(|c| match c {
                    Selectable::Column(name) => Ok(name.as_str()),
                    Selectable::Expr { sql, .. } => Err(BuilderError::InvalidIdentifier(sql.clone())),
                })
                .collect::<Result<Vec<_>, _>>()?;
            let rows = query.rows.iter().map(|r| r.iter().collect()).collect();
            (names, rows)
        } else {
            let names = query.data.iter().map(|(k, _)| k.as_str()).collect();
            let row = query.data.iter().map(|(_, v)| v).collect();
            (names, vec![row])
        };

        if rows.is_empty() {
            return Err(BuilderError::NoValues("INSERT"));
        }

        let columns = names
            .iter()
            .map(|n| self.ident(n))
            .collect::<Result<Vec<_>, _>>()?;

        let mut rendered = Vec::with_capacity(rows.len());
        for row in rows {
            let values: Vec<String> = row.into_iter().map(|v| self.value(v)).collect();
            rendered.push(format!("({})", values.join(", ")));
        }

        Ok(format!(
            "INSERT INTO {table} ({}) VALUES {}",
            columns.join(", "),
            rendered.join(", ")
        ))
    }

    fn update(&mut self, query: &Query) -> Result<String, BuilderError> {
        let table = self.target(query)?;
        if query.conditions.is_empty() {
            return Err(BuilderError::MissingWhere("UPDATE"));
        }
        if query.data.is_empty() {
            return Err(BuilderError::NoValues("UPDATE"));
        }

        let mut assignments = Vec::with_capacity(query.data.len());
        for (column, value) in &query.data {
            let column = self.ident(column)?;
            assignments.push(format!("{column} = {}", self.value(value)));
        }
        let conditions = self.conditions(&query.conditions)?;

        Ok(format!(
            "UPDATE {table} SET {} WHERE {conditions}",
            assignments.join(", ")
        ))
    }

    fn delete(&mut self, query: &Query) -> Result<String, BuilderError> {
        let table = self.target(query)?;
        if query.conditions.is_empty() {
            return Err(BuilderError::MissingWhere("DELETE"));
        }
        let conditions = self.conditions(&query.conditions)?;
        Ok(format!("DELETE FROM {table} WHERE {conditions}"))
    }
}
