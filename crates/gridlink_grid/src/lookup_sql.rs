use gridlink_core::{SchemaResolver, SqlDialect, Value};

use crate::model::ForeignKeyConstraint;

/// Base alias of the "is current value" flag column.
pub const CURRENT_VALUE_ALIAS: &str = "curr";

/// Builds the read-only statement that feeds a foreign key dropdown.
///
/// The result always has the flag column at index 0 and the referenced key,
/// aliased to the local column name, at index 1. Every other column of each
/// referenced table follows, fully qualified.
pub struct LookupQueryBuilder<'a> {
    dialect: &'a dyn SqlDialect,
}

struct SourceTable {
    name: String,
    wrapped: String,
    key_column: String,
}

impl<'a> LookupQueryBuilder<'a> {
    pub fn new(dialect: &'a dyn SqlDialect) -> Self {
        Self { dialect }
    }

    /// Returns `None` only when `constraints` is empty. Tables the schema
    /// cannot describe just contribute fewer columns.
    pub fn build<S: SchemaResolver + ?Sized>(
        &self,
        local_column: &str,
        constraints: &[ForeignKeyConstraint],
        current: &Value,
        schema: &S,
    ) -> Option<String> {
        let first = constraints.first()?;

        let display_column = format!(
            "{}.{}",
            self.wrap(&first.foreign_table),
            self.wrap(&first.foreign_column)
        );

        let mut selected = vec![format!("{} AS {}", display_column, self.wrap(local_column))];
        let mut used_names = vec![local_column.to_string()];
        let mut sources: Vec<SourceTable> = Vec::new();

        for constraint in constraints {
            if sources
                .iter()
                .any(|s| s.name.eq_ignore_ascii_case(&constraint.foreign_table))
            {
                continue;
            }

            let wrapped_table = self.wrap(&constraint.foreign_table);

            for column in schema.column_names(&constraint.foreign_table) {
                if column.eq_ignore_ascii_case(&constraint.foreign_column) {
                    continue;
                }

                selected.push(format!("{}.{}", wrapped_table, self.wrap(&column)));
                used_names.push(column);
            }

            sources.push(SourceTable {
                name: constraint.foreign_table.clone(),
                wrapped: wrapped_table,
                key_column: self.wrap(&constraint.foreign_column),
            });
        }

        let where_clause = join_conditions(&sources)
            .map(|conditions| format!(" WHERE {}", conditions))
            .unwrap_or_default();

        let flag_alias = self.wrap(&unique_name(CURRENT_VALUE_ALIAS, &used_names));
        let flag_column = if current.is_null() {
            format!("({} IS NULL) AS {}", display_column, flag_alias)
        } else {
            format!(
                "({} = {}) AS {}",
                display_column,
                self.dialect.value_to_literal(current),
                flag_alias
            )
        };

        let tables: Vec<&str> = sources.iter().map(|s| s.wrapped.as_str()).collect();

        Some(format!(
            "SELECT {}, {} FROM {}{}",
            flag_column,
            selected.join(", "),
            tables.join(", "),
            where_clause
        ))
    }

    fn wrap(&self, name: &str) -> String {
        self.dialect.wrap_identifier_if_needed(name)
    }
}

/// Every table after the first is joined on its key against the first table.
fn join_conditions(sources: &[SourceTable]) -> Option<String> {
    let (anchor, others) = sources.split_first()?;
    if others.is_empty() {
        return None;
    }

    let conditions: Vec<String> = others
        .iter()
        .map(|other| {
            format!(
                "{}.{} = {}.{}",
                anchor.wrapped, anchor.key_column, other.wrapped, other.key_column
            )
        })
        .collect();

    Some(conditions.join(" AND "))
}

/// `base`, or `base` followed by a counter, avoiding every name in `used`
/// (compared case-insensitively).
pub fn unique_name(base: &str, used: &[String]) -> String {
    let taken = |candidate: &str| used.iter().any(|u| u.eq_ignore_ascii_case(candidate));

    if !taken(base) {
        return base.to_string();
    }

    let mut counter = 0usize;
    loop {
        let candidate = format!("{}{}", base, counter);
        if !taken(&candidate) {
            return candidate;
        }
        counter += 1;
    }
}
