use gridlink_core::{ColumnInfo, ColumnMeta, Connection, DbError, ForeignKeyInfo, QueryRequest};

use crate::model::{ColumnDescriptor, ForeignKeyConstraint, ResultGrid};

impl ResultGrid {
    /// Loads every row of `table` together with its column and foreign key
    /// definitions. All rows come back materialized.
    pub fn load_table(db: &dyn Connection, table: &str) -> Result<ResultGrid, DbError> {
        let sql = format!(
            "SELECT * FROM {}",
            db.dialect().wrap_identifier_if_needed(table)
        );
        let result = db.execute(&QueryRequest::new(sql))?;
        let infos = db.table_columns(table)?;
        let keys = db.foreign_keys(table)?;

        let columns = result
            .columns
            .iter()
            .map(|meta| describe_column(meta, table, &infos, &keys))
            .collect();

        log::info!(
            "Loaded {} rows from {} in {:.2?}",
            result.row_count(),
            table,
            result.execution_time
        );

        let mut grid = ResultGrid::new(columns, result.rows).with_source_table(table);
        grid.materialize_all();
        Ok(grid)
    }

    /// Whether the editable columns no longer match the live table
    /// definition. Grids that were not loaded from a table never change.
    pub fn has_structure_changed(&self, db: &dyn Connection) -> Result<bool, DbError> {
        let Some(table) = self.source_table() else {
            return Ok(false);
        };

        let live = db.table_columns(table)?;
        let loaded: Vec<&str> = self
            .columns()
            .iter()
            .filter(|c| c.can_edit())
            .map(|c| c.name.as_str())
            .collect();

        Ok(loaded.len() != live.len()
            || loaded
                .iter()
                .zip(&live)
                .any(|(name, info)| !name.eq_ignore_ascii_case(&info.name)))
    }

    /// Marks the grid stale when its structure changed since loading.
    /// Returns the new stale flag.
    pub fn check_structure(&mut self, db: &dyn Connection) -> Result<bool, DbError> {
        if self.has_structure_changed(db)? {
            log::warn!(
                "Structure of {} changed since it was loaded",
                self.source_table().unwrap_or_default()
            );
            self.set_structure_out_of_date(true);
        }

        Ok(self.is_structure_out_of_date())
    }
}

fn describe_column(
    meta: &ColumnMeta,
    table: &str,
    infos: &[ColumnInfo],
    keys: &[ForeignKeyInfo],
) -> ColumnDescriptor {
    let Some(info) = infos.iter().find(|i| i.name.eq_ignore_ascii_case(&meta.name)) else {
        return ColumnDescriptor::from(meta).read_only(format!(
            "Column {} is not part of table {}.",
            meta.name, table
        ));
    };

    keys.iter()
        .filter(|key| key.column.eq_ignore_ascii_case(&info.name))
        .fold(
            ColumnDescriptor::new(info.name.as_str(), info.type_name.as_str()).with_table(table),
            |column, key| {
                column.with_foreign_key(ForeignKeyConstraint::new(
                    info.name.as_str(),
                    key.referenced_table.as_str(),
                    key.referenced_column.as_str(),
                ))
            },
        )
}
