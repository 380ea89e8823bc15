use sea_orm::{
    ConnectionTrait, DbErr, Value,
    sea_query::{Alias, Asterisk, Expr, Func, Query, SelectStatement},
};

use crate::helpers::replace_placeholders;

const ALREADY_EXISTS_MESSAGE: &str = "The :table table already has record \":record\"";

async fn count_rows<C: ConnectionTrait>(db: &C, statement: &SelectStatement) -> Result<i64, DbErr> {
    let row = db
        .query_one(db.get_database_backend().build(statement))
        .await?;
    match row {
        Some(row) => row.try_get::<i64>("", "aggregate"),
        None => Ok(0),
    }
}

fn count_statement(table: &str) -> SelectStatement {
    Query::select()
        .expr_as(Func::count(Expr::col(Asterisk)), Alias::new("aggregate"))
        .from(Alias::new(table))
        .to_owned()
}

/// Passes when `table.column` holds the submitted value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exists {
    pub table: String,
    pub column: String,
}

impl Exists {
    pub fn new(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
        }
    }

    /// # Errors
    ///
    /// Propagates database errors from the count query.
    pub async fn passes<C: ConnectionTrait>(&self, db: &C, value: &str) -> Result<bool, DbErr> {
        // Identifier columns are compared numerically when the input allows it
        let bound: Value = value
            .parse::<i64>()
            .map_or_else(|_| Value::from(value.to_string()), Value::from);

        let mut statement = count_statement(&self.table);
        statement.and_where(Expr::col(Alias::new(&self.column)).eq(bound));
        Ok(count_rows(db, &statement).await? > 0)
    }
}

/// Passes when no row of `table` already has `attribute = value`, optionally
/// ignoring the row whose `id` is `ignore_id` (the record being updated).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlreadyExists {
    pub table: String,
    pub ignore_id: Option<i32>,
}

impl AlreadyExists {
    pub fn new(table: impl Into<String>, ignore_id: Option<i32>) -> Self {
        Self {
            table: table.into(),
            ignore_id,
        }
    }

    /// # Errors
    ///
    /// Propagates database errors from the count query.
    pub async fn passes<C: ConnectionTrait>(
        &self,
        db: &C,
        attribute: &str,
        value: &str,
    ) -> Result<bool, DbErr> {
        let mut statement = count_statement(&self.table);
        if let Some(id) = self.ignore_id {
            statement.and_where(Expr::col(Alias::new("id")).ne(id));
        }
        statement.and_where(Expr::col(Alias::new(attribute)).eq(value));
        Ok(count_rows(db, &statement).await? < 1)
    }

    #[must_use]
    pub fn message(&self, value: &str) -> String {
        replace_placeholders(ALREADY_EXISTS_MESSAGE, &[&self.table, value])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_already_exists_message() {
        let rule = AlreadyExists::new("users", Some(4));
        assert_eq!(
            rule.message("ann@example.com"),
            "The users table already has record \"ann@example.com\""
        );
    }
}
