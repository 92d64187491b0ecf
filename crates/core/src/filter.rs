//! Column predicates used for existence checks and guard scans.
//!
//! A [`Filter`] is a conjunction of simple comparisons. It is evaluated in
//! memory by test adapters and rendered to a `WHERE` clause by SQL adapters.

use crate::error::{DomainError, DomainResult};
use crate::row::{Column, FieldValue, Row};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Comparison {
    Eq,
    Lt,
    Gte,
}

impl Comparison {
    pub fn sql_operator(self) -> &'static str {
        match self {
            Comparison::Eq => "=",
            Comparison::Lt => "<",
            Comparison::Gte => ">=",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clause {
    pub column: &'static str,
    pub op: Comparison,
    pub value: FieldValue,
}

impl Clause {
    fn matches(&self, row: &Row) -> bool {
        let Some(actual) = row.get(self.column) else {
            return false;
        };
        // Values of different types never compare.
        if core::mem::discriminant(actual) != core::mem::discriminant(&self.value) {
            return false;
        }
        match self.op {
            Comparison::Eq => *actual == self.value,
            Comparison::Lt => *actual < self.value,
            Comparison::Gte => *actual >= self.value,
        }
    }
}

/// Conjunction of clauses; the empty filter matches every row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    clauses: Vec<Clause>,
}

impl Filter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: &'static str, value: impl Into<FieldValue>) -> Self {
        self.clauses.push(Clause {
            column,
            op: Comparison::Eq,
            value: value.into(),
        });
        self
    }

    pub fn lt(mut self, column: &'static str, value: impl Into<FieldValue>) -> Self {
        self.clauses.push(Clause {
            column,
            op: Comparison::Lt,
            value: value.into(),
        });
        self
    }

    pub fn gte(mut self, column: &'static str, value: impl Into<FieldValue>) -> Self {
        self.clauses.push(Clause {
            column,
            op: Comparison::Gte,
            value: value.into(),
        });
        self
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    pub fn matches(&self, row: &Row) -> bool {
        self.clauses.iter().all(|c| c.matches(row))
    }

    /// Reject clauses that reference columns the table does not have.
    ///
    /// SQL adapters interpolate column names, so this must pass before a
    /// filter is rendered.
    pub fn check_columns(&self, columns: &[Column]) -> DomainResult<()> {
        for clause in &self.clauses {
            let column = columns
                .iter()
                .find(|c| c.name == clause.column)
                .ok_or_else(|| {
                    DomainError::validation(format!("unknown filter column '{}'", clause.column))
                })?;
            if matches!(clause.value, FieldValue::Null) || !clause.value.fits(column) {
                return Err(DomainError::validation(format!(
                    "filter on '{}' uses a {} value",
                    clause.column,
                    clause.value.type_name()
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row::ColumnType;

    fn product_row(stock: i64, category: i64) -> Row {
        Row::new()
            .with("stock", stock)
            .with("category_id", category)
    }

    #[test]
    fn empty_filter_matches_everything() {
        assert!(Filter::all().matches(&product_row(1, 1)));
    }

    #[test]
    fn clauses_are_conjunctive() {
        let f = Filter::all().eq("category_id", 2_i64).lt("stock", 5_i64);
        assert!(f.matches(&product_row(4, 2)));
        assert!(!f.matches(&product_row(5, 2)));
        assert!(!f.matches(&product_row(4, 3)));
    }

    #[test]
    fn mismatched_types_never_match() {
        let f = Filter::all().eq("stock", "4");
        assert!(!f.matches(&product_row(4, 1)));
    }

    #[test]
    fn check_columns_rejects_unknown_and_mistyped() {
        let cols = [Column::required("stock", ColumnType::Int)];
        assert!(Filter::all().lt("stock", 5_i64).check_columns(&cols).is_ok());
        assert!(Filter::all().eq("name", "x").check_columns(&cols).is_err());
        assert!(Filter::all().eq("stock", true).check_columns(&cols).is_err());
    }
}
