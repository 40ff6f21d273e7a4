//! SQL schema discovery for denorm
//!
//! Extracts the relational schema contract from SQL DDL:
//! - Tables -> tables with columns and primary keys
//! - Primary keys, unique constraints, `CREATE INDEX` -> indexes
//! - Foreign keys (table- and column-level) -> relationships
//! - Unique foreign keys and junction tables -> cardinality (see [`derive`])

pub mod derive;

use sqlparser::ast::*;
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::{Parser, ParserError};
use thiserror::Error;

use denorm_core::model::{ColumnInfo, IndexInfo, RelationalSchema, TableInfo};

#[derive(Debug, Error)]
pub enum SchemaIngestError {
    #[error("SQL parse error: {0}")]
    Parse(#[from] ParserError),
}

/// Raw DDL facts before relationship derivation.
#[derive(Debug, Clone, Default)]
pub struct DdlFacts {
    pub tables: Vec<TableInfo>,
    pub foreign_keys: Vec<ForeignKey>,
    pub unique_keys: Vec<UniqueKey>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKey {
    pub from_table: String,
    pub from_columns: Vec<String>,
    pub to_table: String,
    pub to_columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniqueKey {
    pub table: String,
    pub columns: Vec<String>,
}

/// Unqualified, unquoted name (`"public"."Orders"` -> `Orders`).
fn object_name(name: &ObjectName) -> String {
    name.0
        .last()
        .map(|ident| ident.value.clone())
        .unwrap_or_default()
}

fn idents(cols: &[Ident]) -> Vec<String> {
    cols.iter().map(|c| c.value.clone()).collect()
}

/// Parse SQL DDL into raw table, key and index facts.
pub fn parse_ddl_facts(sql: &str) -> Result<DdlFacts, SchemaIngestError> {
    let dialect = GenericDialect {};
    let statements = Parser::parse_sql(&dialect, sql)?;

    let mut facts = DdlFacts::default();
    let mut pending_indexes: Vec<(String, IndexInfo)> = Vec::new();

    for stmt in statements {
        match stmt {
            Statement::CreateTable {
                name,
                columns: sql_columns,
                constraints: sql_constraints,
                ..
            } => {
                let table_name = object_name(&name);
                let mut columns = Vec::new();
                let mut primary_key = Vec::new();
                let mut indexes = Vec::new();

                for col in &sql_columns {
                    let col_name = col.name.value.clone();
                    columns.push(ColumnInfo {
                        name: col_name.clone(),
                        data_type: col.data_type.to_string(),
                        nullable: !col
                            .options
                            .iter()
                            .any(|opt| matches!(opt.option, ColumnOption::NotNull)),
                    });

                    for opt in &col.options {
                        match &opt.option {
                            ColumnOption::Unique { is_primary, .. } => {
                                if *is_primary {
                                    primary_key = vec![col_name.clone()];
                                } else {
                                    facts.unique_keys.push(UniqueKey {
                                        table: table_name.clone(),
                                        columns: vec![col_name.clone()],
                                    });
                                    indexes.push(IndexInfo {
                                        name: format!("{table_name}_{col_name}_key"),
                                        columns: vec![col_name.clone()],
                                        unique: true,
                                    });
                                }
                            }
                            ColumnOption::ForeignKey {
                                foreign_table,
                                referred_columns,
                                ..
                            } => {
                                facts.foreign_keys.push(ForeignKey {
                                    from_table: table_name.clone(),
                                    from_columns: vec![col_name.clone()],
                                    to_table: object_name(foreign_table),
                                    to_columns: idents(referred_columns),
                                });
                            }
                            _ => {}
                        }
                    }
                }

                for constraint in &sql_constraints {
                    match constraint {
                        TableConstraint::ForeignKey {
                            columns: fk_cols,
                            foreign_table,
                            referred_columns,
                            ..
                        } => {
                            facts.foreign_keys.push(ForeignKey {
                                from_table: table_name.clone(),
                                from_columns: idents(fk_cols),
                                to_table: object_name(foreign_table),
                                to_columns: idents(referred_columns),
                            });
                        }
                        TableConstraint::Unique {
                            columns: uq_cols,
                            is_primary,
                            ..
                        } => {
                            let cols = idents(uq_cols);
                            if *is_primary {
                                primary_key = cols;
                            } else {
                                indexes.push(IndexInfo {
                                    name: format!("{table_name}_{}_key", cols.join("_")),
                                    columns: cols.clone(),
                                    unique: true,
                                });
                                facts.unique_keys.push(UniqueKey {
                                    table: table_name.clone(),
                                    columns: cols,
                                });
                            }
                        }
                        _ => {}
                    }
                }

                if !primary_key.is_empty() {
                    indexes.insert(
                        0,
                        IndexInfo {
                            name: format!("{table_name}_pkey"),
                            columns: primary_key.clone(),
                            unique: true,
                        },
                    );
                }

                facts.tables.push(TableInfo {
                    name: table_name,
                    columns,
                    primary_key,
                    indexes,
                });
            }
            Statement::CreateIndex {
                name,
                table_name,
                columns,
                unique,
                ..
            } => {
                let table = object_name(&table_name);
                let cols: Vec<String> = columns.iter().map(|c| c.expr.to_string()).collect();
                let index_name = name
                    .as_ref()
                    .map(object_name)
                    .unwrap_or_else(|| format!("{table}_{}_idx", cols.join("_")));
                pending_indexes.push((
                    table,
                    IndexInfo {
                        name: index_name,
                        columns: cols,
                        unique,
                    },
                ));
            }
            _ => {}
        }
    }

    for (table, index) in pending_indexes {
        match facts
            .tables
            .iter_mut()
            .find(|t| t.name.eq_ignore_ascii_case(&table))
        {
            Some(t) => t.indexes.push(index),
            None => tracing::warn!(table = %table, index = %index.name, "index on unknown table"),
        }
    }

    Ok(facts)
}

/// Parse SQL DDL into the relational schema consumed by the analysis engine.
pub fn parse_sql_ddl(sql: &str) -> Result<RelationalSchema, SchemaIngestError> {
    let facts = parse_ddl_facts(sql)?;
    let relationships = derive::derive_relationships(&facts);
    Ok(RelationalSchema {
        tables: facts.tables,
        relationships,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tables_columns_and_indexes() {
        let sql = r#"
            CREATE TABLE customers (
                id INT PRIMARY KEY,
                email VARCHAR(255) NOT NULL UNIQUE,
                name TEXT
            );
            CREATE TABLE orders (
                id INT NOT NULL,
                customer_id INT NOT NULL REFERENCES customers(id),
                placed_at TIMESTAMP,
                PRIMARY KEY (id)
            );
            CREATE INDEX idx_orders_placed ON orders (placed_at);
            CREATE INDEX idx_missing ON ghosts (id);
        "#;

        let facts = parse_ddl_facts(sql).unwrap();
        assert_eq!(facts.tables.len(), 2);

        let customers = &facts.tables[0];
        assert_eq!(customers.primary_key, vec!["id"]);
        assert_eq!(customers.indexes.len(), 2);
        assert!(!customers.columns[1].nullable);
        assert!(customers.columns[2].nullable);

        let orders = &facts.tables[1];
        assert_eq!(orders.primary_key, vec!["id"]);
        assert_eq!(orders.indexes.len(), 2);
        assert_eq!(orders.indexes[1].name, "idx_orders_placed");

        assert_eq!(
            facts.foreign_keys,
            vec![ForeignKey {
                from_table: "orders".to_string(),
                from_columns: vec!["customer_id".to_string()],
                to_table: "customers".to_string(),
                to_columns: vec!["id".to_string()],
            }]
        );
    }

    #[test]
    fn test_parse_error_is_reported() {
        assert!(matches!(
            parse_sql_ddl("CREATE TABLE ("),
            Err(SchemaIngestError::Parse(_))
        ));
    }
}
