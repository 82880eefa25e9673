use crate::schema::model::{DatabaseSchema, Table};
use serde_json::{json, Value};

fn table_to_json(table: &Table) -> Value {
    let columns: Vec<Value> = table
        .columns
        .iter()
        .map(|col| {
            json!({
                "name": col.name,
                "type": col.data_type,
                "nullable": col.nullable,
                "default": col.default,
                "description": col.description,
            })
        })
        .collect();

    json!({
        "name": table.name,
        "schema": table.schema,
        "description": table.description,
        "columns": columns,
    })
}

impl DatabaseSchema {
    /// nested document for programmatic consumers
    pub fn to_json(&self) -> Value {
        let tables: Vec<Value> = self.tables.iter().map(table_to_json).collect();

        let foreign_keys: Vec<Value> = self
            .foreign_keys
            .iter()
            .map(|fk| {
                json!({
                    "table": format!("{}.{}", fk.table_schema, fk.table_name),
                    "column": fk.column_name,
                    "references": format!("{}.{}", fk.foreign_table_schema, fk.foreign_table_name),
                    "referenced_column": fk.foreign_column_name,
                })
            })
            .collect();

        json!({
            "tables": tables,
            "foreign_keys": foreign_keys,
        })
    }
}
