use crate::schema::model::{Column, DatabaseSchema, ForeignKey, Table};

fn render_column(col: &Column) -> String {
    let mut line = format!("  - {} ({})", col.name, col.data_type);

    if !col.nullable {
        line.push_str(" NOT NULL");
    }

    if let Some(default) = col.default.as_deref().filter(|d| !d.is_empty()) {
        line.push_str(&format!(" DEFAULT {}", default));
    }

    if let Some(description) = col.description.as_deref().filter(|d| !d.is_empty()) {
        line.push_str(&format!(" -- {}", description));
    }

    line
}

fn render_table(table: &Table) -> String {
    let mut lines = vec![format!("Table: {}", table.qualified_name())];

    if let Some(description) = table.description.as_deref().filter(|d| !d.is_empty()) {
        lines.push(format!("Description: {}", description));
    }

    lines.push("Columns:".to_string());
    lines.extend(table.columns.iter().map(render_column));

    lines.join("\n")
}

fn render_foreign_key(fk: &ForeignKey) -> String {
    format!(
        "  - {}.{}.{} → {}.{}.{}",
        fk.table_schema,
        fk.table_name,
        fk.column_name,
        fk.foreign_table_schema,
        fk.foreign_table_name,
        fk.foreign_column_name
    )
}

impl DatabaseSchema {
    /// flattened rendering injected into prompts; tables keep their order and
    /// always come before the foreign key section
    pub fn to_context_string(&self) -> String {
        let mut blocks = vec!["DATABASE SCHEMA:".to_string()];

        blocks.extend(self.tables.iter().map(render_table));

        if !self.foreign_keys.is_empty() {
            blocks.push("FOREIGN KEYS:".to_string());
            blocks.extend(self.foreign_keys.iter().map(render_foreign_key));
        }

        blocks.join("\n\n")
    }
}
