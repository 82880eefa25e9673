//! Plain-text renderings returned by resources and tools.

pub const MAX_RESULT_ROWS: usize = 100;
pub const NO_RESULTS: &str = "Query executed successfully. No results returned.";

/// quote an identifier for direct interpolation into sql
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// `header | row...` table, capped at [`MAX_RESULT_ROWS`] data rows
pub fn render_query_results(columns: &[String], rows: &[Vec<Option<String>>]) -> String {
    if rows.is_empty() {
        return NO_RESULTS.to_string();
    }

    let header = columns.join(" | ");
    let separator = "-".repeat(header.chars().count());

    let body = rows
        .iter()
        .take(MAX_RESULT_ROWS)
        .map(|row| {
            row.iter()
                .map(|v| v.as_deref().unwrap_or("NULL"))
                .collect::<Vec<_>>()
                .join(" | ")
        })
        .collect::<Vec<_>>()
        .join("\n");

    let mut out = format!("{}\n{}\n{}", header, separator, body);
    if rows.len() > MAX_RESULT_ROWS {
        out.push_str(&format!(
            "\n\n(Showing {} of {} results)",
            MAX_RESULT_ROWS,
            rows.len()
        ));
    }
    out
}

pub fn render_table_list(database_name: &str, tables: &[String]) -> String {
    if tables.is_empty() {
        return "No tables found in the public schema".to_string();
    }

    let list = tables
        .iter()
        .map(|t| format!("- {}", t))
        .collect::<Vec<_>>()
        .join("\n");
    format!("Tables in {}:\n\n{}", database_name, list)
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
    pub default: Option<String>,
}

/// pseudo ddl for a table, followed by its index definitions
pub fn render_create_table(
    table: &str,
    columns: &[ColumnDef],
    primary_keys: &[String],
    indexes: &[String],
) -> String {
    let column_lines = columns
        .iter()
        .map(|c| {
            let mut parts = vec![
                c.name.clone(),
                c.data_type.clone(),
                if c.nullable { "NULL" } else { "NOT NULL" }.to_string(),
            ];
            if let Some(default) = c.default.as_deref().filter(|d| !d.is_empty()) {
                parts.push(format!("DEFAULT {}", default));
            }
            if primary_keys.contains(&c.name) {
                parts.push("PRIMARY KEY".to_string());
            }
            format!("  {}", parts.join(" "))
        })
        .collect::<Vec<_>>()
        .join(",\n");

    let mut out = format!("CREATE TABLE {} (\n{}\n);", table, column_lines);

    if !indexes.is_empty() {
        let defs = indexes
            .iter()
            .map(|i| format!("{};", i))
            .collect::<Vec<_>>()
            .join("\n");
        out.push_str(&format!("\n\n-- Indexes:\n{}", defs));
    }
    out
}

#[derive(Debug, Clone, PartialEq)]
pub struct DatabaseInfo {
    pub name: String,
    pub version: String,
    pub size: String,
    pub schema_count: i64,
    pub table_count: i64,
    pub view_count: i64,
}

pub fn render_database_info(info: &DatabaseInfo) -> String {
    format!(
        "Database Information:\n\
         --------------------\n\
         Name: {}\n\
         PostgreSQL Version: {}\n\
         Size: {}\n\
         Schema Count: {}\n\
         Table Count: {}\n\
         View Count: {}",
        info.name, info.version, info.size, info.schema_count, info.table_count, info.view_count
    )
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnStats {
    pub name: String,
    pub data_type: String,
    pub null_count: i64,
    pub distinct_count: i64,
}

fn percent(count: i64, total: i64) -> f64 {
    if total > 0 {
        count as f64 / total as f64 * 100.0
    } else {
        0.0
    }
}

pub fn render_table_stats(table: &str, row_count: i64, size: &str, columns: &[ColumnStats]) -> String {
    let column_blocks = columns
        .iter()
        .map(|c| {
            format!(
                "Column: {}\nType: {}\nNull Values: {} ({:.1}%)\nDistinct Values: {} ({:.1}%)",
                c.name,
                c.data_type,
                c.null_count,
                percent(c.null_count, row_count),
                c.distinct_count,
                percent(c.distinct_count, row_count)
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "Table Statistics: {}\n\
         -----------------------\n\
         Row Count: {}\n\
         Table Size: {}\n\n\
         Column Statistics:\n\
         -----------------\n\
         {}",
        table, row_count, size, column_blocks
    )
    .trim()
    .to_string()
}

/// one foreign-key edge as `(column, other_table, other_column)`
pub type Reference = (String, String, String);

pub fn render_relationships(table: &str, outgoing: &[Reference], incoming: &[Reference]) -> String {
    let mut lines = vec![format!("Relationships for table: {}\n", table)];

    if outgoing.is_empty() {
        lines.push("No outgoing references found.".to_string());
    } else {
        lines.push("References to other tables (outgoing):".to_string());
        for (local_column, foreign_table, foreign_column) in outgoing {
            lines.push(format!(
                "  - {}.{} → {}.{}",
                table, local_column, foreign_table, foreign_column
            ));
        }
    }

    lines.push(String::new());

    if incoming.is_empty() {
        lines.push("No incoming references found.".to_string());
    } else {
        lines.push("References from other tables (incoming):".to_string());
        for (local_column, referencing_table, referencing_column) in incoming {
            lines.push(format!(
                "  - {}.{} → {}.{}",
                referencing_table, referencing_column, table, local_column
            ));
        }
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns() -> Vec<String> {
        vec!["id".to_string(), "name".to_string()]
    }

    #[test]
    fn test_results_capped_at_one_hundred_rows() {
        let rows: Vec<Vec<Option<String>>> = (0..150)
            .map(|i| vec![Some(i.to_string()), Some(format!("customer {}", i))])
            .collect();

        let out = render_query_results(&columns(), &rows);
        let lines: Vec<&str> = out.lines().collect();

        assert_eq!(lines[0], "id | name");
        assert_eq!(lines[1], "---------");
        assert_eq!(lines[2], "0 | customer 0");
        assert_eq!(lines[101], "99 | customer 99");
        assert!(!out.contains("customer 100"));
        assert!(out.ends_with("\n\n(Showing 100 of 150 results)"));
    }

    #[test]
    fn test_exactly_one_hundred_rows_has_no_footer() {
        let rows: Vec<Vec<Option<String>>> =
            (0..100).map(|i| vec![Some(i.to_string()), None]).collect();

        let out = render_query_results(&columns(), &rows);

        assert!(!out.contains("Showing"));
        assert_eq!(out.lines().count(), 102);
    }

    #[test]
    fn test_zero_rows_message() {
        assert_eq!(render_query_results(&columns(), &[]), NO_RESULTS);
    }

    #[test]
    fn test_null_renders_as_null() {
        let out = render_query_results(&columns(), &[vec![Some("1".to_string()), None]]);
        assert!(out.ends_with("1 | NULL"));
    }

    #[test]
    fn test_quote_ident_doubles_quotes() {
        assert_eq!(quote_ident("orders"), "\"orders\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn test_table_list() {
        assert_eq!(
            render_table_list("shop", &["customers".to_string(), "orders".to_string()]),
            "Tables in shop:\n\n- customers\n- orders"
        );
        assert_eq!(
            render_table_list("shop", &[]),
            "No tables found in the public schema"
        );
    }

    #[test]
    fn test_create_table_with_indexes() {
        let cols = vec![
            ColumnDef {
                name: "id".to_string(),
                data_type: "integer".to_string(),
                nullable: false,
                default: Some("nextval('customers_id_seq'::regclass)".to_string()),
            },
            ColumnDef {
                name: "email".to_string(),
                data_type: "text".to_string(),
                nullable: true,
                default: None,
            },
        ];

        let out = render_create_table(
            "customers",
            &cols,
            &["id".to_string()],
            &["CREATE UNIQUE INDEX customers_pkey ON public.customers USING btree (id)".to_string()],
        );

        assert_eq!(
            out,
            "CREATE TABLE customers (\n\
             \x20 id integer NOT NULL DEFAULT nextval('customers_id_seq'::regclass) PRIMARY KEY,\n\
             \x20 email text NULL\n\
             );\n\n\
             -- Indexes:\n\
             CREATE UNIQUE INDEX customers_pkey ON public.customers USING btree (id);"
        );
    }

    #[test]
    fn test_create_table_without_indexes() {
        let out = render_create_table("t", &[], &[], &[]);
        assert!(!out.contains("Indexes"));
    }

    #[test]
    fn test_table_stats_percentages() {
        let out = render_table_stats(
            "customers",
            3,
            "16 kB",
            &[ColumnStats {
                name: "email".to_string(),
                data_type: "text".to_string(),
                null_count: 1,
                distinct_count: 2,
            }],
        );

        assert!(out.starts_with("Table Statistics: customers\n"));
        assert!(out.contains("Row Count: 3\nTable Size: 16 kB"));
        assert!(out.contains("Null Values: 1 (33.3%)"));
        assert!(out.contains("Distinct Values: 2 (66.7%)"));
    }

    #[test]
    fn test_table_stats_empty_table() {
        let out = render_table_stats(
            "empty",
            0,
            "8192 bytes",
            &[ColumnStats {
                name: "id".to_string(),
                data_type: "integer".to_string(),
                null_count: 0,
                distinct_count: 0,
            }],
        );
        assert!(out.contains("Null Values: 0 (0.0%)"));
    }

    #[test]
    fn test_relationships_both_directions() {
        let out = render_relationships(
            "orders",
            &[(
                "customer_id".to_string(),
                "customers".to_string(),
                "id".to_string(),
            )],
            &[(
                "id".to_string(),
                "order_items".to_string(),
                "order_id".to_string(),
            )],
        );

        assert_eq!(
            out,
            "Relationships for table: orders\n\n\
             References to other tables (outgoing):\n\
             \x20 - orders.customer_id → customers.id\n\n\
             References from other tables (incoming):\n\
             \x20 - order_items.order_id → orders.id"
        );
    }

    #[test]
    fn test_relationships_none() {
        let out = render_relationships("lonely", &[], &[]);
        assert!(out.contains("No outgoing references found.\n\nNo incoming references found."));
    }

    #[test]
    fn test_database_info_layout() {
        let out = render_database_info(&DatabaseInfo {
            name: "shop".to_string(),
            version: "PostgreSQL 16.2".to_string(),
            size: "7 MB".to_string(),
            schema_count: 4,
            table_count: 2,
            view_count: 0,
        });
        assert!(out.starts_with("Database Information:\n--------------------\nName: shop\n"));
        assert!(out.ends_with("View Count: 0"));
    }
}
