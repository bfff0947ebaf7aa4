//! Terminal rendering for the console commands.

use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, ContentArrangement, Table};
use core_types::{HistoryItem, UserInfo};
use router::ResolvedRoute;
use serde_json::Value;

fn table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

pub fn history_table(items: &[HistoryItem]) -> Table {
    let mut table = table();
    table.set_header(vec!["ID", "Date", "Strategy", "Stock", "Return %", "Win rate %", "Status"]);
    for item in items {
        table.add_row(vec![
            Cell::new(item.id),
            Cell::new(&item.date),
            Cell::new(&item.strategy),
            Cell::new(&item.stock),
            Cell::new(format!("{:.2}", item.return_pct)),
            Cell::new(format!("{:.2}", item.win_rate)),
            Cell::new(&item.status),
        ]);
    }
    table
}

pub fn user_table(user: &UserInfo) -> Table {
    let mut table = table();
    table.set_header(vec!["Field", "Value"]);
    table.add_row(vec!["id".to_string(), user.id.to_string()]);
    table.add_row(vec!["name".to_string(), user.name.clone()]);
    table.add_row(vec!["email".to_string(), user.email.clone()]);
    if let Some(picture) = &user.picture {
        table.add_row(vec!["picture".to_string(), picture.clone()]);
    }
    table
}

/// Two-column table of an object's scalar fields. Nested values are shown as
/// compact JSON.
pub fn object_table(object: &serde_json::Map<String, Value>) -> Table {
    let mut table = table();
    table.set_header(vec!["Field", "Value"]);
    for (key, value) in object {
        table.add_row(vec![key.clone(), scalar(value)]);
    }
    table
}

/// One row per object, one column per key of the first object.
pub fn rows_table(rows: &[Value]) -> Option<Table> {
    let columns: Vec<String> = rows.first()?.as_object()?.keys().cloned().collect();
    let mut table = table();
    table.set_header(columns.clone());
    for row in rows {
        table.add_row(
            columns
                .iter()
                .map(|column| row.get(column).map(scalar).unwrap_or_default())
                .collect::<Vec<_>>(),
        );
    }
    Some(table)
}

/// Prints a response body as a table when it has an obvious tabular shape,
/// and as pretty JSON otherwise.
pub fn print_value(value: &Value) {
    match value {
        Value::Array(rows) => match rows_table(rows) {
            Some(table) => println!("{table}"),
            None => print_json(value),
        },
        Value::Object(object) if object.values().all(|v| !v.is_object() && !v.is_array()) => {
            println!("{}", object_table(object));
        }
        _ => print_json(value),
    }
}

pub fn print_json(value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{text}"),
        Err(_) => println!("{value}"),
    }
}

pub fn describe_route(resolved: &ResolvedRoute) -> String {
    format!("{} ({})", resolved.full_path, resolved.route.name)
}

fn scalar(value: &Value) -> String {
    match value {
        Value::Null => "-".to_string(),
        Value::String(s) => s.clone(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() => format!("{f:.2}"),
            _ => n.to_string(),
        },
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rows_table_uses_first_row_keys_as_columns() {
        let rows = vec![
            json!({ "name": "MA", "total_return": 12.346 }),
            json!({ "name": "RSI", "total_return": -3 }),
        ];
        let rendered = rows_table(&rows).unwrap().to_string();

        assert!(rendered.contains("total_return"));
        assert!(rendered.contains("12.35"));
        assert!(rendered.contains("-3"));
    }

    #[test]
    fn rows_table_needs_objects() {
        assert!(rows_table(&[]).is_none());
        assert!(rows_table(&[json!(1), json!(2)]).is_none());
    }

    #[test]
    fn history_table_formats_percentages() {
        let item = HistoryItem {
            id: 3,
            date: "2024-05-01 10:00".to_string(),
            strategy: "Golden cross".to_string(),
            stock: "2330.TW".to_string(),
            return_pct: 7.5,
            win_rate: 60.0,
            status: "success".to_string(),
        };
        let rendered = history_table(&[item]).to_string();

        assert!(rendered.contains("7.50"));
        assert!(rendered.contains("2330.TW"));
    }
}
