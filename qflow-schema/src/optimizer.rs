use crate::types::{Intent, PrunedSchema, Schema, Table};

/// Approximates token count from character count (spec §4.3: "chars/4").
pub fn estimate_tokens(s: &str) -> usize {
    s.chars().count() / 4
}

fn render_for_estimate(tables: &[Table]) -> String {
    tables
        .iter()
        .map(|t| format!("{}({})", t.name, t.columns.iter().map(|c| c.name.as_str()).collect::<Vec<_>>().join(",")))
        .collect::<Vec<_>>()
        .join("; ")
}

fn relevance_score(table: &Table, query_words: &[String], intent: &Intent) -> u32 {
    let mut score = 0;
    let name_lower = table.name.to_lowercase();
    if intent.hinted_tables.iter().any(|h| h.eq_ignore_ascii_case(&table.name)) {
        score += 100;
    }
    for word in query_words {
        if name_lower.contains(word.as_str()) {
            score += 10;
        }
        for column in &table.columns {
            if column.name.to_lowercase().contains(word.as_str()) {
                score += 1;
            }
        }
    }
    score
}

/// Pure, synchronous schema pruning: produces the smallest superset of
/// tables/columns likely sufficient for the query, never exceeding
/// `budget_tokens` (spec §4.3 contract). Never returns zero tables if the input
/// schema has any.
pub fn optimize(schema: &Schema, query: &str, intent: Option<&Intent>, budget_tokens: usize) -> PrunedSchema {
    let default_intent = Intent::default();
    let intent = intent.unwrap_or(&default_intent);
    let query_words: Vec<String> = query
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() > 2)
        .map(|w| w.to_string())
        .collect();

    let mut scored: Vec<(&Table, u32)> =
        schema.tables.iter().map(|t| (t, relevance_score(t, &query_words, intent))).collect();
    scored.sort_by(|a, b| b.1.cmp(&a.1));

    let mut dropped_tables = Vec::new();
    let mut selected: Vec<Table> = Vec::new();

    for (idx, (table, _score)) in scored.iter().enumerate() {
        let candidate = (*table).clone();
        let mut trial = selected.clone();
        trial.push(candidate.clone());
        let size = estimate_tokens(&render_for_estimate(&trial));
        if size <= budget_tokens || (selected.is_empty() && idx == 0) {
            selected = trial;
        } else {
            dropped_tables.push(table.name.clone());
        }
    }

    // Always include at least one candidate table if any exist (spec §4.3).
    if selected.is_empty() {
        if let Some((table, _)) = scored.first() {
            selected.push((*table).clone());
            dropped_tables.retain(|n| n != &table.name);
        }
    }

    let mut dropped_columns = Vec::new();
    for table in &mut selected {
        let full_size = estimate_tokens(&render_for_estimate(std::slice::from_ref(table)));
        if full_size > budget_tokens && table.columns.len() > 1 {
            // Trim least-relevant columns (those not matching any query word) first,
            // keeping at least one column.
            let mut kept = Vec::new();
            for column in table.columns.drain(..) {
                let relevant = query_words.iter().any(|w| column.name.to_lowercase().contains(w.as_str()));
                if relevant || kept.is_empty() {
                    kept.push(column);
                } else {
                    dropped_columns.push((table.name.clone(), column.name));
                }
            }
            table.columns = kept;
        }
    }

    PrunedSchema { tables: selected, dropped_tables, dropped_columns }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Column;

    fn schema() -> Schema {
        Schema {
            tables: vec![
                Table {
                    name: "customers".into(),
                    columns: vec![
                        Column { name: "id".into(), data_type: "int".into() },
                        Column { name: "created_at".into(), data_type: "timestamp".into() },
                        Column { name: "email".into(), data_type: "text".into() },
                    ],
                },
                Table {
                    name: "orders".into(),
                    columns: vec![
                        Column { name: "id".into(), data_type: "int".into() },
                        Column { name: "customer_id".into(), data_type: "int".into() },
                        Column { name: "total".into(), data_type: "numeric".into() },
                    ],
                },
                Table {
                    name: "audit_log_entries_with_very_long_name".into(),
                    columns: (0..50)
                        .map(|i| Column { name: format!("col_{i}"), data_type: "text".into() })
                        .collect(),
                },
            ],
        }
    }

    #[test]
    fn never_exceeds_budget() {
        let pruned = optimize(&schema(), "how many customers by year", None, 30);
        let rendered = render_for_estimate(&pruned.tables);
        assert!(estimate_tokens(&rendered) <= 30);
    }

    #[test]
    fn always_includes_at_least_one_table_when_schema_nonempty() {
        let pruned = optimize(&schema(), "irrelevant query xyz", None, 1);
        assert!(!pruned.tables.is_empty());
    }

    #[test]
    fn prefers_tables_matching_query_keywords() {
        let pruned = optimize(&schema(), "how many customers", None, 15);
        assert!(pruned.tables.iter().any(|t| t.name == "customers"));
    }

    #[test]
    fn records_dropped_tables() {
        let pruned = optimize(&schema(), "how many customers", None, 10);
        assert!(!pruned.dropped_tables.is_empty());
    }

    #[test]
    fn compact_format_is_flat() {
        let pruned = optimize(&schema(), "customers", None, 100);
        let compact = pruned.format(crate::types::FormatStyle::Compact);
        assert!(!compact.contains('\n'));
    }

    #[test]
    fn structured_format_is_hierarchical() {
        let pruned = optimize(&schema(), "customers", None, 100);
        let structured = pruned.format(crate::types::FormatStyle::Structured);
        assert!(structured.contains("table "));
    }
}
