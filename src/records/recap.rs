//! Recap aggregation
//!
//! Groups records by one field and sums the kind's numeric fields. Values may
//! arrive as JSON numbers or numeric strings (form inputs); anything else
//! counts as zero.

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

use super::kind::RecordKind;
use super::store::Record;

/// Bucket for records with no value in the grouping field
pub const UNGROUPED_KEY: &str = "-";

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecapGroup {
    pub key: String,
    pub count: usize,
    pub totals: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Recap {
    pub kind: RecordKind,
    pub group_by: String,
    pub count: usize,
    pub totals: BTreeMap<String, f64>,
    pub groups: Vec<RecapGroup>,
}

/// Numeric value of a field, tolerating numeric strings
pub fn numeric(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => parse_amount(s).unwrap_or(0.0),
        _ => 0.0,
    }
}

/// Parse a form amount in either `1500.5` or Indonesian `1.500,5` notation.
///
/// A comma is always the decimal separator. Without a comma, dots are read
/// as thousands separators only when every group after a dot has exactly
/// three digits (`1.500`, `2.000.000`).
fn parse_amount(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    let normalized = if raw.contains(',') {
        raw.replace('.', "").replace(',', ".")
    } else if is_thousands_grouped(raw) {
        raw.replace('.', "")
    } else {
        raw.to_string()
    };
    normalized.parse().ok()
}

fn is_thousands_grouped(raw: &str) -> bool {
    let mut groups = raw.trim_start_matches('-').split('.');
    let head = groups.next().unwrap_or("");
    let mut tail = groups.peekable();
    tail.peek().is_some()
        && !head.is_empty()
        && head.len() <= 3
        && head.chars().all(|c| c.is_ascii_digit())
        && tail.all(|g| g.len() == 3 && g.chars().all(|c| c.is_ascii_digit()))
}

fn group_key(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => UNGROUPED_KEY.to_string(),
    }
}

/// Group and sum records of one kind
pub fn recap(kind: RecordKind, records: &[Record], group_by: Option<&str>) -> Recap {
    let group_by = group_by
        .filter(|g| !g.is_empty())
        .unwrap_or(kind.group_field())
        .to_string();
    let fields = kind.sum_fields();

    let zeroed = || -> BTreeMap<String, f64> { fields.iter().map(|f| (f.to_string(), 0.0)).collect() };

    let mut groups: BTreeMap<String, RecapGroup> = BTreeMap::new();
    let mut totals = zeroed();

    for record in records {
        let key = group_key(record.get(&group_by));
        let group = groups.entry(key.clone()).or_insert_with(|| RecapGroup {
            key,
            count: 0,
            totals: zeroed(),
        });
        group.count += 1;

        for field in fields {
            let amount = numeric(record.get(*field));
            *group.totals.entry(field.to_string()).or_default() += amount;
            *totals.entry(field.to_string()).or_default() += amount;
        }
    }

    Recap {
        kind,
        group_by,
        count: records.len(),
        totals,
        groups: groups.into_values().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn records(values: Vec<Value>) -> Vec<Record> {
        values.into_iter().filter_map(|v| v.as_object().cloned()).collect()
    }

    #[test]
    fn test_numeric_coercion() {
        assert_eq!(numeric(Some(&json!(12))), 12.0);
        assert_eq!(numeric(Some(&json!("7.5"))), 7.5);
        assert_eq!(numeric(Some(&json!("7,5"))), 7.5);
        assert_eq!(numeric(Some(&json!("abc"))), 0.0);
        assert_eq!(numeric(None), 0.0);
    }

    #[test]
    fn test_numeric_indonesian_grouping() {
        assert_eq!(numeric(Some(&json!("1.500"))), 1500.0);
        assert_eq!(numeric(Some(&json!("2.000.000"))), 2_000_000.0);
        assert_eq!(numeric(Some(&json!("1.500,50"))), 1500.5);
        assert_eq!(numeric(Some(&json!("-1.250,5"))), -1250.5);
        assert_eq!(numeric(Some(&json!("250.5"))), 250.5);
        assert_eq!(numeric(Some(&json!("1500.25"))), 1500.25);
        assert_eq!(numeric(Some(&json!("12.34.5"))), 0.0);
    }

    #[test]
    fn test_costs_grouped_by_category() {
        let costs = records(vec![
            json!({"date": "2025-01-02", "category": "pupuk", "amount": 1000}),
            json!({"date": "2025-01-03", "category": "transport", "amount": "250.5"}),
            json!({"date": "2025-01-04", "category": "pupuk", "amount": 500}),
        ]);

        let recap = recap(RecordKind::OperationalCost, &costs, None);
        assert_eq!(recap.group_by, "category");
        assert_eq!(recap.count, 3);
        assert_eq!(recap.totals["amount"], 1750.5);

        assert_eq!(recap.groups.len(), 2);
        assert_eq!(recap.groups[0].key, "pupuk");
        assert_eq!(recap.groups[0].count, 2);
        assert_eq!(recap.groups[0].totals["amount"], 1500.0);
        assert_eq!(recap.groups[1].totals["amount"], 250.5);
    }

    #[test]
    fn test_panen_sums_weight_and_bunches() {
        let panen = records(vec![
            json!({"date_panen": "2025-01-02", "block_id": "A1", "weight_kg": 1200, "janjang": 80}),
            json!({"date_panen": "2025-01-02", "block_id": "A2", "weight_kg": 900}),
        ]);

        let recap = recap(RecordKind::Panen, &panen, None);
        assert_eq!(recap.totals["weight_kg"], 2100.0);
        assert_eq!(recap.totals["janjang"], 80.0);
        assert_eq!(recap.groups[1].totals["janjang"], 0.0);
    }

    #[test]
    fn test_custom_group_and_missing_values() {
        let angkut = records(vec![
            json!({"date": "2025-01-02", "division_id": "D1", "vehicle": "BK 1234", "weight_kg": 5000}),
            json!({"date": "2025-01-03", "division_id": "D1", "weight_kg": 3000}),
        ]);

        let recap = recap(RecordKind::Angkut, &angkut, Some("vehicle"));
        assert_eq!(recap.group_by, "vehicle");
        let keys: Vec<_> = recap.groups.iter().map(|g| g.key.as_str()).collect();
        assert_eq!(keys, vec![UNGROUPED_KEY, "BK 1234"]);
    }

    #[test]
    fn test_empty_input() {
        let recap = recap(RecordKind::Taksasi, &[], None);
        assert_eq!(recap.count, 0);
        assert!(recap.groups.is_empty());
        assert_eq!(recap.totals["estimated_kg"], 0.0);
    }
}
