//! Record service
//!
//! CRUD over gated records with the closing check wired into every write.
//! Updates and deletes load the stored record first so the gate sees the date
//! the record actually has, not only what the client sent.

use chrono::{NaiveDate, Utc};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

use super::kind::RecordKind;
use super::recap::{recap, Recap};
use super::store::{record_day, DateRange, Record, RecordStore};
use crate::activity::{spawn_activity, ActivityAction, ActivityEntry, ActivityLogger};
use crate::closing::{Mutation, MutationGate};
use crate::types::{format_day, parse_day, Result, SawitError};

/// Keys clients may not set directly
const RESERVED_KEYS: [&str; 3] = ["id", "_id", "metadata"];

#[derive(Clone)]
pub struct RecordService {
    store: Arc<dyn RecordStore>,
    gate: MutationGate,
    activity: Arc<dyn ActivityLogger>,
}

impl RecordService {
    pub fn new(store: Arc<dyn RecordStore>, gate: MutationGate, activity: Arc<dyn ActivityLogger>) -> Self {
        Self { store, gate, activity }
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    pub async fn create(&self, kind: RecordKind, body: Value, user: Option<String>) -> Result<Record> {
        let mut record = into_object(body)?;
        strip_reserved(&mut record);

        for field in kind.required_fields() {
            if is_blank(record.get(*field)) {
                return Err(SawitError::validation(format!("Field '{}' is required", field)));
            }
        }
        let day = normalize_date(kind, &mut record)?
            .ok_or_else(|| SawitError::validation(format!("Field '{}' is required", kind.date_field())))?;

        self.gate.check(Mutation::Create, day).await?;

        let now = Utc::now().to_rfc3339();
        record.insert(
            "metadata".into(),
            json!({ "created_at": now, "updated_at": now, "created_by": user.as_deref() }),
        );

        let created = self.store.insert(kind, record).await?;
        let id = record_id(&created);
        info!(kind = %kind, id = %id, date = %day, "Record created");

        self.log(ActivityAction::Create, kind, &id, day, user);
        Ok(created)
    }

    pub async fn get(&self, kind: RecordKind, id: &str) -> Result<Record> {
        self.store
            .get(kind, id)
            .await?
            .ok_or_else(|| not_found(kind))
    }

    pub async fn list(&self, kind: RecordKind, range: DateRange) -> Result<Vec<Record>> {
        self.store.list(kind, range).await
    }

    pub async fn recap(&self, kind: RecordKind, range: DateRange, group_by: Option<&str>) -> Result<Recap> {
        let records = self.store.list(kind, range).await?;
        Ok(recap(kind, &records, group_by))
    }

    pub async fn update(&self, kind: RecordKind, id: &str, patch: Value, user: Option<String>) -> Result<Record> {
        let existing = self.get(kind, id).await?;
        let existing_day = stored_day(kind, &existing)?;

        let mut patch = into_object(patch)?;
        strip_reserved(&mut patch);
        let incoming_day = normalize_date(kind, &mut patch)?;

        self.gate.check_update(existing_day, incoming_day).await?;

        let mut merged = existing;
        for (key, value) in patch {
            merged.insert(key, value);
        }
        for field in kind.required_fields() {
            if is_blank(merged.get(*field)) {
                return Err(SawitError::validation(format!("Field '{}' is required", field)));
            }
        }
        if let Some(Value::Object(metadata)) = merged.get_mut("metadata") {
            metadata.insert("updated_at".into(), json!(Utc::now().to_rfc3339()));
            metadata.insert("updated_by".into(), json!(user.as_deref()));
        }

        let updated = self.store.replace(kind, id, merged).await?;
        let day = incoming_day.unwrap_or(existing_day);
        info!(kind = %kind, id = %id, date = %day, "Record updated");

        self.log(ActivityAction::Update, kind, id, day, user);
        Ok(updated)
    }

    pub async fn delete(&self, kind: RecordKind, id: &str, user: Option<String>) -> Result<()> {
        let existing = self.get(kind, id).await?;
        let day = stored_day(kind, &existing)?;

        self.gate.check(Mutation::Delete, day).await?;

        if !self.store.delete(kind, id).await? {
            return Err(not_found(kind));
        }
        info!(kind = %kind, id = %id, date = %day, "Record deleted");

        self.log(ActivityAction::Delete, kind, id, day, user);
        Ok(())
    }

    fn log(&self, action: ActivityAction, kind: RecordKind, id: &str, day: NaiveDate, user: Option<String>) {
        let entry = ActivityEntry::new(action, kind.collection())
            .with_user(user)
            .with_entity_id(id)
            .with_details(format!("{} {}", kind.date_field(), format_day(day)));
        spawn_activity(Arc::clone(&self.activity), entry);
    }
}

fn into_object(body: Value) -> Result<Record> {
    match body {
        Value::Object(map) => Ok(map),
        _ => Err(SawitError::validation("Request body must be a JSON object")),
    }
}

fn strip_reserved(record: &mut Record) {
    for key in RESERVED_KEYS {
        record.remove(key);
    }
}

fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        _ => false,
    }
}

/// Parse the kind's date field if present and rewrite it as `YYYY-MM-DD`
fn normalize_date(kind: RecordKind, record: &mut Record) -> Result<Option<NaiveDate>> {
    let field = kind.date_field();
    let day = match record.get(field) {
        None => return Ok(None),
        Some(Value::String(raw)) => parse_day(raw)
            .ok_or_else(|| SawitError::validation(format!("Invalid date for '{}': {}", field, raw)))?,
        Some(other) => {
            return Err(SawitError::validation(format!("Invalid date for '{}': {}", field, other)))
        }
    };
    record.insert(field.to_string(), Value::String(format_day(day)));
    Ok(Some(day))
}

fn stored_day(kind: RecordKind, record: &Record) -> Result<NaiveDate> {
    record_day(kind, record).ok_or_else(|| {
        SawitError::validation(format!(
            "{} {} has no valid '{}'",
            kind.label(),
            record_id(record),
            kind.date_field()
        ))
    })
}

fn record_id(record: &Record) -> String {
    record
        .get("id")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn not_found(kind: RecordKind) -> SawitError {
    SawitError::not_found(format!("{} not found", kind.label()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::MemoryActivityLogger;
    use crate::closing::{ClosingRegistry, MemoryClosingRegistry, NewClosingPeriod};
    use crate::records::MemoryRecordStore;
    use async_trait::async_trait;

    struct Fixture {
        service: RecordService,
        registry: Arc<MemoryClosingRegistry>,
        store: Arc<MemoryRecordStore>,
        activity: Arc<MemoryActivityLogger>,
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn fixture() -> Fixture {
        let registry = Arc::new(MemoryClosingRegistry::new());
        let store = Arc::new(MemoryRecordStore::new());
        let activity = Arc::new(MemoryActivityLogger::new());
        let service = RecordService::new(store.clone(), MutationGate::new(registry.clone()), activity.clone());
        Fixture {
            service,
            registry,
            store,
            activity,
        }
    }

    async fn close_january(registry: &MemoryClosingRegistry) -> String {
        registry
            .create_closing_period(
                NewClosingPeriod::new(day(2025, 1, 1), day(2025, 1, 31), Some(1), Some(2025), None, None)
                    .unwrap(),
            )
            .await
            .unwrap()
            .id
    }

    fn report(date: &str) -> Value {
        json!({ "date": date, "employee_id": "E-01", "activity": "panen", "hk": 1 })
    }

    /// Let detached activity writes finish
    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_january_closed_scenario() {
        let f = fixture();
        close_january(&f.registry).await;

        let err = f
            .service
            .create(RecordKind::Report, report("2025-01-15"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, SawitError::PeriodClosed(d) if d == day(2025, 1, 15)));
        assert_eq!(f.store.count(RecordKind::Report), 0);

        let created = f
            .service
            .create(RecordKind::Report, report("2025-02-01"), Some("mandor".into()))
            .await
            .unwrap();
        assert_eq!(created["date"], json!("2025-02-01"));
        assert_eq!(f.store.count(RecordKind::Report), 1);
    }

    #[tokio::test]
    async fn test_boundaries_are_closed() {
        let f = fixture();
        close_january(&f.registry).await;
        for date in ["2025-01-01", "2025-01-31"] {
            assert!(f.service.create(RecordKind::Report, report(date), None).await.is_err());
        }
        assert!(f.service.create(RecordKind::Report, report("2024-12-31"), None).await.is_ok());
    }

    #[tokio::test]
    async fn test_update_and_delete_blocked_for_closed_record() {
        let f = fixture();
        let created = f
            .service
            .create(RecordKind::Report, report("2025-01-15"), None)
            .await
            .unwrap();
        let id = record_id(&created);
        close_january(&f.registry).await;

        // Moving the record out of the closed month is still a change to a closed record
        let err = f
            .service
            .update(RecordKind::Report, &id, json!({ "date": "2025-02-01" }), None)
            .await
            .unwrap_err();
        assert!(matches!(err, SawitError::PeriodClosed(_)));

        let err = f.service.delete(RecordKind::Report, &id, None).await.unwrap_err();
        assert!(matches!(err, SawitError::PeriodClosed(_)));
        assert_eq!(f.store.count(RecordKind::Report), 1);
    }

    #[tokio::test]
    async fn test_update_into_closed_month_blocked() {
        let f = fixture();
        close_january(&f.registry).await;
        let created = f
            .service
            .create(RecordKind::Report, report("2025-02-10"), None)
            .await
            .unwrap();
        let id = record_id(&created);

        let err = f
            .service
            .update(RecordKind::Report, &id, json!({ "date": "2025-01-10" }), None)
            .await
            .unwrap_err();
        assert!(matches!(err, SawitError::PeriodClosed(d) if d == day(2025, 1, 10)));

        let updated = f
            .service
            .update(RecordKind::Report, &id, json!({ "activity": "rawat" }), None)
            .await
            .unwrap();
        assert_eq!(updated["activity"], json!("rawat"));
        assert_eq!(updated["date"], json!("2025-02-10"));
    }

    #[tokio::test]
    async fn test_reopen_makes_records_mutable() {
        let f = fixture();
        let created = f
            .service
            .create(RecordKind::Panen, json!({ "date_panen": "2025-01-20", "block_id": "B3", "weight_kg": 800 }), None)
            .await
            .unwrap();
        let id = record_id(&created);
        let period_id = close_january(&f.registry).await;
        assert!(f.service.delete(RecordKind::Panen, &id, None).await.is_err());

        f.registry.reopen_period(&period_id).await.unwrap();
        f.service.delete(RecordKind::Panen, &id, None).await.unwrap();
        assert_eq!(f.store.count(RecordKind::Panen), 0);
    }

    #[tokio::test]
    async fn test_validation_errors() {
        let f = fixture();

        let err = f
            .service
            .create(RecordKind::OperationalCost, json!({ "date": "2025-02-01", "category": "pupuk" }), None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("amount"));

        let err = f
            .service
            .create(RecordKind::Report, report("kemarin"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, SawitError::Validation(_)));

        let err = f
            .service
            .create(RecordKind::Report, json!(["not", "an", "object"]), None)
            .await
            .unwrap_err();
        assert!(matches!(err, SawitError::Validation(_)));
    }

    #[tokio::test]
    async fn test_timestamp_dates_are_normalized() {
        let f = fixture();
        let created = f
            .service
            .create(RecordKind::Taksasi, json!({ "date": "2025-03-04T10:00:00Z", "block_id": "C1", "estimated_kg": 900 }), None)
            .await
            .unwrap();
        assert_eq!(created["date"], json!("2025-03-04"));
    }

    #[tokio::test]
    async fn test_reserved_keys_ignored() {
        let f = fixture();
        let mut body = report("2025-02-01");
        body["id"] = json!("forged");
        let created = f.service.create(RecordKind::Report, body, None).await.unwrap();
        assert_ne!(created["id"], json!("forged"));
    }

    #[tokio::test]
    async fn test_missing_record_is_not_found() {
        let f = fixture();
        let id = bson::oid::ObjectId::new().to_hex();
        let err = f.service.delete(RecordKind::Angkut, &id, None).await.unwrap_err();
        assert!(matches!(err, SawitError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_activity_logged_only_on_success() {
        let f = fixture();
        close_january(&f.registry).await;

        let _ = f.service.create(RecordKind::Report, report("2025-01-15"), None).await;
        f.service
            .create(RecordKind::Report, report("2025-02-01"), Some("mandor".into()))
            .await
            .unwrap();
        settle().await;

        let entries = f.activity.recent(10).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action, ActivityAction::Create);
        assert_eq!(entries[0].user.as_deref(), Some("mandor"));
    }

    struct FailingLogger;

    #[async_trait]
    impl ActivityLogger for FailingLogger {
        async fn record(&self, _entry: ActivityEntry) -> Result<()> {
            Err(SawitError::Database("activity store offline".into()))
        }

        async fn recent(&self, _limit: usize) -> Result<Vec<ActivityEntry>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_logger_failure_does_not_block_mutation() {
        let registry = Arc::new(MemoryClosingRegistry::new());
        let store = Arc::new(MemoryRecordStore::new());
        let service = RecordService::new(store.clone(), MutationGate::new(registry), Arc::new(FailingLogger));

        service
            .create(RecordKind::Angkut, json!({ "date": "2025-02-01", "division_id": "D1", "weight_kg": 4000 }), None)
            .await
            .unwrap();
        settle().await;
        assert_eq!(store.count(RecordKind::Angkut), 1);
    }

    #[tokio::test]
    async fn test_recap_over_range() {
        let f = fixture();
        for (date, category, amount) in [
            ("2025-02-01", "pupuk", 100),
            ("2025-02-15", "pupuk", 50),
            ("2025-03-01", "gaji", 900),
        ] {
            f.service
                .create(
                    RecordKind::OperationalCost,
                    json!({ "date": date, "category": category, "amount": amount }),
                    None,
                )
                .await
                .unwrap();
        }

        let february = DateRange {
            start: Some(day(2025, 2, 1)),
            end: Some(day(2025, 2, 28)),
        };
        let recap = f.service.recap(RecordKind::OperationalCost, february, None).await.unwrap();
        assert_eq!(recap.count, 2);
        assert_eq!(recap.totals["amount"], 150.0);
    }
}
