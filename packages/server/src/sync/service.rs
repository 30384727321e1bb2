use chrono::Utc;
use common::datetime::{normalize_date, now_formatted, today_prefix};
use sea_orm::{
    ActiveModelTrait, ActiveValue, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection,
    DatabaseTransaction, DbErr, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde_json::Value;
use tracing::{info, warn};

use crate::entity::meter_info;
use crate::error::AppError;
use crate::models::cmo::{
    BulkStatsResponse, BulkSyncRequest, BulkSyncResponse, FieldRecordInput, SyncFailure,
    SyncStatus, SyncSuccess,
};

/// Building-level values applied to records that omit them.
struct SharedFields {
    latitude: Option<f64>,
    longitude: Option<f64>,
    install_by: Option<String>,
}

/// Reconciles batches of offline field records with the `meter_info` table.
pub struct BulkSyncService<'a> {
    db: &'a DatabaseConnection,
    max_batch_size: usize,
}

impl<'a> BulkSyncService<'a> {
    pub fn new(db: &'a DatabaseConnection, max_batch_size: usize) -> Self {
        Self { db, max_batch_size }
    }

    /// Upsert every record of the batch inside one transaction.
    ///
    /// A failing record is reported in the manifest and does not stop the
    /// batch. The transaction commits if at least one record succeeded and
    /// rolls back otherwise.
    pub async fn sync(
        &self,
        principal_id: i32,
        batch: BulkSyncRequest,
    ) -> Result<BulkSyncResponse, AppError> {
        if batch.cmos.is_empty() {
            return Err(AppError::Validation("cmos must not be empty".into()));
        }
        if batch.cmos.len() > self.max_batch_size {
            return Err(AppError::Validation(format!(
                "Too many records: max {} per batch",
                self.max_batch_size
            )));
        }

        let bulk_group_id = batch
            .bulk_group_id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| format!("bulk-{}", Utc::now().timestamp_millis()));
        let shared = SharedFields {
            latitude: batch.latitude,
            longitude: batch.longitude,
            install_by: batch.install_by,
        };
        let total_count = batch.cmos.len();

        let mut success = Vec::new();
        let mut failed = Vec::new();

        let txn = self.db.begin().await?;

        for raw in batch.cmos {
            let local_id = raw.get("local_id").cloned();
            let meter_index = raw.get("meter_index").cloned();
            let raw_customer_id = raw.get("customer_id").and_then(id_to_string);

            match sync_record(&txn, principal_id, &shared, raw).await {
                Ok((server_id, customer_id, status)) => success.push(SyncSuccess {
                    local_id,
                    server_id,
                    customer_id: Some(customer_id),
                    meter_index,
                    status,
                }),
                Err(e) => {
                    warn!(
                        bulk_group_id = %bulk_group_id,
                        customer_id = raw_customer_id.as_deref(),
                        error = %e,
                        "Bulk sync record failed"
                    );
                    failed.push(SyncFailure {
                        local_id,
                        customer_id: raw_customer_id,
                        meter_index,
                        error: e.to_string(),
                    });
                }
            }
        }

        if success.is_empty() {
            txn.rollback().await?;
        } else {
            txn.commit().await?;
        }

        info!(
            bulk_group_id = %bulk_group_id,
            total = total_count,
            succeeded = success.len(),
            failed = failed.len(),
            "Bulk sync finished"
        );

        Ok(BulkSyncResponse {
            bulk_group_id,
            building_name: batch.building_name,
            total_count,
            success_count: success.len(),
            failed_count: failed.len(),
            success,
            failed,
        })
    }

    /// Count active records, overall and created today.
    pub async fn stats(&self) -> Result<BulkStatsResponse, DbErr> {
        let total_records = meter_info::Entity::find()
            .filter(meter_info::Column::IsActive.eq(1))
            .count(self.db)
            .await?;
        let today_records = meter_info::Entity::find()
            .filter(meter_info::Column::IsActive.eq(1))
            .filter(meter_info::Column::CreateDate.gte(today_prefix()))
            .count(self.db)
            .await?;

        Ok(BulkStatsResponse {
            total_records,
            today_records,
        })
    }
}

fn id_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Decode and upsert one record inside its own savepoint.
async fn sync_record(
    txn: &DatabaseTransaction,
    principal_id: i32,
    shared: &SharedFields,
    raw: Value,
) -> Result<(i32, String, SyncStatus), AppError> {
    let input: FieldRecordInput = serde_json::from_value(raw)
        .map_err(|e| AppError::Validation(format!("Invalid record: {e}")))?;

    let customer_id = input
        .customer_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::Validation("customer_id is required".into()))?
        .to_string();

    let savepoint = txn.begin().await?;
    match upsert(&savepoint, principal_id, shared, &customer_id, input).await {
        Ok((id, status)) => {
            savepoint.commit().await?;
            Ok((id, customer_id, status))
        }
        Err(e) => {
            if let Err(rollback_err) = savepoint.rollback().await {
                warn!(error = %rollback_err, "Failed to roll back record savepoint");
            }
            Err(e.into())
        }
    }
}

async fn upsert<C: ConnectionTrait>(
    conn: &C,
    principal_id: i32,
    shared: &SharedFields,
    customer_id: &str,
    input: FieldRecordInput,
) -> Result<(i32, SyncStatus), DbErr> {
    let old_consumer_key = input
        .old_consumer_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .unwrap_or(customer_id)
        .to_string();

    let existing = meter_info::Entity::find()
        .filter(
            Condition::any()
                .add(meter_info::Column::CustomerId.eq(customer_id))
                .add(meter_info::Column::OldConsumerId.eq(old_consumer_key.as_str())),
        )
        .order_by_asc(meter_info::Column::Id)
        .one(conn)
        .await?;

    let latitude = input.latitude.or(shared.latitude);
    let longitude = input.longitude.or(shared.longitude);
    let installed_by = input
        .meter_installed_by
        .clone()
        .or_else(|| shared.install_by.clone());

    match existing {
        Some(row) => {
            let mut record: meter_info::ActiveModel = row.into();
            record.customer_id = Set(Some(customer_id.to_string()));
            set_some(&mut record.old_consumer_id, input.old_consumer_id.clone().map(Some));
            set_some(&mut record.latitude, latitude.map(Some));
            set_some(&mut record.longitude, longitude.map(Some));
            set_some(&mut record.meter_installed_by, installed_by.map(Some));
            set_some(
                &mut record.install_date,
                input
                    .install_date
                    .as_deref()
                    .map(|d| Some(normalize_date(Some(d)))),
            );
            apply_fields(&mut record, input, false);
            record.update_by = Set(Some(principal_id));
            record.update_date = Set(Some(now_formatted()));

            let updated = record.update(conn).await?;
            Ok((updated.id, SyncStatus::Updated))
        }
        None => {
            let mut record = meter_info::ActiveModel {
                customer_id: Set(Some(customer_id.to_string())),
                old_consumer_id: Set(Some(old_consumer_key)),
                install_date: Set(Some(normalize_date(input.install_date.as_deref()))),
                latitude: Set(latitude),
                longitude: Set(longitude),
                meter_installed_by: Set(installed_by),
                is_apps_entry: Set(1),
                is_active: Set(1),
                create_by: Set(Some(principal_id)),
                create_date: Set(Some(now_formatted())),
                update_by: Set(None),
                update_date: Set(None),
                ..Default::default()
            };
            apply_fields(&mut record, input, true);

            let created = record.insert(conn).await?;
            Ok((created.id, SyncStatus::Created))
        }
    }
}

/// Overwrite `slot` only when the client supplied a value.
fn set_some<T>(slot: &mut ActiveValue<T>, value: Option<T>)
where
    T: Into<sea_orm::Value>,
{
    if let Some(v) = value {
        *slot = Set(v);
    }
}

/// Copy the descriptive fields of `input` onto `record`.
///
/// On insert every column is written and absent flags become 0. On update
/// only supplied values are written.
fn apply_fields(record: &mut meter_info::ActiveModel, input: FieldRecordInput, insert: bool) {
    macro_rules! text {
        ($($field:ident),* $(,)?) => {$(
            if insert {
                record.$field = Set(input.$field);
            } else {
                set_some(&mut record.$field, input.$field.map(Some));
            }
        )*};
    }
    macro_rules! flag {
        ($($field:ident),* $(,)?) => {$(
            if insert {
                record.$field = Set(input.$field.unwrap_or(0));
            } else {
                set_some(&mut record.$field, input.$field);
            }
        )*};
    }

    text!(
        old_meter_no_img_url,
        old_meter_no_ocr,
        old_meter_no_old,
        old_meter_reading_img_url,
        old_meter_reading_ocr,
        old_meter_reading_old,
        old_meter_peak,
        old_meter_off_peak,
        old_meter_kvar,
        new_meter_no_img_url,
        new_meter_no_ocr,
        new_meter_no_old,
        new_meter_type,
        new_meter_billing_type,
        new_meter_connection_type,
        pvc_wire_spec,
        pvc_wire_length,
        battery_cover_seal_img_url,
        battery_cover_seal_ocr,
        battery_cover_seal_old,
        terminal_cover_seal_img_url1,
        terminal_cover_seal_ocr1,
        terminal_cover_seal_old1,
        terminal_cover_seal_img_url2,
        terminal_cover_seal_ocr2,
        terminal_cover_seal_old2,
        steel_box_remove_url,
        rectify_status,
        rectify_message,
    );

    flag!(
        has_old_meter_no,
        has_old_meter_reading,
        has_new_meter_no,
        is_new_meter_duplicate,
        is_pvc_wire_install,
        has_battery_cover_seal,
        has_terminal_cover_seal1,
        has_terminal_cover_seal2,
        has_steel_box,
        is_steel_box_remove,
        has_revisit,
        is_approved,
        is_mdm_entry,
    );

    let revisit_dt = input.revisit_dt.as_deref().map(|d| normalize_date(Some(d)));
    let approved_date = input
        .approved_date
        .as_deref()
        .map(|d| normalize_date(Some(d)));

    if insert {
        record.approved_by = Set(input.approved_by);
        record.revisit_dt = Set(revisit_dt);
        record.approved_date = Set(approved_date);
    } else {
        set_some(&mut record.approved_by, input.approved_by.map(Some));
        set_some(&mut record.revisit_dt, revisit_dt.map(Some));
        set_some(&mut record.approved_date, approved_date.map(Some));
    }
}
