use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::shared::{Pagination, lenient_date, lenient_f64, lenient_flag, lenient_string};
use crate::entity::meter_info;

/// A batch of field records collected offline, usually for one building.
#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct BulkSyncRequest {
    /// Client-side batch id, echoed back. Generated when absent.
    #[schema(example = "bulk-1735689600000")]
    pub bulk_group_id: Option<String>,
    #[schema(example = "Rupayan Tower")]
    pub building_name: Option<String>,
    pub building_address: Option<String>,
    /// Used for records that carry no coordinates of their own.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub latitude: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub longitude: Option<f64>,
    pub feeder: Option<String>,
    /// Used for records without `meter_installed_by`.
    pub install_by: Option<String>,
    /// Raw records; each is decoded on its own so one bad record cannot fail the batch.
    #[serde(default)]
    #[schema(value_type = Vec<FieldRecordInput>)]
    pub cmos: Vec<Value>,
}

/// One meter installation as sent by the field app.
///
/// Every field is optional except `customer_id`. Flags accept booleans, 0/1
/// or numeric strings. Dates accept RFC 3339 or `YYYY-MM-DD[ HH:mm[:ss[.mmm]]]`.
#[derive(Debug, Default, Deserialize, utoipa::ToSchema)]
#[serde(default)]
pub struct FieldRecordInput {
    /// Client-side id, echoed in the manifest.
    #[schema(value_type = Object)]
    pub local_id: Option<Value>,
    /// Position of the meter inside its building, echoed in the manifest.
    #[schema(value_type = Object)]
    pub meter_index: Option<Value>,

    #[serde(deserialize_with = "lenient_string")]
    pub customer_id: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub old_consumer_id: Option<String>,
    #[serde(deserialize_with = "lenient_date")]
    pub install_date: Option<String>,
    #[serde(deserialize_with = "lenient_f64")]
    pub latitude: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub longitude: Option<f64>,

    #[serde(deserialize_with = "lenient_flag")]
    pub has_old_meter_no: Option<i32>,
    pub old_meter_no_img_url: Option<String>,
    pub old_meter_no_ocr: Option<String>,
    pub old_meter_no_old: Option<String>,
    #[serde(deserialize_with = "lenient_flag")]
    pub has_old_meter_reading: Option<i32>,
    pub old_meter_reading_img_url: Option<String>,
    pub old_meter_reading_ocr: Option<String>,
    pub old_meter_reading_old: Option<String>,
    pub old_meter_peak: Option<String>,
    pub old_meter_off_peak: Option<String>,
    pub old_meter_kvar: Option<String>,

    #[serde(deserialize_with = "lenient_flag")]
    pub has_new_meter_no: Option<i32>,
    pub new_meter_no_img_url: Option<String>,
    pub new_meter_no_ocr: Option<String>,
    pub new_meter_no_old: Option<String>,
    #[serde(deserialize_with = "lenient_flag")]
    pub is_new_meter_duplicate: Option<i32>,
    pub new_meter_type: Option<String>,
    pub new_meter_billing_type: Option<String>,
    pub new_meter_connection_type: Option<String>,

    #[serde(deserialize_with = "lenient_flag")]
    pub is_pvc_wire_install: Option<i32>,
    pub pvc_wire_spec: Option<String>,
    pub pvc_wire_length: Option<String>,

    #[serde(deserialize_with = "lenient_flag")]
    pub has_battery_cover_seal: Option<i32>,
    pub battery_cover_seal_img_url: Option<String>,
    pub battery_cover_seal_ocr: Option<String>,
    pub battery_cover_seal_old: Option<String>,
    #[serde(deserialize_with = "lenient_flag")]
    pub has_terminal_cover_seal1: Option<i32>,
    pub terminal_cover_seal_img_url1: Option<String>,
    pub terminal_cover_seal_ocr1: Option<String>,
    pub terminal_cover_seal_old1: Option<String>,
    #[serde(deserialize_with = "lenient_flag")]
    pub has_terminal_cover_seal2: Option<i32>,
    pub terminal_cover_seal_img_url2: Option<String>,
    pub terminal_cover_seal_ocr2: Option<String>,
    pub terminal_cover_seal_old2: Option<String>,

    #[serde(deserialize_with = "lenient_flag")]
    pub has_steel_box: Option<i32>,
    #[serde(deserialize_with = "lenient_flag")]
    pub is_steel_box_remove: Option<i32>,
    pub steel_box_remove_url: Option<String>,

    pub meter_installed_by: Option<String>,

    #[serde(deserialize_with = "lenient_flag")]
    pub has_revisit: Option<i32>,
    #[serde(deserialize_with = "lenient_date")]
    pub revisit_dt: Option<String>,
    pub rectify_status: Option<String>,
    pub rectify_message: Option<String>,

    #[serde(deserialize_with = "lenient_flag")]
    pub is_approved: Option<i32>,
    pub approved_by: Option<i32>,
    #[serde(deserialize_with = "lenient_date")]
    pub approved_date: Option<String>,

    #[serde(deserialize_with = "lenient_flag")]
    pub is_mdm_entry: Option<i32>,
}

/// Outcome of a successfully stored record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Created,
    Updated,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct SyncSuccess {
    #[schema(value_type = Object)]
    pub local_id: Option<Value>,
    /// Id of the stored row.
    #[schema(example = 1042)]
    pub server_id: i32,
    #[schema(example = "C1")]
    pub customer_id: Option<String>,
    #[schema(value_type = Object)]
    pub meter_index: Option<Value>,
    pub status: SyncStatus,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct SyncFailure {
    #[schema(value_type = Object)]
    pub local_id: Option<Value>,
    pub customer_id: Option<String>,
    #[schema(value_type = Object)]
    pub meter_index: Option<Value>,
    #[schema(example = "customer_id is required")]
    pub error: String,
}

/// Per-record manifest of a bulk sync.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct BulkSyncResponse {
    #[schema(example = "bulk-1735689600000")]
    pub bulk_group_id: String,
    pub building_name: Option<String>,
    #[schema(example = 3)]
    pub total_count: usize,
    #[schema(example = 2)]
    pub success_count: usize,
    #[schema(example = 1)]
    pub failed_count: usize,
    pub success: Vec<SyncSuccess>,
    pub failed: Vec<SyncFailure>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct BulkStatsResponse {
    /// Active field records.
    #[schema(example = 5120)]
    pub total_records: u64,
    /// Active field records created today (server local time).
    #[schema(example = 37)]
    pub today_records: u64,
}

/// Query parameters for listing field records.
#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct CmoListQuery {
    /// Page number (1-indexed).
    #[param(example = 1)]
    pub page: Option<u64>,
    /// Items per page (1-100, default 20).
    #[param(example = 20)]
    pub per_page: Option<u64>,
    /// Case-insensitive substring of `customer_id` or `old_consumer_id`.
    pub search: Option<String>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct CmoListResponse {
    #[schema(value_type = Vec<Object>)]
    pub data: Vec<meter_info::Model>,
    pub pagination: Pagination,
}
