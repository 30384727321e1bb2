use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A meter installation job recorded in the field.
///
/// `has_*`/`is_*` flags are stored as 0/1 integers. Date columns hold strings
/// in the `YYYY-MM-DD HH:mm:ss.mmm` local-time layout.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "meter_info")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(indexed)]
    pub customer_id: Option<String>,
    #[sea_orm(indexed)]
    pub old_consumer_id: Option<String>,
    pub install_date: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,

    // Old meter
    pub has_old_meter_no: i32,
    pub old_meter_no_img_url: Option<String>,
    pub old_meter_no_ocr: Option<String>,
    pub old_meter_no_old: Option<String>,
    pub has_old_meter_reading: i32,
    pub old_meter_reading_img_url: Option<String>,
    pub old_meter_reading_ocr: Option<String>,
    pub old_meter_reading_old: Option<String>,
    pub old_meter_peak: Option<String>,
    pub old_meter_off_peak: Option<String>,
    pub old_meter_kvar: Option<String>,

    // New meter
    pub has_new_meter_no: i32,
    pub new_meter_no_img_url: Option<String>,
    pub new_meter_no_ocr: Option<String>,
    pub new_meter_no_old: Option<String>,
    pub is_new_meter_duplicate: i32,
    pub new_meter_type: Option<String>,
    pub new_meter_billing_type: Option<String>,
    pub new_meter_connection_type: Option<String>,

    // PVC wire
    pub is_pvc_wire_install: i32,
    pub pvc_wire_spec: Option<String>,
    pub pvc_wire_length: Option<String>,

    // Seals
    pub has_battery_cover_seal: i32,
    pub battery_cover_seal_img_url: Option<String>,
    pub battery_cover_seal_ocr: Option<String>,
    pub battery_cover_seal_old: Option<String>,
    pub has_terminal_cover_seal1: i32,
    pub terminal_cover_seal_img_url1: Option<String>,
    pub terminal_cover_seal_ocr1: Option<String>,
    pub terminal_cover_seal_old1: Option<String>,
    pub has_terminal_cover_seal2: i32,
    pub terminal_cover_seal_img_url2: Option<String>,
    pub terminal_cover_seal_ocr2: Option<String>,
    pub terminal_cover_seal_old2: Option<String>,

    // Steel box
    pub has_steel_box: i32,
    pub is_steel_box_remove: i32,
    pub steel_box_remove_url: Option<String>,

    pub meter_installed_by: Option<String>,

    // Revisit / rectification
    pub has_revisit: i32,
    pub revisit_dt: Option<String>,
    pub rectify_status: Option<String>,
    pub rectify_message: Option<String>,

    // Approval
    pub is_approved: i32,
    pub approved_by: Option<i32>,
    pub approved_date: Option<String>,

    pub is_mdm_entry: i32,
    pub is_apps_entry: i32,
    pub is_active: i32,

    pub create_by: Option<i32>,
    pub create_date: Option<String>,
    pub update_by: Option<i32>,
    pub update_date: Option<String>,
}

impl ActiveModelBehavior for ActiveModel {}
