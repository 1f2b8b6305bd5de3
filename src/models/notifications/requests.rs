use serde::Deserialize;
use ts_rs::TS;

use crate::models::common::pagination::{default_page, default_size, deserialize_string_to_i64};

// 通知列表查询参数
#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export, export_to = "api/notification.ts")]
pub struct NotificationListQuery {
    #[serde(
        default = "default_page",
        deserialize_with = "deserialize_string_to_i64"
    )]
    pub page: i64,
    #[serde(
        default = "default_size",
        deserialize_with = "deserialize_string_to_i64"
    )]
    pub size: i64,
    pub is_read: Option<bool>,
}
