//! 课程列表导出

use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use chrono::Utc;
use rust_xlsxwriter::{Format, Workbook};
use tracing::{error, info, warn};

use super::CourseService;
use crate::models::auth::AuthContext;
use crate::models::courses::{requests::CourseExportQuery, responses::CourseExportRow};
use crate::models::{ApiResponse, ErrorCode};
use crate::services::error_response;

const HEADERS: [&str; 9] = [
    "id",
    "name",
    "description",
    "is_active",
    "students_count",
    "teachers_count",
    "groups_count",
    "tasks_count",
    "created_at",
];

pub async fn export_courses(
    service: &CourseService,
    request: &HttpRequest,
    auth: AuthContext,
    query: CourseExportQuery,
) -> ActixResult<HttpResponse> {
    let file_type = query.file_type.unwrap_or_default();
    if file_type != "csv" && file_type != "xlsx" {
        warn!(
            actor_id = auth.user_id(),
            "Course export received invalid file type: {file_type}"
        );
        return Ok(HttpResponse::BadRequest().json(ApiResponse::error_empty(
            ErrorCode::BadRequest,
            "Invalid file format",
        )));
    }

    let storage = service.get_storage(request)?;
    let rows = match storage.list_courses_for_export().await {
        Ok(rows) => rows,
        Err(e) => return Ok(error_response(&e)),
    };

    info!(
        event = "courses.export",
        actor_id = auth.user_id(),
        courses = rows.len(),
        file_type = %file_type,
        "Courses exported"
    );

    let filename = format!("courses_{}.{file_type}", Utc::now().format("%Y%m%d_%H%M%S"));
    if file_type == "xlsx" {
        export_xlsx(&rows, &filename)
    } else {
        export_csv(&rows, &filename)
    }
}

fn record(row: &CourseExportRow) -> [String; 9] {
    [
        row.course.id.to_string(),
        row.course.name.clone(),
        row.course.description.clone().unwrap_or_default(),
        row.course.is_active.to_string(),
        row.students_count.to_string(),
        row.teachers_count.to_string(),
        row.groups_count.to_string(),
        row.tasks_count.to_string(),
        row.course.created_at.to_rfc3339(),
    ]
}

fn export_csv(rows: &[CourseExportRow], filename: &str) -> ActixResult<HttpResponse> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record(HEADERS).map_err(|e| {
        error!("CSV 写入失败: {}", e);
        actix_web::error::ErrorInternalServerError(format!("CSV 写入失败: {e}"))
    })?;
    for row in rows {
        wtr.write_record(record(row)).map_err(|e| {
            error!("CSV 写入失败: {}", e);
            actix_web::error::ErrorInternalServerError(format!("CSV 写入失败: {e}"))
        })?;
    }

    let data = wtr.into_inner().map_err(|e| {
        error!("CSV 生成失败: {}", e);
        actix_web::error::ErrorInternalServerError(format!("CSV 生成失败: {e}"))
    })?;

    Ok(HttpResponse::Ok()
        .content_type("text/csv; charset=utf-8")
        .insert_header((
            "Content-Disposition",
            format!("attachment; filename=\"{filename}\""),
        ))
        .body(data))
}

fn export_xlsx(rows: &[CourseExportRow], filename: &str) -> ActixResult<HttpResponse> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    let header_format = Format::new().set_bold();

    for (col, header) in HEADERS.iter().enumerate() {
        worksheet
            .write_string_with_format(0, col as u16, *header, &header_format)
            .map_err(|e| {
                error!("XLSX 写入失败: {}", e);
                actix_web::error::ErrorInternalServerError(format!("XLSX 写入失败: {e}"))
            })?;
    }

    for (index, row) in rows.iter().enumerate() {
        let line = index as u32 + 1;
        for (col, value) in record(row).iter().enumerate() {
            // 数量列按数字写入
            let written = match col {
                0 | 4..=7 => {
                    worksheet.write_number(line, col as u16, value.parse::<f64>().unwrap_or(0.0))
                }
                _ => worksheet.write_string(line, col as u16, value),
            };
            written.map_err(|e| {
                error!("XLSX 写入失败: {}", e);
                actix_web::error::ErrorInternalServerError(format!("XLSX 写入失败: {e}"))
            })?;
        }
    }
    worksheet.set_column_width(1, 32).ok();
    worksheet.set_column_width(2, 48).ok();

    let buffer = workbook.save_to_buffer().map_err(|e| {
        error!("XLSX 生成失败: {}", e);
        actix_web::error::ErrorInternalServerError(format!("XLSX 生成失败: {e}"))
    })?;

    Ok(HttpResponse::Ok()
        .content_type("application/vnd.openxmlformats-officedocument.spreadsheetml.sheet")
        .insert_header((
            "Content-Disposition",
            format!("attachment; filename=\"{filename}\""),
        ))
        .body(buffer))
}
