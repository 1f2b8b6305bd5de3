//! 分组成绩单导出
//!
//! 两个工作表：概览，以及学生 × 任务矩阵。单元格写入答案状态与分数。

use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use chrono::Utc;
use rust_xlsxwriter::{Format, Workbook, Worksheet};
use std::collections::HashMap;
use tracing::{error, info};

use super::{GroupService, can_manage_group};
use crate::models::answers::entities::{Answer, AnswerStatus};
use crate::models::auth::AuthContext;
use crate::models::enrollments::{entities::EnrollmentRole, responses::GroupMember};
use crate::models::grades::entities::Grade;
use crate::models::tasks::entities::Task;
use crate::models::{ApiResponse, ErrorCode};
use crate::services::{error_response, forbidden, not_found};

const XLSX_CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// 单个学生在某任务上的结果
#[derive(Debug, Clone, PartialEq)]
enum Cell {
    Missing,
    Submitted {
        status: AnswerStatus,
        grade: Option<(Option<i32>, i32)>,
    },
}

impl Cell {
    fn render(&self) -> String {
        match self {
            Cell::Missing => "-".to_string(),
            Cell::Submitted {
                status,
                grade: Some((Some(score), max_score)),
            } => format!("{} ({score}/{max_score})", status.display_name()),
            Cell::Submitted { status, .. } => status.display_name().to_string(),
        }
    }
}

#[derive(Debug)]
struct StudentRow {
    name: String,
    username: String,
    email: String,
    cells: Vec<Cell>,
    approved: usize,
    average: Option<f64>,
}

#[derive(Debug)]
struct Gradebook {
    group_name: String,
    course_name: String,
    task_titles: Vec<String>,
    rows: Vec<StudentRow>,
}

impl Gradebook {
    fn submitted_count(&self) -> usize {
        self.rows
            .iter()
            .flat_map(|row| &row.cells)
            .filter(|cell| **cell != Cell::Missing)
            .count()
    }

    fn approved_count(&self) -> usize {
        self.rows.iter().map(|row| row.approved).sum()
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// 按学生与任务把答案排成矩阵，平均分只统计有分数的评分
fn build_gradebook(
    group_name: &str,
    course_name: &str,
    students: &[GroupMember],
    tasks: &[Task],
    answers: Vec<(Answer, Option<Grade>)>,
) -> Gradebook {
    let mut by_key: HashMap<(i64, i64), (Answer, Option<Grade>)> = HashMap::new();
    for (answer, grade) in answers {
        by_key.insert((answer.user_id, answer.task_id), (answer, grade));
    }

    let rows = students
        .iter()
        .map(|member| {
            let mut percentages = Vec::new();
            let mut approved = 0;
            let cells = tasks
                .iter()
                .map(|task| match by_key.get(&(member.user.id, task.id)) {
                    None => Cell::Missing,
                    Some((answer, grade)) => {
                        if answer.status == AnswerStatus::Approved {
                            approved += 1;
                        }
                        if let Some(grade) = grade
                            && grade.score.is_some()
                        {
                            percentages.push(grade.percentage());
                        }
                        Cell::Submitted {
                            status: answer.status,
                            grade: grade.as_ref().map(|g| (g.score, g.max_score)),
                        }
                    }
                })
                .collect();

            let average = (!percentages.is_empty())
                .then(|| round2(percentages.iter().sum::<f64>() / percentages.len() as f64));
            let full_name = format!("{} {}", member.user.first_name, member.user.last_name);

            StudentRow {
                name: full_name.trim().to_string(),
                username: member.user.username.clone(),
                email: member.user.email.clone(),
                cells,
                approved,
                average,
            }
        })
        .collect();

    Gradebook {
        group_name: group_name.to_string(),
        course_name: course_name.to_string(),
        task_titles: tasks.iter().map(Task::display_title).collect(),
        rows,
    }
}

pub async fn export_gradebook(
    service: &GroupService,
    request: &HttpRequest,
    auth: AuthContext,
    group_id: i64,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request)?;

    let group = match storage.get_group_by_id(group_id).await {
        Ok(Some(group)) => group,
        Ok(None) => return Ok(not_found(ErrorCode::GroupNotFound, "Group not found")),
        Err(e) => return Ok(error_response(&e)),
    };
    match can_manage_group(&storage, &auth, &group).await {
        Ok(true) => {}
        Ok(false) => {
            return Ok(forbidden(
                ErrorCode::GroupPermissionDenied,
                "Only teachers of this group can export grades",
            ));
        }
        Err(e) => return Ok(error_response(&e)),
    }

    let course_name = match storage.get_course_by_id(group.course_id).await {
        Ok(course) => course.map(|c| c.name).unwrap_or_default(),
        Err(e) => return Ok(error_response(&e)),
    };
    let students: Vec<GroupMember> = match storage.list_group_members(group.id).await {
        Ok(members) => members
            .into_iter()
            .filter(|m| m.role == EnrollmentRole::Student)
            .collect(),
        Err(e) => return Ok(error_response(&e)),
    };
    let tasks = match storage.list_tasks_by_course(group.course_id).await {
        Ok(tasks) => tasks,
        Err(e) => return Ok(error_response(&e)),
    };
    let student_ids: Vec<i64> = students.iter().map(|m| m.user.id).collect();
    let answers = match storage
        .list_answers_for_gradebook(group.course_id, &student_ids)
        .await
    {
        Ok(answers) => answers,
        Err(e) => return Ok(error_response(&e)),
    };

    let gradebook = build_gradebook(&group.name, &course_name, &students, &tasks, answers);
    let buffer = match generate_xlsx(&gradebook) {
        Ok(buffer) => buffer,
        Err(e) => {
            error!("Failed to generate gradebook XLSX for group {}: {}", group.id, e);
            return Ok(
                HttpResponse::InternalServerError().json(ApiResponse::error_empty(
                    ErrorCode::ExportFailed,
                    "Failed to generate gradebook",
                )),
            );
        }
    };

    info!(
        event = "courses.group.export",
        actor_id = auth.user_id(),
        group_id = group.id,
        students = gradebook.rows.len(),
        tasks = gradebook.task_titles.len(),
        "Gradebook exported"
    );

    let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
    let filename = format!("group_{}_gradebook_{timestamp}.xlsx", group.id);
    Ok(HttpResponse::Ok()
        .content_type(XLSX_CONTENT_TYPE)
        .insert_header((
            "Content-Disposition",
            format!("attachment; filename=\"{filename}\""),
        ))
        .body(buffer))
}

fn generate_xlsx(gradebook: &Gradebook) -> Result<Vec<u8>, String> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();
    let title_format = Format::new().set_bold().set_font_size(14);

    let overview = workbook
        .add_worksheet()
        .set_name("Overview")
        .map_err(|e| e.to_string())?;
    write_overview_sheet(overview, &header_format, &title_format, gradebook)?;

    let grades = workbook
        .add_worksheet()
        .set_name("Gradebook")
        .map_err(|e| e.to_string())?;
    write_gradebook_sheet(grades, &header_format, gradebook)?;

    workbook.save_to_buffer().map_err(|e| e.to_string())
}

fn write_overview_sheet(
    sheet: &mut Worksheet,
    header_format: &Format,
    title_format: &Format,
    gradebook: &Gradebook,
) -> Result<(), String> {
    sheet
        .write_string_with_format(0, 0, "Group gradebook", title_format)
        .map_err(|e| e.to_string())?;
    sheet
        .write_string_with_format(2, 0, "Item", header_format)
        .map_err(|e| e.to_string())?;
    sheet
        .write_string_with_format(2, 1, "Value", header_format)
        .map_err(|e| e.to_string())?;

    let averages: Vec<f64> = gradebook.rows.iter().filter_map(|r| r.average).collect();
    let group_average = if averages.is_empty() {
        "-".to_string()
    } else {
        format!("{}%", round2(averages.iter().sum::<f64>() / averages.len() as f64))
    };

    let rows: [(&str, String); 7] = [
        ("Course", gradebook.course_name.clone()),
        ("Group", gradebook.group_name.clone()),
        ("Students", gradebook.rows.len().to_string()),
        ("Tasks", gradebook.task_titles.len().to_string()),
        ("Answers submitted", gradebook.submitted_count().to_string()),
        ("Answers approved", gradebook.approved_count().to_string()),
        ("Average grade", group_average),
    ];
    for (offset, (label, value)) in rows.iter().enumerate() {
        let row = 3 + offset as u32;
        sheet.write_string(row, 0, *label).map_err(|e| e.to_string())?;
        sheet.write_string(row, 1, value).map_err(|e| e.to_string())?;
    }

    sheet.set_column_width(0, 22).map_err(|e| e.to_string())?;
    sheet.set_column_width(1, 36).map_err(|e| e.to_string())?;
    Ok(())
}

fn write_gradebook_sheet(
    sheet: &mut Worksheet,
    header_format: &Format,
    gradebook: &Gradebook,
) -> Result<(), String> {
    let mut headers: Vec<&str> = vec!["Name", "Username", "Email"];
    headers.extend(gradebook.task_titles.iter().map(String::as_str));
    headers.extend(["Approved", "Average %"]);
    for (col, header) in headers.iter().enumerate() {
        sheet
            .write_string_with_format(0, col as u16, *header, header_format)
            .map_err(|e| e.to_string())?;
    }

    let task_count = gradebook.task_titles.len() as u16;
    for (index, student) in gradebook.rows.iter().enumerate() {
        let row = index as u32 + 1;
        sheet
            .write_string(row, 0, &student.name)
            .map_err(|e| e.to_string())?;
        sheet
            .write_string(row, 1, &student.username)
            .map_err(|e| e.to_string())?;
        sheet
            .write_string(row, 2, &student.email)
            .map_err(|e| e.to_string())?;
        for (offset, cell) in student.cells.iter().enumerate() {
            sheet
                .write_string(row, 3 + offset as u16, cell.render())
                .map_err(|e| e.to_string())?;
        }
        sheet
            .write_number(row, 3 + task_count, student.approved as f64)
            .map_err(|e| e.to_string())?;
        match student.average {
            Some(avg) => sheet.write_number(row, 4 + task_count, avg),
            None => sheet.write_string(row, 4 + task_count, "-"),
        }
        .map_err(|e| e.to_string())?;
    }

    sheet.set_column_width(0, 24).map_err(|e| e.to_string())?;
    sheet.set_column_width(1, 16).map_err(|e| e.to_string())?;
    sheet.set_column_width(2, 28).map_err(|e| e.to_string())?;
    for col in 0..task_count {
        sheet
            .set_column_width(3 + col, 22)
            .map_err(|e| e.to_string())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::users::{entities::UserRole, responses::UserSummary};

    fn member(id: i64, username: &str) -> GroupMember {
        GroupMember {
            enrollment_id: id,
            role: EnrollmentRole::Student,
            user: UserSummary {
                id,
                username: username.into(),
                email: format!("{username}@example.com"),
                first_name: username.into(),
                last_name: "Tester".into(),
                role: UserRole::Student,
            },
            enrolled_at: Utc::now(),
        }
    }

    fn task(id: i64, number: i32) -> Task {
        let now = Utc::now();
        Task {
            id,
            course_id: 1,
            number: Some(number),
            name: format!("Task name {number}"),
            description: None,
            created_by: 1,
            created_at: now,
            updated_at: now,
        }
    }

    fn answer(id: i64, user_id: i64, task_id: i64, status: AnswerStatus) -> Answer {
        let now = Utc::now();
        Answer {
            id,
            task_id,
            user_id,
            description: None,
            status,
            created_at: now,
            updated_at: now,
        }
    }

    fn grade(answer_id: i64, score: Option<i32>) -> Grade {
        let now = Utc::now();
        Grade {
            id: answer_id,
            answer_id,
            score,
            max_score: 100,
            feedback_text: None,
            graded_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_gradebook_matrix_and_averages() {
        let students = [member(10, "ann"), member(11, "bob")];
        let tasks = [task(1, 1), task(2, 2)];
        let answers = vec![
            (answer(1, 10, 1, AnswerStatus::Approved), Some(grade(1, Some(90)))),
            (answer(2, 10, 2, AnswerStatus::HaveFlaws), Some(grade(2, None))),
            (answer(3, 11, 2, AnswerStatus::Approved), Some(grade(3, Some(75)))),
        ];

        let book = build_gradebook("Evening", "Rust", &students, &tasks, answers);
        assert_eq!(book.task_titles, vec!["Task 1. Task name 1", "Task 2. Task name 2"]);
        assert_eq!(book.submitted_count(), 3);
        assert_eq!(book.approved_count(), 2);

        let ann = &book.rows[0];
        assert_eq!(ann.name, "ann Tester");
        assert_eq!(ann.cells[0].render(), "Approved (90/100)");
        assert_eq!(ann.cells[1].render(), "Have Flaws");
        assert_eq!(ann.average, Some(90.0));

        let bob = &book.rows[1];
        assert_eq!(bob.cells[0], Cell::Missing);
        assert_eq!(bob.cells[0].render(), "-");
        assert_eq!(bob.average, Some(75.0));
    }

    #[test]
    fn test_generate_xlsx_produces_zip() {
        let book = build_gradebook("Empty", "Rust", &[member(1, "ann")], &[task(1, 1)], vec![]);
        let buffer = generate_xlsx(&book).unwrap();
        assert!(buffer.starts_with(b"PK"));
    }
}
