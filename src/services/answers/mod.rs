pub mod read;
pub mod review;
pub mod submit;

use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::sync::Arc;

use crate::errors::Result;
use crate::models::answers::{
    entities::AnswerRecord,
    requests::{AnswerListQuery, AnswerReviewRequest, CreateAnswerRequest},
    responses::AnswerRead,
};
use crate::models::auth::AuthContext;
use crate::models::users::responses::UserSummary;
use crate::storage::Storage;

pub struct AnswerService {
    storage: Option<Arc<dyn Storage>>,
}

impl AnswerService {
    pub fn new_lazy() -> Self {
        Self { storage: None }
    }

    pub(crate) fn get_storage(&self, request: &HttpRequest) -> ActixResult<Arc<dyn Storage>> {
        match &self.storage {
            Some(storage) => Ok(storage.clone()),
            None => super::storage_from_request(request),
        }
    }

    // 学生提交答案
    pub async fn create_answer(
        &self,
        request: &HttpRequest,
        auth: AuthContext,
        data: CreateAnswerRequest,
    ) -> ActixResult<HttpResponse> {
        submit::create_answer(self, request, auth, data).await
    }

    pub async fn list_answers(
        &self,
        request: &HttpRequest,
        auth: AuthContext,
        query: AnswerListQuery,
    ) -> ActixResult<HttpResponse> {
        read::list_answers(self, request, auth, query).await
    }

    pub async fn get_answer(
        &self,
        request: &HttpRequest,
        auth: AuthContext,
        answer_id: i64,
    ) -> ActixResult<HttpResponse> {
        read::get_answer(self, request, auth, answer_id).await
    }

    // 评阅；`created` 为 true 时返回 201
    pub async fn check_answer(
        &self,
        request: &HttpRequest,
        auth: AuthContext,
        answer_id: i64,
        data: AnswerReviewRequest,
        created: bool,
    ) -> ActixResult<HttpResponse> {
        review::check_answer(self, request, auth, answer_id, data, created).await
    }
}

/// 管理员，或与答案提交者同在该课程分组中的教师
pub(crate) async fn can_review(
    storage: &Arc<dyn Storage>,
    auth: &AuthContext,
    record: &AnswerRecord,
) -> Result<bool> {
    if auth.is_admin() {
        return Ok(true);
    }
    if !auth.is_teacher() {
        return Ok(false);
    }
    storage
        .teacher_can_access_student(auth.user_id(), record.student.id, record.task.course_id)
        .await
}

/// 组装读模型；`show_grader` 为 false 时不带评分人
pub(crate) async fn read_models(
    storage: &Arc<dyn Storage>,
    records: Vec<AnswerRecord>,
    show_grader: bool,
) -> Result<Vec<AnswerRead>> {
    let grader_ids: Vec<i64> = if show_grader {
        records
            .iter()
            .filter_map(|r| r.grade.as_ref().and_then(|g| g.graded_by))
            .collect()
    } else {
        Vec::new()
    };
    let graders = if grader_ids.is_empty() {
        Vec::new()
    } else {
        storage.get_users_by_ids(&grader_ids).await?
    };

    Ok(records
        .into_iter()
        .map(|record| {
            let grader = record
                .grade
                .as_ref()
                .and_then(|g| g.graded_by)
                .filter(|_| show_grader)
                .and_then(|id| graders.iter().find(|u| u.id == id))
                .map(UserSummary::from);
            AnswerRead::new(
                record.answer,
                record.task,
                UserSummary::from(&record.student),
                record.grade.as_ref(),
                grader,
            )
        })
        .collect())
}
