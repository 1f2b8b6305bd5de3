pub mod course;
pub mod export;
pub mod task;

use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::sync::Arc;

use crate::models::auth::AuthContext;
use crate::models::courses::requests::{CourseExportQuery, CourseListQuery, CreateCourseRequest};
use crate::models::tasks::requests::CreateTaskRequest;
use crate::storage::Storage;

pub struct CourseService {
    storage: Option<Arc<dyn Storage>>,
}

impl CourseService {
    pub fn new_lazy() -> Self {
        Self { storage: None }
    }

    pub(crate) fn get_storage(&self, request: &HttpRequest) -> ActixResult<Arc<dyn Storage>> {
        match &self.storage {
            Some(storage) => Ok(storage.clone()),
            None => super::storage_from_request(request),
        }
    }

    // 创建课程，仅管理员
    pub async fn create_course(
        &self,
        request: &HttpRequest,
        auth: AuthContext,
        data: CreateCourseRequest,
    ) -> ActixResult<HttpResponse> {
        course::create_course(self, request, auth, data).await
    }

    pub async fn list_courses(
        &self,
        request: &HttpRequest,
        query: CourseListQuery,
    ) -> ActixResult<HttpResponse> {
        course::list_courses(self, request, query).await
    }

    pub async fn get_course(
        &self,
        request: &HttpRequest,
        course_id: i64,
    ) -> ActixResult<HttpResponse> {
        course::get_course(self, request, course_id).await
    }

    // 导出全部课程为 CSV 或 XLSX，仅管理员
    pub async fn export_courses(
        &self,
        request: &HttpRequest,
        auth: AuthContext,
        query: CourseExportQuery,
    ) -> ActixResult<HttpResponse> {
        export::export_courses(self, request, auth, query).await
    }

    // 管理员或该课程的教师可创建任务
    pub async fn create_task(
        &self,
        request: &HttpRequest,
        auth: AuthContext,
        course_id: i64,
        data: CreateTaskRequest,
    ) -> ActixResult<HttpResponse> {
        task::create_task(self, request, auth, course_id, data).await
    }

    pub async fn list_tasks(
        &self,
        request: &HttpRequest,
        course_id: i64,
    ) -> ActixResult<HttpResponse> {
        task::list_tasks(self, request, course_id).await
    }
}
