//! 课程分组实体

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "course_groups")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub course_id: i64,
    pub name: String,
    pub students_limit: Option<i32>,
    pub days_of_week: Option<String>,
    pub self_registration: bool,
    #[sea_orm(unique)]
    pub registration_token: Option<String>,
    pub token_expires_at: Option<i64>,
    pub token_validity_hours: i32,
    pub token_validity_days: i32,
    pub is_active: bool,
    pub is_deleted: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::courses::Entity",
        from = "Column::CourseId",
        to = "super::courses::Column::Id"
    )]
    Course,
    #[sea_orm(has_many = "super::course_enrollments::Entity")]
    CourseEnrollments,
}

impl Related<super::courses::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Course.def()
    }
}

impl Related<super::course_enrollments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CourseEnrollments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn into_group(self) -> crate::models::groups::entities::CourseGroup {
        use chrono::{DateTime, Utc};

        crate::models::groups::entities::CourseGroup {
            id: self.id,
            course_id: self.course_id,
            name: self.name,
            students_limit: self.students_limit,
            days_of_week: self.days_of_week,
            self_registration: self.self_registration,
            registration_token: self.registration_token,
            token_expires_at: self
                .token_expires_at
                .map(|ts| DateTime::<Utc>::from_timestamp(ts, 0).unwrap_or_default()),
            token_validity_hours: self.token_validity_hours,
            token_validity_days: self.token_validity_days,
            is_active: self.is_active,
            is_deleted: self.is_deleted,
            created_at: DateTime::<Utc>::from_timestamp(self.created_at, 0).unwrap_or_default(),
            updated_at: DateTime::<Utc>::from_timestamp(self.updated_at, 0).unwrap_or_default(),
        }
    }
}
