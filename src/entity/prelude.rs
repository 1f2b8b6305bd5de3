//! 预导入模块，方便使用

pub use super::answers::{ActiveModel as AnswerActiveModel, Entity as Answers, Model as AnswerModel};
pub use super::chat_messages::{
    ActiveModel as ChatMessageActiveModel, Entity as ChatMessages, Model as ChatMessageModel,
};
pub use super::chat_rooms::{
    ActiveModel as ChatRoomActiveModel, Entity as ChatRooms, Model as ChatRoomModel,
};
pub use super::course_enrollments::{
    ActiveModel as EnrollmentActiveModel, Entity as CourseEnrollments, Model as EnrollmentModel,
};
pub use super::course_groups::{
    ActiveModel as CourseGroupActiveModel, Entity as CourseGroups, Model as CourseGroupModel,
};
pub use super::courses::{ActiveModel as CourseActiveModel, Entity as Courses, Model as CourseModel};
pub use super::grades::{ActiveModel as GradeActiveModel, Entity as Grades, Model as GradeModel};
pub use super::notifications::{
    ActiveModel as NotificationActiveModel, Entity as Notifications, Model as NotificationModel,
};
pub use super::tasks::{ActiveModel as TaskActiveModel, Entity as Tasks, Model as TaskModel};
pub use super::users::{ActiveModel as UserActiveModel, Entity as Users, Model as UserModel};
