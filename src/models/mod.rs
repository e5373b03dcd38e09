pub mod announcement;
pub mod course;
pub mod enrollment;
pub mod section;
pub mod user;

pub use announcement::{Announcement, AnnouncementQuery, NewAnnouncementRequest};
pub use course::{Course, CourseDeletion, CourseDetail, CourseQuery, DeleteCourseParams, NewCourseRequest, UpdateCourseRequest};
pub use enrollment::{
    EnrollRequest, Enrollment, EnrollmentAction, EnrollmentQuery, EnrollmentStatus, GradeRequest,
    Transition,
};
pub use section::{NewSectionRequest, Section, SectionDetail, SectionQuery, SectionSummary, UpdateSectionRequest};
pub use user::{NewUserRequest, Role, User, UserQuery};
