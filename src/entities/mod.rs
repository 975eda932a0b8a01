//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod assignment_history;
pub mod book;
pub mod incident;
pub mod required_title;
pub mod student;
pub mod system_state;
pub mod teacher;
pub mod title;

// Re-export specific types to avoid conflicts
pub use assignment_history::{
    Column as AssignmentHistoryColumn, Entity as AssignmentHistory,
    Model as AssignmentHistoryModel,
};
pub use book::{Column as BookColumn, Entity as Book, Model as BookModel};
pub use incident::{Column as IncidentColumn, Entity as Incident, Model as IncidentModel};
pub use required_title::{
    Column as RequiredTitleColumn, Entity as RequiredTitle, Model as RequiredTitleModel,
};
pub use student::{Column as StudentColumn, Entity as Student, Model as StudentModel};
pub use system_state::{
    Column as SystemStateColumn, Entity as SystemState, Model as SystemStateModel,
};
pub use teacher::{Column as TeacherColumn, Entity as Teacher, Model as TeacherModel};
pub use title::{Column as TitleColumn, Entity as Title, Model as TitleModel};
