//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod attendance;
pub mod class;
pub mod enrollment;
pub mod order;
pub mod product;
pub mod session;

// Re-export specific types to avoid conflicts
pub use attendance::{
    AttendanceStatus, Column as AttendanceColumn, Entity as Attendance, Model as AttendanceModel,
};
pub use class::{ClassType, Column as ClassColumn, Entity as Class, Model as ClassModel};
pub use enrollment::{
    Column as EnrollmentColumn, EnrollmentStatus, Entity as Enrollment, Model as EnrollmentModel,
};
pub use order::{Column as OrderColumn, Entity as Order, Model as OrderModel, OrderStatus};
pub use product::{Column as ProductColumn, Entity as Product, Model as ProductModel};
pub use session::{Column as SessionColumn, Entity as Session, Model as SessionModel, SessionStatus};
