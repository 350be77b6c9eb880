pub mod root;
pub mod students;
pub mod classes;
pub mod sessions;
pub mod enrollments;
pub mod plans;
pub mod payments;
