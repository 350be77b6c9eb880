pub mod student;
pub mod class;
pub mod enrollment;
pub mod plan;
pub mod booking;
pub mod payment;

pub use student::*;
pub use class::*;
pub use enrollment::*;
pub use plan::*;
pub use booking::*;
pub use payment::*;
