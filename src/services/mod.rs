pub mod module_lock;
pub mod student_restore;

pub use module_lock::{LockOutcome, ModuleLockController, Quarter, SubjectModule};
pub use student_restore::{StoreStudentRestorer, StudentRestorer};
