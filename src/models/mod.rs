pub mod task;
pub mod user;

pub use task::{Task, TaskCreate, TaskPriority, TaskQuery, TaskStatus, TaskStatusUpdate, TaskUpdate};
pub use user::{User, UserCredentials};
