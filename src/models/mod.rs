pub mod patch;
pub mod task;
pub mod user;

pub use task::{SortDirection, Task, TaskFilter, TaskInput, TaskQuery, TaskSort, TaskSortField, TaskUpdate};
pub use user::{NewUser, User, UserChanges, UserInput, UserUpdate};
