pub mod task;
pub mod team;
pub mod user;

pub use task::{CreateTaskInput, Task, TaskFields, TaskStatus, UpdateTaskInput};
pub use team::{AddMembersInput, CreateTeamInput, Team, TeamFields, UpdateTeamInput};
pub use user::{NewUser, User, UserProfile, UserSummary};
