mod command;
mod hierarchy;
mod reply;

pub use command::{ActionKind, Command, Vector3};
pub use hierarchy::{Hierarchy, HierarchyNode};
pub use reply::{Entity, Reply, ReplyStatus};
