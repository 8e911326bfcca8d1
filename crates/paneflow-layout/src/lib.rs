pub mod drop_target;
pub mod reducer;
pub mod tree;
pub mod workspace;

pub use drop_target::{resolve_drop_target, DropTarget};
pub use reducer::reduce;
pub use workspace::AppState;
