// Submodules for separation of concerns
mod command;
mod eval;
mod types;

pub use command::{admin_command, filter_document, find_command, find_reply, ok_reply, sort_document};
pub use eval::{compare_bson, compare_docs, eval_filter, select};
pub(crate) use eval::get_path;
pub use types::{CmpOp, Filter, Order, SortSpec};
