//! Client-side core of the user directory console: the record store client,
//! the list controller and the mutation coordinator.

pub mod list;
pub mod mutation;
pub mod store;

pub use list::{filtered_view, paginate, FilterCriteria, ListController, PageView, PAGE_SIZE};
pub use mutation::{
    AlwaysConfirm, BulkDeleteReport, Clock, Confirm, ConfirmPrompt, DeleteOutcome,
    MutationCoordinator, MutationError, MutationState, Notice, NoticeLevel, Notifier, SystemClock,
};
pub use store::{HttpRecordStore, RecordStore, DEFAULT_STORE_URL};

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;
