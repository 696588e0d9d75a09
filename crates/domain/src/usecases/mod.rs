//! Application use cases / business logic

pub mod post_cycle;
pub mod render;
pub mod schedule;
pub mod select;

pub use post_cycle::{CycleError, PostCycle, PostCycleConfig, PostingContext, PostingTask};
pub use render::{build_status_post, render_status_text};
pub use schedule::{ScheduledTask, Scheduler, SchedulerConfig, SchedulerError, TaskFailure};
pub use select::{DEFAULT_MAX_ATTEMPTS, Selection, SelectionError, select_content};
