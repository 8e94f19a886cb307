mod families;
mod helpers;
mod import;
mod log;
mod meal;
mod stats;

use bidou_core::service::TrackerService;
use bidou_core::store::MealStore;

/// The session every command runs against.
pub(crate) type Tracker<'c> = TrackerService<'c, Box<dyn MealStore>>;

pub(crate) use families::{cmd_classify, cmd_families};
pub(crate) use import::{cmd_export, cmd_import};
pub(crate) use log::cmd_log;
pub(crate) use meal::{cmd_delete, cmd_history};
pub(crate) use stats::{cmd_family, cmd_stats};
