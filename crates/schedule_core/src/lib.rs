pub mod engine;
pub mod error;
pub mod exception;
pub mod labels;
pub mod reconcile;
pub mod recurrence;
pub mod session;
pub mod time;
pub mod wire;

pub use crate::engine::{expand, EngineOptions, Expansion, OccurrenceDescriptor, ScheduleEngine};
pub use crate::error::{ScheduleError, ScheduleResult};
pub use crate::exception::{ExceptionList, OccurrenceState, ScheduleException};
pub use crate::reconcile::OccurrenceAction;
pub use crate::recurrence::{Frequency, MonthOrdinal, RecurrenceConfig, TimeRange};
pub use crate::session::{ScheduleSession, ScheduleSessionBuilder};
pub use crate::wire::RecurrenceDocument;
