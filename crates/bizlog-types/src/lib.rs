//! Directive and record types for bizlog.

mod directive;
mod id;
mod prefix;
mod record;

pub use directive::{Directive, DirectiveBuilder};
pub use id::{OperationId, RecordId};
pub use prefix::PrefixStyle;
pub use record::{Record, RecordError, RecordField};
