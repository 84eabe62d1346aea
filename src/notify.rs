//! Notification capability: user-facing progress and failure messages go
//! through an injected [`Notifier`] instead of any presentation layer.

use crate::core::{FabricOperation, GlobalId};
use tracing::{Level, event};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    RecordReused { name: String },
    RecordCreated { name: String, id: GlobalId },
    OperationApplied { operation: FabricOperation },
    OperationFailed { operation: String, message: String },
    SessionLeaked { version: String, message: String },
}

impl Notice {
    pub fn message(&self) -> String {
        match self {
            Self::RecordReused { name } => format!("Record already exists. Setting: {}", name),
            Self::RecordCreated { name, id } => format!("Record created: {} {}", name, id),
            Self::OperationApplied { operation } => format!("{} completed", operation),
            Self::OperationFailed { operation, message } => {
                format!("{} failed: {}", operation, message)
            }
            Self::SessionLeaked { version, message } => {
                format!("Edit session on '{}' may still be open: {}", version, message)
            }
        }
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notice: &Notice);
}

/// Default notifier: forwards notices as tracing events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notice: &Notice) {
        match notice {
            Notice::OperationFailed { .. } => {
                event!(Level::ERROR, notice = %notice.message(), "fabric notice")
            }
            Notice::SessionLeaked { .. } => {
                event!(Level::WARN, notice = %notice.message(), "fabric notice")
            }
            _ => event!(Level::INFO, notice = %notice.message(), "fabric notice"),
        }
    }
}
