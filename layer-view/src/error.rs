//! Error types for the layer view.

use layer_model::ModelError;

/// Pipeline stage that talks to the widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Feed,
    Expand,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Feed => write!(f, "feed"),
            Self::Expand => write!(f, "expand"),
        }
    }
}

/// Errors a widget reports from its asynchronous operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WidgetError {
    /// The widget refused the request.
    #[error("widget rejected {stage}: {message}")]
    Rejected { stage: Stage, message: String },
}

impl WidgetError {
    /// Creates a rejection for the given stage.
    pub fn rejected(stage: Stage, message: impl Into<String>) -> Self {
        Self::Rejected {
            stage,
            message: message.into(),
        }
    }
}

/// Errors that abort a reconciliation run or a view operation.
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    /// A widget stage failed; the run stopped before finalizing.
    #[error(transparent)]
    Widget(#[from] WidgetError),

    /// A header action's document edit failed.
    #[error("document edit failed: {0}")]
    Model(#[from] ModelError),

    /// The view has been disposed.
    #[error("layer view disposed")]
    Disposed,

    /// No tokio runtime was available to schedule work on.
    #[error("no tokio runtime available: {0}")]
    NoRuntime(#[from] tokio::runtime::TryCurrentError),
}
