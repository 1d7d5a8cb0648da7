//! Document model for layer views
//!
//! A mutable tree of nodes with a selection list, fine-grained change events
//! and a per-document session bag. Views read structure through [`TreeRead`]
//! and address nodes across rebuilds with [`NodePath`].

pub mod error;
pub mod events;
pub mod path;
pub mod session;

mod document;
mod edit;
mod node;

pub use document::{Document, ID_PROPERTY};
pub use error::{ModelError, SessionError};
pub use events::{DocumentEvent, Subscription};
pub use node::{NodeId, NodeSpec, PropertyValue};
pub use path::{NodePath, TreeRead, node_at, path_of};
pub use session::SessionData;
