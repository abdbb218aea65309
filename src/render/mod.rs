//! Rendering of chat turns onto a display surface.
//!
//! - [`RenderTarget`]: the surface abstraction (DOM, terminal, memory)
//! - [`MessageRenderer`]: text bubbles
//! - [`TableRenderer`]: wage table cards with a PDF export action

pub mod message;
pub mod table;
pub mod target;

pub use message::{MessageRenderer, sanitize};
pub use table::{EXPORT_FAILED_ALERT, ExportAction, TableCard, TableRenderer};
pub use target::{MemoryTarget, MessageNode, RenderTarget, RenderedNode};
