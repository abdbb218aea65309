//! Browser front-end served by the backend.
//!
//! - [`page`]: the chat widget page

pub mod page;

pub use page::widget_page;
