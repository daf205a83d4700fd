pub mod classify;
pub mod config;
pub mod dispatch;
pub mod embed;
pub mod error;
pub mod format;
pub mod ledger;
pub mod markup;
pub mod openapi;
pub mod probe;
pub mod render;
pub mod routes;
pub mod security;
#[cfg(feature = "inmem-ledger")]
pub mod inmem; // in-process ledger used by the binary and tests

// Re-export commonly used items for tests / external users
pub use classify::is_url;
pub use config::FeedConfig;
pub use dispatch::{ClickEvent, Dispatcher, DispatchOutcome, PostViewState};
pub use embed::synthesize_embed;
pub use markup::Markup;
pub use render::Renderer;
pub use routes::{config, AppState};
pub use security::SecurityHeaders;
