pub mod chat_task;
pub mod protocol;
pub mod quiz_task;
pub mod rest;
pub mod state;
pub mod ws_handler;

// Re-export the main WebSocket handler to make it easily accessible
// to the binary that will build the web server router.
pub use rest::{create_profile_handler, get_profile_handler};
pub use ws_handler::ws_handler;
