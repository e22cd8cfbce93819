//! Request layer
//!
//! - `session`: session ids and the `SessionStore` holding frozen engines
//! - `commands`: request parsing, dispatch and the response shape
//! - `wasm`: the `ShopSession` object exported to JavaScript
//! - `helpers`: JavaScript value and error conversion

pub mod commands;
pub mod helpers;
pub mod session;
pub mod wasm;

pub use commands::{
    handle_command, handle_command_with_config, handle_upload, ChordChoiceView, ChordOptionView,
    CommandRequest, CommandResponse,
};
pub use session::{new_session_id, MemorySessionStore, SessionStore};
pub use wasm::ShopSession;
