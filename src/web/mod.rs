pub mod classify;
pub mod history;
pub mod responses;
pub mod router;
pub mod state;

pub use responses::{ApiMessage, json_error};
pub use state::AppState;
