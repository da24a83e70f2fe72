//! HTTP control surface for a presentation layer
//!
//! - POST /interaction/begin - Start an interaction
//! - POST /interaction/end - Stop recording
//! - POST /interaction/replay - Speak the last answer again
//! - GET /interaction/status - Current snapshot
//! - GET /interaction/events - Server-sent event stream
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use handlers::ActionResponse;
pub use routes::create_router;
pub use state::AppState;
