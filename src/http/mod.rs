//! HTTP API for the journaling UI
//!
//! The UI only observes and drives the session manager through these routes:
//! - GET /prompts - Prompt categories with recording counts
//! - GET /session - Poll session state
//! - POST /session/start, POST /session/stop - Record button
//! - GET|DELETE /recordings/:category - List or clear a category
//! - GET|DELETE /recording/:id, GET /recording/:id/audio - One recording
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
