//! curavyom-web — Web front-end for CuraVyom.
//! Serves:
//!   - Marketing and information pages
//!   - Live dashboard with canned chart data
//!   - Interactive demo relaying each browser chat view to its own
//!     Agent Core chat session

pub mod router;
pub mod handlers;
pub mod state;
pub mod templates;
