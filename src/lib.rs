//! Client-side session core for the ResQ-Her personal-safety assistants.
//!
//! Three surfaces (legal Q&A, SOS alert composition, supportive chat) share
//! one [`session::SessionController`], configured per surface in
//! [`surfaces`].
pub mod backend;
pub mod config;
pub mod error;
pub mod session;
pub mod surfaces;
pub mod types;
