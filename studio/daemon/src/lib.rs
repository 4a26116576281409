//! Studio Daemon - HTTP Surface for novel-studio
//!
//! Exposes the generation pipeline of `studio_core` over HTTP:
//!
//! | Route                          | Response                      |
//! |--------------------------------|-------------------------------|
//! | `POST /api/generate-structure` | `{"structure": {...}}`        |
//! | `POST /api/generate-outline`   | `{"chapters": [...]}`         |
//! | `POST /api/generate-chapter`   | `text/event-stream`           |
//! | `GET /health`                  | `{"status": "ok"}`            |
//!
//! Failures answer `{"error": <summary>, "details": <message>}`.

pub mod error;
pub mod handlers;
pub mod server;

pub use error::ApiError;
pub use server::{create_router, run_server, AppState};
