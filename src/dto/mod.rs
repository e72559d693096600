/// Match record payloads.
pub mod game;
/// Health payloads.
pub mod health;
/// Player payloads.
pub mod player;
/// SSE wire format.
pub mod sse;
