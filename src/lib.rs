//! Library crate for arena-ladder-back, exposing modules for binaries and integration tests.

pub mod config;
pub mod dao;
mod dto;
pub mod error;
pub mod ladder;
pub mod provider;
pub mod routes;
pub mod services;
pub mod state;
