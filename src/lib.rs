//! Library exports for the manga catalog service
//!
//! This module exposes internal components for testing and potential library usage.

pub mod admin;
pub mod catalog;
pub mod config;
pub mod database;
pub mod downloads;
pub mod engagement;
pub mod error;
pub mod handler;
pub mod middleware;
pub mod model;
pub mod reader;
pub mod route;
pub mod session;
pub mod settings;
