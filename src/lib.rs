//! Perigee - course enrollment platform backend
//!
//! This crate provides a REST backend for course enrollment through:
//! - JWT-authenticated user accounts with student/instructor/admin roles
//! - Course, lesson, and invite management
//! - Enrollment and per-lesson progress tracking
//! - A data layer that runs against PostgreSQL or, in mock mode, an
//!   in-memory store that recognizes the application's SQL statements

pub mod config;
pub mod db;
pub mod models;
pub mod server;
