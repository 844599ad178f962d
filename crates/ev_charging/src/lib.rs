//! EV Charging Load Prediction
//!
//! Ingests charging stations from Open Charge Map, trains a model of daily
//! charging sessions, and serves predictions over HTTP with every served
//! prediction logged for monitoring.

pub mod app_context;
pub mod commands;
pub mod prediction_logger;
pub mod web;
