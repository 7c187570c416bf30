//! Business logic services

pub mod ranking_service;
pub mod sink;
