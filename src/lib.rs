//! Discovery and ranking engine for a video-sharing platform: related
//! videos, feeds, friend suggestions, keyword search and comment hotspots.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
