pub mod access;
pub mod db;
pub mod errors;
pub mod models;
pub mod service;
pub mod validation;
