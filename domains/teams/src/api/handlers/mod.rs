//! HTTP request handlers for the teams domain

pub mod offers;
pub mod teams;
pub mod users;
