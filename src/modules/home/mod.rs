//! Role landing pages. Each one admits its own role only.

pub mod controller;
pub mod model;
pub mod router;
