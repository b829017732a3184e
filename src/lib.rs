//! A small status board: record site statuses, list them, mail a report of
//! them to a set of recipients, or clear them.

pub mod assets;
pub mod board;
pub mod dispatch;
pub mod report;
pub mod routes;
pub mod store;
pub mod structures;
