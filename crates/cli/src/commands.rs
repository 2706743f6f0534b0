pub mod graph;
pub mod list;
pub mod plan;
pub mod rebuild;
pub mod report;
pub mod run;
pub mod schema;
pub mod watch;
