pub mod case;
pub mod job;
pub mod report;
pub mod session;
