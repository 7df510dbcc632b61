pub mod backend;
pub mod evidence;
pub mod lifecycle;
pub mod media;
pub mod poller;
pub mod report_sync;
pub mod submission;

#[cfg(test)]
pub(crate) mod testing;
