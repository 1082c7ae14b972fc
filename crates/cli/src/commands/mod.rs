pub mod ask;
pub mod chat;
pub mod courses;
pub mod ingest;
pub mod init;
pub mod outline;
pub mod search;
pub mod status;
