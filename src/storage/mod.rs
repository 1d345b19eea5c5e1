pub mod record;
pub mod file_lock;
pub mod experience_file;
pub mod maintenance;
