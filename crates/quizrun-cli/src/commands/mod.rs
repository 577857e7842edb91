pub mod init;
pub mod take;
