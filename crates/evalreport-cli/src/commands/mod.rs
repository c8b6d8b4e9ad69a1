pub mod init;
pub mod preflight;
pub mod render;
pub mod show;
