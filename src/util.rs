pub mod checksum;
pub mod downloader;
