pub mod chunked;
pub mod plain;
