pub mod base64_bytes;
