pub mod cache;
pub mod decode;
pub mod replay;
pub mod resolve;
