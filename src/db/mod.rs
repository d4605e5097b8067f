pub mod covid;
pub mod loader;
pub mod value;
