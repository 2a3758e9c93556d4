pub mod account_service;
pub mod media_service;
pub mod object_storage;
pub mod password_service;
pub mod session_service;
