pub use self::engine_service::EngineService;
pub use self::request_service::RequestService;

mod engine_service;
mod request_service;
