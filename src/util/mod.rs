pub mod api_request;
pub mod cache;
pub mod lamp_api;
pub mod secrets;
pub mod sun_api;
