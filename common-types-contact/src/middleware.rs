pub mod request_describer;
pub mod set_cors_headers;
