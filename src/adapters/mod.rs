pub mod api;
pub mod mojdomek_http;
pub mod replay_file;
