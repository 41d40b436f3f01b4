pub mod app_context;
