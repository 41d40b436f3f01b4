pub mod authorized_client;
