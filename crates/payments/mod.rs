pub mod payos_client;
