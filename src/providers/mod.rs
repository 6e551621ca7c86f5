pub mod exchange_rate_api;
