pub mod transaction_api;
