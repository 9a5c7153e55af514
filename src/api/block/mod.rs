pub mod block_api;
