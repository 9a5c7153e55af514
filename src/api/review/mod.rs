pub mod review_api;
