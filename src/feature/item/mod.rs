pub mod item_api;
