pub mod frame_store;
