pub mod memory;

pub use memory::MemoryDeviceProvider;
