pub mod device_body;

pub use device_body::DeviceWrite;
