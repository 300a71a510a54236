/// 参考数据模块 - 传感器/设备列表与条件键推导
pub mod catalog;
pub mod keys;

pub use catalog::{EntityOption, ReferenceCatalog};
pub use keys::{derive_device_keys, derive_sensor_keys, KeyKind, KeyOption, ValueInput, RANGE_SUFFIX};
