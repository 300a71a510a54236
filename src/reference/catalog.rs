use std::collections::{HashMap, HashSet};

use futures::future::join_all;
use serde::Serialize;

use crate::api::{Device, PlatformApi, Sensor};
use crate::expression::SourceType;

use super::keys::{derive_device_keys, derive_sensor_keys, KeyOption};

/// 下拉框中的实体选项
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityOption {
    pub uuid: String,
    pub name: String,
}

/// 编辑器使用的参考数据：组织内的传感器与设备，以及按需加载的传感器遥测键
///
/// 请求失败只记录日志并视为空列表，不做重试：详情加载失败的传感器会被记住，之后不再请求。
#[derive(Debug, Clone, Default)]
pub struct ReferenceCatalog {
    sensors: Vec<Sensor>,
    devices: Vec<Device>,
    sensor_keys: HashMap<String, Vec<KeyOption>>,
    failed_sensors: HashSet<String>,
}

impl ReferenceCatalog {
    pub fn new(sensors: Vec<Sensor>, devices: Vec<Device>) -> Self {
        let sensor_keys = sensors
            .iter()
            .filter_map(|sensor| {
                sensor
                    .variables
                    .as_ref()
                    .map(|variables| (sensor.uuid.clone(), derive_sensor_keys(variables)))
            })
            .collect();
        Self {
            sensors,
            devices,
            sensor_keys,
            failed_sensors: HashSet::new(),
        }
    }

    /// 并发拉取传感器与设备列表
    #[tracing::instrument(skip(api))]
    pub async fn load<A>(api: &A, organization_id: &str) -> Self
    where
        A: PlatformApi + ?Sized,
    {
        let (sensors, devices) = tokio::join!(
            api.list_sensors(organization_id),
            api.list_devices(organization_id)
        );

        let sensors = sensors.unwrap_or_else(|err| {
            tracing::warn!(error = %err, "加载传感器列表失败");
            Vec::new()
        });
        let devices = devices.unwrap_or_else(|err| {
            tracing::warn!(error = %err, "加载设备列表失败");
            Vec::new()
        });

        tracing::debug!(
            sensors = sensors.len(),
            devices = devices.len(),
            "参考数据加载完成"
        );
        Self::new(sensors, devices)
    }

    pub fn sensors(&self) -> &[Sensor] {
        &self.sensors
    }

    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    pub fn device(&self, uuid: &str) -> Option<&Device> {
        self.devices.iter().find(|device| device.uuid == uuid)
    }

    pub fn sensor(&self, uuid: &str) -> Option<&Sensor> {
        self.sensors.iter().find(|sensor| sensor.uuid == uuid)
    }

    pub fn entities(&self, source_type: SourceType) -> Vec<EntityOption> {
        match source_type {
            SourceType::Sensor => self
                .sensors
                .iter()
                .map(|sensor| EntityOption {
                    uuid: sensor.uuid.clone(),
                    name: sensor.name.clone(),
                })
                .collect(),
            SourceType::Device => self
                .devices
                .iter()
                .map(|device| EntityOption {
                    uuid: device.uuid.clone(),
                    name: device.name.clone(),
                })
                .collect(),
        }
    }

    /// 当前已知的键；传感器键尚未加载时为空
    pub fn keys(&self, source_type: SourceType, uuid: &str) -> Vec<KeyOption> {
        match source_type {
            SourceType::Device => self.device(uuid).map(derive_device_keys).unwrap_or_default(),
            SourceType::Sensor => self.sensor_keys.get(uuid).cloned().unwrap_or_default(),
        }
    }

    pub fn key(&self, source_type: SourceType, uuid: &str, key: &str) -> Option<KeyOption> {
        self.keys(source_type, uuid)
            .into_iter()
            .find(|option| option.name == key)
    }

    pub fn has_sensor_keys(&self, uuid: &str) -> bool {
        self.sensor_keys.contains_key(uuid)
    }

    /// 该传感器的详情是否已加载失败过
    pub fn sensor_fetch_failed(&self, uuid: &str) -> bool {
        self.failed_sensors.contains(uuid)
    }

    /// 确保传感器的遥测键已缓存；只有选项写入后才返回
    pub async fn ensure_sensor_keys<A>(&mut self, api: &A, uuid: &str) -> Vec<KeyOption>
    where
        A: PlatformApi + ?Sized,
    {
        if let Some(keys) = self.sensor_keys.get(uuid) {
            return keys.clone();
        }
        if self.failed_sensors.contains(uuid) {
            return Vec::new();
        }
        match api.sensor_detail(uuid).await {
            Ok(sensor) => self.store_sensor_detail(uuid, sensor),
            Err(err) => {
                tracing::warn!(sensor = %uuid, error = %err, "加载传感器遥测变量失败");
                self.failed_sensors.insert(uuid.to_string());
                Vec::new()
            }
        }
    }

    /// 回填编辑时并发预取多个传感器的遥测键
    pub async fn prefetch_sensor_keys<A>(&mut self, api: &A, uuids: &[String])
    where
        A: PlatformApi + ?Sized,
    {
        let mut pending: Vec<&String> = uuids
            .iter()
            .filter(|uuid| {
                !self.sensor_keys.contains_key(uuid.as_str())
                    && !self.failed_sensors.contains(uuid.as_str())
            })
            .collect();
        pending.sort();
        pending.dedup();

        let results = join_all(pending.iter().map(|uuid| api.sensor_detail(uuid))).await;
        for (uuid, result) in pending.into_iter().zip(results) {
            match result {
                Ok(sensor) => {
                    self.store_sensor_detail(uuid, sensor);
                }
                Err(err) => {
                    tracing::warn!(sensor = %uuid, error = %err, "预取传感器遥测变量失败");
                    self.failed_sensors.insert(uuid.clone());
                }
            }
        }
    }

    fn store_sensor_detail(&mut self, uuid: &str, sensor: Sensor) -> Vec<KeyOption> {
        let keys = derive_sensor_keys(sensor.variables.as_deref().unwrap_or_default());
        self.sensor_keys.insert(uuid.to_string(), keys.clone());
        keys
    }
}
