//! RigConfig - Config Loader 输出
//!
//! 描述一辆车的相机装配：重置矩阵、相机位置、扇区 (sector) 参数。

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use validator::Validate;

/// 4×4 齐次矩阵 (行优先)
pub type Matrix4Rows = [[f64; 4]; 4];

/// 单辆车的相机装配配置
///
/// 字段名与现有 `{car_name}.json` 装配文件保持一致。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RigConfig {
    /// rig 坐标系到引擎坐标系的对齐矩阵
    pub reset_matrix: Matrix4Rows,

    /// 相机名 -> 相对主相机的平移 (rig 坐标系)
    #[serde(deserialize_with = "unique_keys::deserialize")]
    pub cameras_locations: BTreeMap<String, [f64; 3]>,

    /// 扇区名 -> 扇区参数；重复的扇区名是解析错误
    #[serde(deserialize_with = "unique_keys::deserialize")]
    pub views: BTreeMap<String, SectorSetup>,
}

/// 扇区参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct SectorSetup {
    /// 相对主扇区的旋转 (pitch, yaw, roll)，单位：度
    #[serde(rename = "R_to_main")]
    pub rotation_to_main: [f64; 3],

    /// 主点 (像素)
    pub origin: [f64; 2],

    /// 缩放前宽度 (像素)
    #[validate(range(min = 1, message = "width must be > 0"))]
    pub width: u32,

    /// 缩放前高度 (像素)
    #[validate(range(min = 1, message = "height must be > 0"))]
    pub height: u32,

    /// 焦距 (像素)
    #[validate(range(exclusive_min = 0.0, message = "focal must be > 0"))]
    pub focal: f64,

    /// 整数降采样因子
    #[validate(range(min = 1, message = "scale must be >= 1"))]
    pub scale: u32,

    /// 扇区包含的相机名
    #[validate(length(min = 1, message = "sector must list at least one camera"))]
    pub cams: Vec<String>,
}

/// 拒绝重复键的 map 反序列化
///
/// serde_json 对重复键默认保留最后一个值，装配文件中重复的扇区会被静默覆盖。
mod unique_keys {
    use std::collections::BTreeMap;
    use std::fmt;
    use std::marker::PhantomData;

    use serde::de::{Error, MapAccess, Visitor};
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D, V>(deserializer: D) -> Result<BTreeMap<String, V>, D::Error>
    where
        D: Deserializer<'de>,
        V: Deserialize<'de>,
    {
        deserializer.deserialize_map(UniqueKeys(PhantomData))
    }

    struct UniqueKeys<V>(PhantomData<V>);

    impl<'de, V: Deserialize<'de>> Visitor<'de> for UniqueKeys<V> {
        type Value = BTreeMap<String, V>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a map with unique keys")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
            let mut entries = BTreeMap::new();
            while let Some((key, value)) = map.next_entry::<String, V>()? {
                if entries.contains_key(&key) {
                    return Err(A::Error::custom(format!("duplicate key '{key}'")));
                }
                entries.insert(key, value);
            }
            Ok(entries)
        }
    }
}

impl RigConfig {
    /// 扇区名列表 (有序)
    pub fn sector_names(&self) -> Vec<&str> {
        self.views.keys().map(String::as_str).collect()
    }

    /// 查询扇区参数
    pub fn sector(&self, name: &str) -> Option<&SectorSetup> {
        self.views.get(name)
    }

    /// 查询相机平移
    pub fn camera_location(&self, camera_name: &str) -> Option<[f64; 3]> {
        self.cameras_locations.get(camera_name).copied()
    }
}

impl SectorSetup {
    /// 是否包含与扇区同名的中心相机
    pub fn has_center_camera(&self, sector_name: &str) -> bool {
        self.cams.iter().any(|cam| cam == sector_name)
    }
}
