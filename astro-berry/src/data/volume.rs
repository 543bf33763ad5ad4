//! 带属性的体数据.

use std::collections::BTreeMap;

use super::grid::{with_grid, AnyGrid};
use super::stats;
use crate::consts::attr;
use crate::Dims;

/// 宿主程序中的体数据: 一个网格加上一组字符串属性.
///
/// 引擎只通过该 trait 访问体数据, 因此宿主可以用自己的节点类型实现它.
pub trait Volume {
    /// 体数据的网格.
    fn grid(&self) -> &AnyGrid;

    /// 体数据的可变网格.
    fn grid_mut(&mut self) -> &mut AnyGrid;

    /// 读取属性. 属性不存在时返回 `None`.
    fn attribute(&self, key: &str) -> Option<&str>;

    /// 写入属性.
    fn set_attribute(&mut self, key: &str, value: String);

    /// 以数值形式读取属性. 属性不存在或无法解析时返回 `0.0`.
    fn attribute_f64(&self, key: &str) -> f64 {
        self.attribute(key)
            .and_then(|s| s.trim().parse::<f64>().ok())
            .unwrap_or(0.0)
    }

    /// 网格尺寸 `(nx, ny, nz)`.
    #[inline]
    fn dimensions(&self) -> Dims {
        self.grid().dimensions()
    }

    /// 根据网格内容重新计算 `DATAMIN` / `DATAMAX`.
    ///
    /// 网格中没有有限值时, 保持原属性不变.
    fn update_range_attributes(&mut self) {
        let range = with_grid!(self.grid(), g => stats::range(g));
        if let Some((lo, hi)) = range {
            self.set_attribute(attr::DATA_MIN, lo.to_string());
            self.set_attribute(attr::DATA_MAX, hi.to_string());
        }
    }

    /// 根据网格内容重新计算 `RMS` / `RMSMEAN`.
    fn update_noise_attributes(&mut self) {
        let est = with_grid!(self.grid(), g => stats::noise(g));
        self.set_attribute(attr::RMS, est.rms.to_string());
        self.set_attribute(attr::RMS_MEAN, est.mean.to_string());
    }
}

/// [`Volume`] 的默认实现.
#[derive(Clone, Debug, PartialEq)]
pub struct AstroVolume {
    grid: AnyGrid,
    attributes: BTreeMap<String, String>,
}

impl AstroVolume {
    /// 以网格构造体数据, 属性为空.
    pub fn new(grid: impl Into<AnyGrid>) -> Self {
        Self {
            grid: grid.into(),
            attributes: BTreeMap::new(),
        }
    }

    /// 构造一份尺寸、精度相同的全零体数据, 不复制属性.
    pub fn zeros_like(&self) -> Self {
        Self::new(self.grid.zeros_like())
    }

    /// 链式写入属性.
    pub fn with_attribute(mut self, key: &str, value: impl ToString) -> Self {
        self.attributes.insert(key.to_string(), value.to_string());
        self
    }

    /// 所有属性.
    #[inline]
    pub fn attributes(&self) -> &BTreeMap<String, String> {
        &self.attributes
    }

    /// 取出网格.
    #[inline]
    pub fn into_grid(self) -> AnyGrid {
        self.grid
    }
}

impl Volume for AstroVolume {
    #[inline]
    fn grid(&self) -> &AnyGrid {
        &self.grid
    }

    #[inline]
    fn grid_mut(&mut self) -> &mut AnyGrid {
        &mut self.grid
    }

    #[inline]
    fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    #[inline]
    fn set_attribute(&mut self, key: &str, value: String) {
        self.attributes.insert(key.to_string(), value);
    }
}
