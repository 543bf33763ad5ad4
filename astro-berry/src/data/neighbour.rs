//! 沿单轴的邻域窗口.

/// 以 `center` 为中心, 半径为 `radius` 的一维窗口与 `[0, extent)` 的交集.
///
/// 窗口外的邻居不参与卷积 (截断边界), 因此只需要迭代交集部分,
/// 同时给出每个坐标对应的核下标 (tap).
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct AxisWindow {
    /// 交集中最小的坐标.
    pub lo: usize,
    /// 交集中最大的坐标 (包含).
    pub hi: usize,
    /// `lo` 对应的核下标.
    pub first_tap: usize,
}

impl AxisWindow {
    /// 构造窗口. 要求 `center < extent`.
    #[inline]
    pub fn new(center: usize, radius: usize, extent: usize) -> Self {
        debug_assert!(center < extent);
        let lo = center.saturating_sub(radius);
        let hi = (center + radius).min(extent - 1);
        Self {
            lo,
            hi,
            first_tap: lo + radius - center,
        }
    }

    /// 窗口中的坐标个数.
    #[inline]
    pub fn len(&self) -> usize {
        self.hi - self.lo + 1
    }

    /// 由构造保证, 窗口至少包含中心本身.
    #[inline]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// 依次产生 `(坐标, 核下标)`.
    #[inline]
    pub fn taps(&self) -> impl Iterator<Item = (usize, usize)> {
        let Self { lo, hi, first_tap } = *self;
        (lo..=hi).map(move |c| (c, c - lo + first_tap))
    }
}

/// 诺伊曼 (零梯度) 边界下, 坐标 `c` 在 `[0, extent)` 中的前后两个邻居.
///
/// 越界的邻居被替换为 `c` 本身, 因此对应方向的差分为 0.
#[inline]
pub fn neumann_pair(c: usize, extent: usize) -> (usize, usize) {
    let prev = if c == 0 { c } else { c - 1 };
    let next = if c + 1 >= extent { c } else { c + 1 };
    (prev, next)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_window_interior() {
        let w = AxisWindow::new(5, 2, 10);
        assert_eq!((w.lo, w.hi, w.first_tap), (3, 7, 0));
        assert_eq!(w.len(), 5);
        let taps: Vec<_> = w.taps().collect();
        assert_eq!(taps, vec![(3, 0), (4, 1), (5, 2), (6, 3), (7, 4)]);
    }

    #[test]
    fn test_axis_window_truncated() {
        let w = AxisWindow::new(0, 2, 10);
        assert_eq!(w.taps().collect::<Vec<_>>(), vec![(0, 2), (1, 3), (2, 4)]);

        let w = AxisWindow::new(9, 2, 10);
        assert_eq!(w.taps().collect::<Vec<_>>(), vec![(7, 0), (8, 1), (9, 2)]);

        // 轴长为 1 时只剩中心.
        let w = AxisWindow::new(0, 3, 1);
        assert_eq!(w.taps().collect::<Vec<_>>(), vec![(0, 3)]);
    }

    #[test]
    fn test_neumann_pair() {
        assert_eq!(neumann_pair(0, 5), (0, 1));
        assert_eq!(neumann_pair(2, 5), (1, 3));
        assert_eq!(neumann_pair(4, 5), (3, 4));
        assert_eq!(neumann_pair(0, 1), (0, 0));
    }
}
