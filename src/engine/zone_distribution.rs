// ==========================================
// 电商仓储补货系统 - 分区箱数分配
// ==========================================
// 职责: 把单个 SKU 的 N 箱按分区销量拆到各分区
// 红线: 结果之和恒等于 N（N <= 0 或无分区数据时为空）
// 红线: N >= 有销量分区数 时,每个有销量分区至少 1 箱
// 红线: 所有排序都是全序,同输入同输出
// ==========================================
// 算法:
// 1. 无正销量分区 → 全部给销量最高的分区（同值取分区名升序）
// 2. N < Z → 按 (销量降序, 分区名升序) 取前 N 个分区各 1 箱
// 3. N >= Z → 每区 1 箱保底,再按理想份额补足:
//    ideal = sales / total_sku_sales * N
//    extra = max(floor(ideal - 1), 0)
//    不足部分按 (小数部分降序, 销量降序, 分区名升序) 轮流补 1 箱
//    超出部分从 >1 箱的分区按 (小数部分升序, 销量升序, 分区名降序) 轮流扣 1 箱
// ==========================================

use crate::domain::types::Zone;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::trace;

#[derive(Debug, Clone, Copy)]
struct ZoneShare {
    zone: Zone,
    sales: f64,
    frac: f64,
    boxes: i64,
}

/// 分配箱数
///
/// # 参数
/// - n: 该 SKU 需要的总箱数
/// - zone_sales: 分区 → 销量（仅地区已识别的销售）
/// - total_sku_sales: 该 SKU 全局销量（份额分母,含地区未识别的销售）
///
/// # 返回
/// - 分区 → 箱数（仅含箱数 > 0 的分区）
pub fn distribute_boxes(
    n: i64,
    zone_sales: &BTreeMap<Zone, f64>,
    total_sku_sales: f64,
) -> BTreeMap<Zone, i64> {
    let mut allocation = BTreeMap::new();
    if n <= 0 || zone_sales.is_empty() {
        return allocation;
    }

    let mut positive: Vec<(Zone, f64)> = zone_sales
        .iter()
        .filter(|(_, sales)| **sales > 0.0)
        .map(|(zone, sales)| (*zone, *sales))
        .collect();

    // 1. 无正销量分区
    if positive.is_empty() {
        let top = zone_sales
            .iter()
            .map(|(zone, sales)| (*zone, *sales))
            .min_by(|a, b| by_sales_desc_then_name(*a, *b));
        if let Some((zone, _)) = top {
            allocation.insert(zone, n);
        }
        return allocation;
    }

    let zone_count = positive.len() as i64;

    // 2. N < Z: 销量最高的 N 个分区各 1 箱
    if n < zone_count {
        positive.sort_by(|a, b| by_sales_desc_then_name(*a, *b));
        for (zone, _) in positive.into_iter().take(n as usize) {
            allocation.insert(zone, 1);
        }
        return allocation;
    }

    // 3. N >= Z: 保底 + 份额
    let mut shares: Vec<ZoneShare> = positive
        .iter()
        .map(|(zone, sales)| {
            let share = if total_sku_sales > 0.0 {
                sales / total_sku_sales
            } else {
                0.0
            };
            let ideal = share * n as f64;
            let extra = if ideal - 1.0 > 0.0 {
                (ideal - 1.0).floor() as i64
            } else {
                0
            };
            ZoneShare {
                zone: *zone,
                sales: *sales,
                frac: ideal - ideal.floor(),
                boxes: 1 + extra,
            }
        })
        .collect();

    let used: i64 = shares.iter().map(|s| s.boxes).sum();
    let mut remaining = n - used;

    match remaining.cmp(&0) {
        Ordering::Greater => {
            // 补足: 小数部分大者优先,轮流补
            shares.sort_by(|a, b| {
                b.frac
                    .total_cmp(&a.frac)
                    .then_with(|| b.sales.total_cmp(&a.sales))
                    .then_with(|| a.zone.as_str().cmp(b.zone.as_str()))
            });
            let per_zone = remaining / shares.len() as i64;
            if per_zone > 0 {
                for share in shares.iter_mut() {
                    share.boxes += per_zone;
                }
                remaining -= per_zone * shares.len() as i64;
            }
            for share in shares.iter_mut().take(remaining as usize) {
                share.boxes += 1;
            }
        }
        Ordering::Less => {
            // 扣减: 只扣保底以上的部分
            shares.sort_by(|a, b| {
                a.frac
                    .total_cmp(&b.frac)
                    .then_with(|| a.sales.total_cmp(&b.sales))
                    .then_with(|| b.zone.as_str().cmp(a.zone.as_str()))
            });
            let mut excess = -remaining;
            while excess > 0 {
                let mut trimmed = false;
                for share in shares.iter_mut() {
                    if excess == 0 {
                        break;
                    }
                    if share.boxes > 1 {
                        share.boxes -= 1;
                        excess -= 1;
                        trimmed = true;
                    }
                }
                if !trimmed {
                    break;
                }
            }
        }
        Ordering::Equal => {}
    }

    for share in shares {
        trace!(zone = %share.zone, boxes = share.boxes, frac = share.frac, "分区分配");
        if share.boxes > 0 {
            allocation.insert(share.zone, share.boxes);
        }
    }
    allocation
}

fn by_sales_desc_then_name(a: (Zone, f64), b: (Zone, f64)) -> Ordering {
    b.1.total_cmp(&a.1)
        .then_with(|| a.0.as_str().cmp(b.0.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sales(pairs: &[(Zone, f64)]) -> BTreeMap<Zone, f64> {
        pairs.iter().copied().collect()
    }

    fn total(alloc: &BTreeMap<Zone, i64>) -> i64 {
        alloc.values().sum()
    }

    #[test]
    fn test_proportional_with_largest_remainder() {
        let zs = sales(&[(Zone::South, 60.0), (Zone::West, 40.0)]);
        let alloc = distribute_boxes(8, &zs, 100.0);
        assert_eq!(alloc.get(&Zone::South), Some(&5));
        assert_eq!(alloc.get(&Zone::West), Some(&3));
    }

    #[test]
    fn test_fewer_boxes_than_zones() {
        let zs = sales(&[(Zone::South, 50.0), (Zone::West, 30.0), (Zone::East, 20.0)]);
        let alloc = distribute_boxes(2, &zs, 100.0);
        assert_eq!(alloc.len(), 2);
        assert_eq!(alloc.get(&Zone::South), Some(&1));
        assert_eq!(alloc.get(&Zone::West), Some(&1));
        assert_eq!(alloc.get(&Zone::East), None);
    }

    #[test]
    fn test_ties_broken_by_zone_name() {
        let zs = sales(&[(Zone::West, 10.0), (Zone::East, 10.0), (Zone::North, 10.0)]);
        let alloc = distribute_boxes(1, &zs, 30.0);
        assert_eq!(alloc.get(&Zone::East), Some(&1));
        assert_eq!(total(&alloc), 1);
    }

    #[test]
    fn test_small_share_of_global_sales_with_many_boxes() {
        // 已识别分区仅占全局销量 1%,几乎全部箱数走补足
        let zs = sales(&[(Zone::South, 6.0), (Zone::West, 4.0)]);
        let alloc = distribute_boxes(10_000_001, &zs, 1000.0);
        assert_eq!(total(&alloc), 10_000_001);
        // 保底份额 60000 / 40000,余下 9900001 平分,多出 1 箱给小数部分大的 South
        assert_eq!(alloc.get(&Zone::South), Some(&5_010_001));
        assert_eq!(alloc.get(&Zone::West), Some(&4_990_000));

        let huge = i64::MAX / 16;
        assert_eq!(total(&distribute_boxes(huge, &zs, 1e20)), huge);
    }

    #[test]
    fn test_no_positive_sales_goes_to_top_zone() {
        let zs = sales(&[(Zone::South, 0.0), (Zone::North, -3.0)]);
        let alloc = distribute_boxes(4, &zs, 0.0);
        assert_eq!(alloc.get(&Zone::South), Some(&4));
        assert_eq!(alloc.len(), 1);
    }

    #[test]
    fn test_empty_inputs() {
        assert!(distribute_boxes(0, &sales(&[(Zone::South, 5.0)]), 5.0).is_empty());
        assert!(distribute_boxes(-2, &sales(&[(Zone::South, 5.0)]), 5.0).is_empty());
        assert!(distribute_boxes(3, &BTreeMap::new(), 5.0).is_empty());
    }

    #[test]
    fn test_unresolved_sales_shortfall_cycles() {
        // 分区销量只占全局 1%,理想份额远小于 N
        let zs = sales(&[(Zone::South, 1.0)]);
        let alloc = distribute_boxes(10, &zs, 100.0);
        assert_eq!(alloc.get(&Zone::South), Some(&10));
    }

    #[test]
    fn test_overshoot_is_trimmed_and_guarantee_holds() {
        // 一个大区 + 三个极小区: 保底单位会导致超分,需要扣回
        let zs = sales(&[
            (Zone::South, 97.0),
            (Zone::West, 1.0),
            (Zone::East, 1.0),
            (Zone::North, 1.0),
        ]);
        let alloc = distribute_boxes(5, &zs, 100.0);
        assert_eq!(total(&alloc), 5);
        for zone in [Zone::South, Zone::West, Zone::East, Zone::North] {
            assert!(alloc.get(&zone).copied().unwrap_or(0) >= 1);
        }
    }

    #[test]
    fn test_conservation_across_sizes() {
        let zs = sales(&[
            (Zone::South, 13.0),
            (Zone::West, 7.5),
            (Zone::East, 2.0),
            (Zone::North, 0.5),
        ]);
        for n in 1..60 {
            let alloc = distribute_boxes(n, &zs, 23.0);
            assert_eq!(total(&alloc), n, "n = {}", n);
        }
    }
}
