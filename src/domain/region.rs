// ==========================================
// 电商仓储补货系统 - 地区 → 分区映射
// ==========================================
// 职责: 收货州/联邦属地名称 → (分区, 仓库代码)
// 红线: 无法解析时返回 None,不报错
// 红线: 新旧名称(别名)必须映射到同一分区
// ==========================================

use crate::domain::types::Zone;

const EAST_WH: &str = "ulub_bts";
const NORTH_WH: &str = "gur_san_wh_nl_01nl";
const SOUTH_WH: &str = "malur_bts";
const WEST_WH: &str = "bhi_vas_wh_nl_01nl";

/// 静态映射表 (地区名, 分区, 仓库代码)
pub const REGION_TABLE: &[(&str, Zone, &str)] = &[
    // ===== East =====
    ("Arunachal Pradesh", Zone::East, EAST_WH),
    ("Assam", Zone::East, EAST_WH),
    ("Nagaland", Zone::East, EAST_WH),
    ("Meghalaya", Zone::East, EAST_WH),
    ("Bihar", Zone::East, EAST_WH),
    ("West Bengal", Zone::East, EAST_WH),
    ("Odisha", Zone::East, EAST_WH),
    ("Chhattisgarh", Zone::East, EAST_WH),
    ("Tripura", Zone::East, EAST_WH),
    ("Mizoram", Zone::East, EAST_WH),
    ("Jharkhand", Zone::East, EAST_WH),
    ("Manipur", Zone::East, EAST_WH),
    ("Andaman & Nicobar Islands", Zone::East, EAST_WH),
    ("Andaman and Nicobar Islands", Zone::East, EAST_WH),
    ("Sikkim", Zone::East, EAST_WH),
    // ===== North =====
    ("Haryana", Zone::North, NORTH_WH),
    ("Delhi", Zone::North, NORTH_WH),
    ("Uttar Pradesh", Zone::North, NORTH_WH),
    ("Uttarakhand", Zone::North, NORTH_WH),
    ("Rajasthan", Zone::North, NORTH_WH),
    ("Punjab", Zone::North, NORTH_WH),
    ("Himachal Pradesh", Zone::North, NORTH_WH),
    ("Jammu & Kashmir", Zone::North, NORTH_WH),
    ("Jammu and Kashmir", Zone::North, NORTH_WH),
    ("Chandigarh", Zone::North, NORTH_WH),
    // ===== South =====
    ("Telangana", Zone::South, SOUTH_WH),
    ("Andhra Pradesh", Zone::South, SOUTH_WH),
    ("Karnataka", Zone::South, SOUTH_WH),
    ("Kerala", Zone::South, SOUTH_WH),
    ("Tamil Nadu", Zone::South, SOUTH_WH),
    ("Puducherry", Zone::South, SOUTH_WH),
    ("Pondicherry", Zone::South, SOUTH_WH),
    // ===== West =====
    ("Gujarat", Zone::West, WEST_WH),
    ("Maharashtra", Zone::West, WEST_WH),
    ("Madhya Pradesh", Zone::West, WEST_WH),
    ("Goa", Zone::West, WEST_WH),
    ("Dadra & Nagar Haveli & Daman & Diu", Zone::West, WEST_WH),
];

/// 解析地区名称
///
/// # 查找顺序
/// 1. 精确匹配
/// 2. 首字母大写形式 (Title Case)
/// 3. 去空白后的 Title Case
/// 4. 去空白后忽略大小写比较（兼容 "jammu and kashmir" 这类 Title Case 无法还原的写法）
///
/// # 返回
/// - Some((zone, warehouse_code))
/// - None: 无法解析（调用方计数并跳过分区汇总）
pub fn resolve_region(name: &str) -> Option<(Zone, &'static str)> {
    lookup_exact(name)
        .or_else(|| lookup_exact(&title_case(name)))
        .or_else(|| lookup_exact(&title_case(name.trim())))
        .or_else(|| lookup_case_insensitive(name.trim()))
}

fn lookup_exact(name: &str) -> Option<(Zone, &'static str)> {
    REGION_TABLE
        .iter()
        .find(|(region, _, _)| *region == name)
        .map(|(_, zone, wh)| (*zone, *wh))
}

fn lookup_case_insensitive(name: &str) -> Option<(Zone, &'static str)> {
    if name.is_empty() {
        return None;
    }
    REGION_TABLE
        .iter()
        .find(|(region, _, _)| region.eq_ignore_ascii_case(name))
        .map(|(_, zone, wh)| (*zone, *wh))
}

/// Title Case: 每个字母段首字母大写,其余小写
pub fn title_case(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut prev_is_letter = false;
    for ch in value.chars() {
        if ch.is_alphabetic() {
            if prev_is_letter {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            prev_is_letter = true;
        } else {
            out.push(ch);
            prev_is_letter = false;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match() {
        assert_eq!(resolve_region("Karnataka"), Some((Zone::South, SOUTH_WH)));
        assert_eq!(resolve_region("Delhi"), Some((Zone::North, NORTH_WH)));
    }

    #[test]
    fn test_title_case_match() {
        assert_eq!(resolve_region("WEST BENGAL"), Some((Zone::East, EAST_WH)));
        assert_eq!(resolve_region("  tamil nadu  "), Some((Zone::South, SOUTH_WH)));
    }

    #[test]
    fn test_alias_same_zone() {
        let old = resolve_region("Pondicherry").unwrap();
        let new = resolve_region("Puducherry").unwrap();
        assert_eq!(old, new);

        let a = resolve_region("Jammu & Kashmir").unwrap();
        let b = resolve_region("jammu and kashmir").unwrap();
        assert_eq!(a.0, b.0);
    }

    #[test]
    fn test_unresolved_returns_none() {
        assert_eq!(resolve_region("Atlantis"), None);
        assert_eq!(resolve_region(""), None);
        assert_eq!(resolve_region("   "), None);
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("andaman & nicobar islands"), "Andaman & Nicobar Islands");
        assert_eq!(title_case("MADHYA pradesh"), "Madhya Pradesh");
    }
}
