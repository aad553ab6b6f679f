// ==========================================
// 电商仓储补货系统 - 领域类型定义
// ==========================================
// 职责: 分区 / 仓库模式 / 任务类型 等基础枚举
// 红线: 分区集合固定为四个,顺序即报表优先级
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ==========================================
// 分区 (Zone)
// ==========================================
// 声明顺序 = 字母序 (East < North < South < West),用于确定性平局裁决
// 报表展示顺序见 ZONE_PRIORITY
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Zone {
    East,
    North,
    South,
    West,
}

/// 报表分区优先级: South → West → East → North
pub const ZONE_PRIORITY: [Zone; 4] = [Zone::South, Zone::West, Zone::East, Zone::North];

impl Zone {
    /// 分区名称（首字母大写）
    pub fn as_str(&self) -> &'static str {
        match self {
            Zone::East => "East",
            Zone::North => "North",
            Zone::South => "South",
            Zone::West => "West",
        }
    }

    /// 在 ZONE_PRIORITY 中的位置
    pub fn priority(&self) -> usize {
        match self {
            Zone::South => 0,
            Zone::West => 1,
            Zone::East => 2,
            Zone::North => 3,
        }
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Zone {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "east" => Ok(Zone::East),
            "north" => Ok(Zone::North),
            "south" => Ok(Zone::South),
            "west" => Ok(Zone::West),
            other => Err(format!("未知分区: {}", other)),
        }
    }
}

// ==========================================
// 仓库模式 (Warehouse Mode)
// ==========================================
// 决定 PPCN 覆写模板: single → 单仓模板, multi → 多仓模板
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WarehouseMode {
    Single,
    Multi,
}

impl WarehouseMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            WarehouseMode::Single => "single",
            WarehouseMode::Multi => "multi",
        }
    }
}

impl fmt::Display for WarehouseMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for WarehouseMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "single" => Ok(WarehouseMode::Single),
            "multi" => Ok(WarehouseMode::Multi),
            other => Err(format!("未知仓库模式: {}", other)),
        }
    }
}

// ==========================================
// 任务类型 (Task Type)
// ==========================================
// planning: 规划任务（不占用库存）
// execution: 执行任务（已预约提货，计入在途预约）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
    Planning,
    Execution,
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskType::Planning => write!(f, "planning"),
            TaskType::Execution => write!(f, "execution"),
        }
    }
}

impl FromStr for TaskType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "planning" => Ok(TaskType::Planning),
            "execution" => Ok(TaskType::Execution),
            other => Err(format!("未知任务类型: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zone_priority_order() {
        let names: Vec<&str> = ZONE_PRIORITY.iter().map(|z| z.as_str()).collect();
        assert_eq!(names, vec!["South", "West", "East", "North"]);
        for (idx, zone) in ZONE_PRIORITY.iter().enumerate() {
            assert_eq!(zone.priority(), idx);
        }
    }

    #[test]
    fn test_zone_from_str_case_insensitive() {
        assert_eq!("south".parse::<Zone>().unwrap(), Zone::South);
        assert_eq!(" NORTH ".parse::<Zone>().unwrap(), Zone::North);
        assert!("central".parse::<Zone>().is_err());
    }

    #[test]
    fn test_task_type_serde() {
        let json = serde_json::to_string(&TaskType::Execution).unwrap();
        assert_eq!(json, "\"execution\"");
        let parsed: TaskType = serde_json::from_str("\"planning\"").unwrap();
        assert_eq!(parsed, TaskType::Planning);
    }
}
