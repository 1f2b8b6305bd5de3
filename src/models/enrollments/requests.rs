use serde::Deserialize;
use ts_rs::TS;

// 批量添加或移除分组成员
#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export, export_to = "api/enrollment.ts")]
pub struct GroupMembersRequest {
    pub user_ids: Vec<i64>,
}

impl GroupMembersRequest {
    /// 去重并保持原有顺序
    pub fn unique_ids(&self) -> Vec<i64> {
        let mut seen = std::collections::HashSet::new();
        self.user_ids
            .iter()
            .copied()
            .filter(|id| seen.insert(*id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_ids_keeps_order() {
        let req = GroupMembersRequest {
            user_ids: vec![3, 1, 3, 2, 1],
        };
        assert_eq!(req.unique_ids(), vec![3, 1, 2]);
    }
}
