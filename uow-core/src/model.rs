//! 模型（Model）：聚合的存储形态
//!
//! 扁平记录，字段与持久化列一一对应；仅由存储层拥有，领域逻辑不直接修改。
//!
use crate::entity::IdentityKey;
use serde::{Serialize, de::DeserializeOwned};

pub trait Model: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// 存储表（集合）名
    const TABLE: &'static str;

    type Key: IdentityKey;

    /// 主键；尚未落库的记录为 `None`
    fn key(&self) -> Option<&Self::Key>;

    fn set_key(&mut self, key: Self::Key);
}
