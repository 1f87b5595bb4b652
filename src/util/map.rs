use std::hash::Hash;

use hashbrown::HashMap;

/// 可依鍵值建立索引的紀錄
pub trait Keyable {
    type Key: Eq + Hash;

    fn key(&self) -> Self::Key;
}

/// 依 `Keyable::key` 建立索引，鍵值重複時保留後出現的那一筆
pub fn index_by_key<T: Keyable>(entities: &[T]) -> HashMap<T::Key, &T> {
    let mut map = HashMap::with_capacity(entities.len());
    for e in entities {
        map.insert(e.key(), e);
    }
    map
}
