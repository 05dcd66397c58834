/// 位组：一个 u64 记录 64 个槽位
type BitGroup = u64;

const GROUP_BITS: usize = BitGroup::BITS as usize;

/// 位图，记录其指示区域的槽位分配情况
#[derive(Debug, Clone)]
pub struct Bitmap {
    groups: Vec<BitGroup>,
    /// 位图所指示区域的总槽位数
    capacity: usize,
}

impl Bitmap {
    pub fn new(capacity: usize) -> Self {
        Self {
            groups: vec![0; capacity.div_ceil(GROUP_BITS)],
            capacity,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// 首次适配：从 0 号开始找第一个空槽并占用，返回其编号。
    /// 若位图的空间用尽，则返回空。
    pub fn alloc(&mut self) -> Option<usize> {
        let (group_index, ingroup_index) =
            self.groups
                .iter()
                .enumerate()
                .find_map(|(group_index, &bits)| {
                    (bits != BitGroup::MAX)
                        .then_some((group_index, bits.trailing_ones() as usize))
                })?;

        let index = Self::encode(group_index, ingroup_index);
        // 最后一组的尾部不属于指示区域
        if index >= self.capacity {
            return None;
        }

        self.groups[group_index] |= 1 << ingroup_index;
        Some(index)
    }

    pub fn dealloc(&mut self, index: usize) {
        let (group_index, ingroup_index) = Self::decode(index);

        // 编号一定得有对应的位
        assert_ne!(
            self.groups[group_index] & (1 << ingroup_index),
            0,
            "slot {index} freed twice"
        );

        self.groups[group_index] &= !(1 << ingroup_index);
    }

    pub fn is_set(&self, index: usize) -> bool {
        if index >= self.capacity {
            return false;
        }
        let (group_index, ingroup_index) = Self::decode(index);
        self.groups[group_index] & (1 << ingroup_index) != 0
    }

    /// 尚未占用的槽位数
    pub fn free(&self) -> usize {
        let used: usize = self.groups.iter().map(|g| g.count_ones() as usize).sum();
        self.capacity - used
    }

    #[inline]
    fn encode(group_index: usize, ingroup_index: usize) -> usize {
        group_index * GROUP_BITS + ingroup_index
    }

    #[inline]
    fn decode(index: usize) -> (usize, usize) {
        (index / GROUP_BITS, index % GROUP_BITS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_fit() {
        let mut bitmap = Bitmap::new(130);
        for expect in 0..70 {
            assert_eq!(bitmap.alloc(), Some(expect));
        }
        bitmap.dealloc(3);
        bitmap.dealloc(65);
        assert_eq!(bitmap.alloc(), Some(3));
        assert_eq!(bitmap.alloc(), Some(65));
        assert_eq!(bitmap.alloc(), Some(70));
    }

    #[test]
    fn exhaustion_respects_capacity() {
        let mut bitmap = Bitmap::new(3);
        assert_eq!(bitmap.alloc(), Some(0));
        assert_eq!(bitmap.alloc(), Some(1));
        assert_eq!(bitmap.alloc(), Some(2));
        assert_eq!(bitmap.alloc(), None);
        assert_eq!(bitmap.free(), 0);
        assert!(!bitmap.is_set(3));
    }

    #[test]
    #[should_panic]
    fn double_free() {
        let mut bitmap = Bitmap::new(8);
        let slot = bitmap.alloc().unwrap();
        bitmap.dealloc(slot);
        bitmap.dealloc(slot);
    }
}
