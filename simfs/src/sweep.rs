//! # 后台回收
//!
//! 回收以显式的时钟滴答驱动，而不是真实的定时器：
//! 外部调用 [`FileSystem::tick`](crate::FileSystem::tick) 报告流逝的时间，
//! 每满一个周期执行一次完整的回收，期间不会与其它操作交错。

#[derive(Debug, Clone)]
pub struct Sweeper {
    interval_ms: u64,
    elapsed_ms: u64,
}

impl Sweeper {
    pub fn new(interval_ms: u64) -> Self {
        Self {
            interval_ms,
            elapsed_ms: 0,
        }
    }

    /// 累计流逝时间，返回本次是否至少满了一个周期
    pub fn advance(&mut self, elapsed_ms: u64) -> bool {
        if self.interval_ms == 0 {
            return true;
        }

        // 两个加数都小于周期，不会溢出
        let carried = self.elapsed_ms + elapsed_ms % self.interval_ms;
        self.elapsed_ms = carried % self.interval_ms;
        elapsed_ms >= self.interval_ms || carried >= self.interval_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_once_per_interval() {
        let mut sweeper = Sweeper::new(500);
        assert!(!sweeper.advance(200));
        assert!(!sweeper.advance(299));
        assert!(sweeper.advance(1));
        assert!(sweeper.advance(1250));
        assert!(sweeper.advance(250));
        assert!(!sweeper.advance(499));
    }

    #[test]
    fn huge_elapsed_keeps_the_remainder() {
        let mut sweeper = Sweeper::new(500);
        assert!(sweeper.advance(u64::MAX));
        assert!(sweeper.advance(u64::MAX));
        // u64::MAX % 500 == 115，两次累计 230
        assert!(!sweeper.advance(269));
        assert!(sweeper.advance(1));
    }

    #[test]
    fn zero_interval_sweeps_every_tick() {
        let mut sweeper = Sweeper::new(0);
        assert!(sweeper.advance(0));
        assert!(sweeper.advance(7));
    }
}
