//! 计费规则 - 纯函数，无时钟读取，相同输入产生相同输出

use crate::domain::model::FeeQuote;

/// 计费规则：每小时费率 + 计费粒度
///
/// 停车时长向上取整到计费粒度的整数倍，不足一个粒度按一个粒度
/// 计费（没有免费宽限期，停 1 秒也按第一个粒度收费）。
#[derive(Clone, Copy, Debug)]
pub struct FeeSchedule {
    /// 每小时费率（货币单位）
    pub rate_per_hour: f64,
    /// 计费粒度（分钟）
    pub rounding_minutes: u32,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            rate_per_hour: 10.0,
            rounding_minutes: 15,
        }
    }
}

impl FeeSchedule {
    pub fn new(rate_per_hour: f64, rounding_minutes: u32) -> Self {
        Self {
            rate_per_hour,
            rounding_minutes,
        }
    }

    /// 计算给定到达 / 离开时刻（epoch 秒）的计费报价
    ///
    /// `exit_time < arrival_time`（时钟偏移）时按零时长处理，
    /// 再落入最小粒度规则，绝不产生负费用。
    pub fn quote(&self, arrival_time: f64, exit_time: f64) -> FeeQuote {
        let elapsed_minutes = (exit_time - arrival_time).max(0.0) / 60.0;
        let granularity = f64::from(self.rounding_minutes);

        let blocks = (elapsed_minutes / granularity).ceil().max(1.0);
        let billed_minutes = blocks * granularity;
        let billed_hours = billed_minutes / 60.0;

        FeeQuote {
            billed_minutes,
            billed_hours,
            fee: billed_hours * self.rate_per_hour,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_elapsed_bills_first_block() {
        let quote = FeeSchedule::default().quote(0.0, 0.0);
        assert_eq!(quote.billed_minutes, 15.0);
        assert_eq!(quote.billed_hours, 0.25);
        assert_eq!(quote.fee, 2.5);
    }

    #[test]
    fn test_exact_block_boundary() {
        // 恰好 15 分钟，不进位到下一个粒度
        let quote = FeeSchedule::default().quote(0.0, 900.0);
        assert_eq!(quote.billed_minutes, 15.0);
        assert_eq!(quote.fee, 2.5);
    }

    #[test]
    fn test_one_second_past_boundary_bills_next_block() {
        let quote = FeeSchedule::default().quote(0.0, 901.0);
        assert_eq!(quote.billed_minutes, 30.0);
        assert_eq!(quote.billed_hours, 0.5);
        assert_eq!(quote.fee, 5.0);
    }

    #[test]
    fn test_full_hour() {
        let quote = FeeSchedule::default().quote(0.0, 3600.0);
        assert_eq!(quote.billed_minutes, 60.0);
        assert_eq!(quote.billed_hours, 1.0);
        assert_eq!(quote.fee, 10.0);
    }

    #[test]
    fn test_negative_elapsed_clamps_to_minimum_block() {
        // 时钟偏移：离开时刻早于到达时刻
        let quote = FeeSchedule::default().quote(1000.0, 500.0);
        assert_eq!(quote.billed_minutes, 15.0);
        assert_eq!(quote.fee, 2.5);
    }

    #[test]
    fn test_custom_schedule() {
        let schedule = FeeSchedule::new(6.0, 30);
        // 31 分钟，粒度 30 → 60 分钟 → 6.0
        let quote = schedule.quote(0.0, 31.0 * 60.0);
        assert_eq!(quote.billed_minutes, 60.0);
        assert_eq!(quote.fee, 6.0);
    }

    #[test]
    fn test_deterministic_for_identical_inputs() {
        let schedule = FeeSchedule::default();
        let a = schedule.quote(1_700_000_000.25, 1_700_005_432.75);
        let b = schedule.quote(1_700_000_000.25, 1_700_005_432.75);
        assert_eq!(a, b);
    }
}
