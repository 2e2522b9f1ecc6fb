//! crates/autocoach_core/src/progress.rs
//!
//! Pure gamification math: XP thresholds, the level-up cascade, and the
//! daily login streak. Callers persist the returned profile themselves.

use crate::domain::UserProfile;
use chrono::NaiveDate;

/// Base XP granted for every sent message.
pub const XP_PER_MESSAGE: u64 = 10;
/// Maximum XP a completed quiz can award.
pub const XP_FOR_QUIZ: u64 = 50;
/// Bonus XP per streak day, applied once the streak exceeds one day.
pub const XP_PER_STREAK_DAY_BONUS: u64 = 2;

/// XP required to advance past `level`: `floor(100 * level^1.2)`.
/// Strictly increasing for level >= 1.
pub fn xp_for_next_level(level: u32) -> u64 {
    (100.0 * f64::from(level).powf(1.2)).floor() as u64
}

/// XP awarded for one sent message given the current streak. Longer
/// streaks yield strictly more XP, uncapped.
pub fn message_xp(streak: u32) -> u64 {
    let bonus = if streak > 1 {
        u64::from(streak) * XP_PER_STREAK_DAY_BONUS
    } else {
        0
    };
    XP_PER_MESSAGE + bonus
}

/// XP awarded for finishing a quiz with `score` out of `total` correct.
pub fn quiz_xp(score: usize, total: usize) -> u64 {
    if total == 0 {
        return 0;
    }
    ((score as f64 / total as f64) * XP_FOR_QUIZ as f64).round() as u64
}

/// Adds `amount` XP and cascades level-ups: while the XP meter reaches the
/// threshold for the current level, the threshold is consumed and the level
/// increments, producing one notice per level gained.
pub fn award_xp(profile: &UserProfile, amount: u64) -> (UserProfile, Vec<String>) {
    let mut updated = profile.clone();
    let mut notices = Vec::new();

    updated.xp += amount;
    while updated.xp >= xp_for_next_level(updated.level) {
        updated.xp -= xp_for_next_level(updated.level);
        updated.level += 1;
        notices.push(format!(
            "Congratulations, you've reached Level {}!",
            updated.level
        ));
    }

    (updated, notices)
}

/// Applies the once-per-login streak rule. Same day: unchanged. Exactly one
/// calendar day later: streak increments. Any other gap: streak resets to 1.
/// `last_login_date` moves to `today` whenever it differs.
pub fn compute_streak(profile: &UserProfile, today: NaiveDate) -> UserProfile {
    if profile.last_login_date == today {
        return profile.clone();
    }

    let mut updated = profile.clone();
    updated.streak = match profile.last_login_date.succ_opt() {
        Some(day_after) if day_after == today => profile.streak + 1,
        _ => 1,
    };
    updated.last_login_date = today;
    updated
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::LearningLevel;

    fn profile(level: u32, xp: u64, streak: u32, last_login: NaiveDate) -> UserProfile {
        UserProfile {
            name: "Alex".to_string(),
            learning_level: LearningLevel::Beginner,
            subject_preferences: None,
            level,
            xp,
            streak,
            last_login_date: last_login,
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn thresholds_are_strictly_increasing() {
        for level in 1..200 {
            assert!(xp_for_next_level(level) < xp_for_next_level(level + 1));
        }
    }

    #[test]
    fn level_one_threshold_is_one_hundred() {
        assert_eq!(xp_for_next_level(1), 100);
    }

    #[test]
    fn single_level_up_carries_remainder() {
        let p = profile(1, 95, 1, date(2024, 1, 1));
        let (updated, notices) = award_xp(&p, 10);
        assert_eq!(updated.level, 2);
        assert_eq!(updated.xp, 5);
        assert_eq!(notices, vec!["Congratulations, you've reached Level 2!"]);
    }

    #[test]
    fn cascade_produces_one_notice_per_level() {
        // 100 + 229 = 329 consumed across levels 1 and 2.
        let p = profile(1, 0, 1, date(2024, 1, 1));
        let (updated, notices) = award_xp(&p, 350);
        assert_eq!(updated.level, 3);
        assert_eq!(updated.xp, 350 - 100 - xp_for_next_level(2));
        assert_eq!(notices.len(), 2);
    }

    #[test]
    fn awarded_xp_is_conserved() {
        let p = profile(1, 40, 1, date(2024, 1, 1));
        let amount = 12_345;
        let (updated, _) = award_xp(&p, amount);

        let mut consumed = 0;
        for level in p.level..updated.level {
            consumed += xp_for_next_level(level);
        }
        assert_eq!(updated.xp + consumed, p.xp + amount);
        assert!(updated.xp < xp_for_next_level(updated.level));
    }

    #[test]
    fn zero_award_never_levels() {
        let p = profile(3, 17, 1, date(2024, 1, 1));
        let (updated, notices) = award_xp(&p, 0);
        assert_eq!(updated, p);
        assert!(notices.is_empty());
    }

    #[test]
    fn same_day_login_is_idempotent() {
        let p = profile(1, 0, 4, date(2024, 3, 10));
        let updated = compute_streak(&p, date(2024, 3, 10));
        assert_eq!(updated.streak, 4);
        assert_eq!(updated.last_login_date, date(2024, 3, 10));
    }

    #[test]
    fn consecutive_day_extends_streak() {
        let p = profile(1, 0, 3, date(2024, 3, 10));
        let updated = compute_streak(&p, date(2024, 3, 11));
        assert_eq!(updated.streak, 4);
        assert_eq!(updated.last_login_date, date(2024, 3, 11));
    }

    #[test]
    fn gap_resets_streak() {
        let p = profile(1, 0, 9, date(2024, 3, 10));
        let updated = compute_streak(&p, date(2024, 3, 13));
        assert_eq!(updated.streak, 1);
        assert_eq!(updated.last_login_date, date(2024, 3, 13));
    }

    #[test]
    fn streak_survives_month_boundary() {
        let p = profile(1, 0, 1, date(2024, 2, 29));
        let updated = compute_streak(&p, date(2024, 3, 1));
        assert_eq!(updated.streak, 2);
    }

    #[test]
    fn message_xp_scales_with_streak() {
        assert_eq!(message_xp(1), 10);
        assert_eq!(message_xp(2), 14);
        assert_eq!(message_xp(5), 20);
    }

    #[test]
    fn quiz_xp_is_proportional() {
        assert_eq!(quiz_xp(3, 3), 50);
        assert_eq!(quiz_xp(0, 3), 0);
        assert_eq!(quiz_xp(2, 3), 33);
        assert_eq!(quiz_xp(0, 0), 0);
    }
}
