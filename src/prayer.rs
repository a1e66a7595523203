//! Prayer schedule bookkeeping: six named times per day, the next prayer
//! relative to a minute-of-day clock, and the Arabic countdown wording.

use chrono::{Local, Timelike};
use color_eyre::{eyre::eyre, Result};
use serde::{Deserialize, Serialize};

pub const MINUTES_PER_DAY: u32 = 24 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prayer {
  Fajr,
  Sunrise,
  Dhuhr,
  Asr,
  Maghrib,
  Isha,
}

impl Prayer {
  pub fn name(self) -> &'static str {
    match self {
      Prayer::Fajr => "fajr",
      Prayer::Sunrise => "sunrise",
      Prayer::Dhuhr => "dhuhr",
      Prayer::Asr => "asr",
      Prayer::Maghrib => "maghrib",
      Prayer::Isha => "isha",
    }
  }

  pub fn name_ar(self) -> &'static str {
    match self {
      Prayer::Fajr => "الفجر",
      Prayer::Sunrise => "الشروق",
      Prayer::Dhuhr => "الظهر",
      Prayer::Asr => "العصر",
      Prayer::Maghrib => "المغرب",
      Prayer::Isha => "العشاء",
    }
  }
}

/// One day's schedule, every entry an `HH:MM` wall-clock string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrayerSchedule {
  pub fajr: String,
  pub sunrise: String,
  pub dhuhr: String,
  pub asr: String,
  pub maghrib: String,
  pub isha: String,
  /// ISO date the schedule was stored for.
  pub date: String,
}

impl PrayerSchedule {
  /// The six times in day order.
  pub fn times(&self) -> [(Prayer, &str); 6] {
    [
      (Prayer::Fajr, self.fajr.as_str()),
      (Prayer::Sunrise, self.sunrise.as_str()),
      (Prayer::Dhuhr, self.dhuhr.as_str()),
      (Prayer::Asr, self.asr.as_str()),
      (Prayer::Maghrib, self.maghrib.as_str()),
      (Prayer::Isha, self.isha.as_str()),
    ]
  }

  /// Every entry must parse as `HH:MM`.
  pub fn validate(&self) -> Result<()> {
    for (prayer, time) in self.times() {
      if parse_minutes(time).is_none() {
        return Err(eyre!("Invalid time '{}' for {}", time, prayer.name()));
      }
    }
    Ok(())
  }
}

/// The upcoming prayer relative to some minute of the day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NextPrayer {
  pub prayer: Prayer,
  pub time: String,
  /// Minute of day the prayer falls on.
  pub minutes: u32,
  pub tomorrow: bool,
}

/// First prayer whose minute-of-day is strictly after `now_minutes`.
/// Sunrise is informational and never selected; once the day's prayers are
/// done the answer wraps to the first prayer tomorrow. Entries that fail to
/// parse are skipped; `None` only when nothing parses.
pub fn next_prayer(schedule: &PrayerSchedule, now_minutes: u32) -> Option<NextPrayer> {
  let mut first: Option<NextPrayer> = None;
  for (prayer, time) in schedule.times() {
    if prayer == Prayer::Sunrise {
      continue;
    }
    let Some(minutes) = parse_minutes(time) else {
      continue;
    };
    if first.is_none() {
      first = Some(NextPrayer {
        prayer,
        time: time.to_string(),
        minutes,
        tomorrow: true,
      });
    }
    if minutes > now_minutes {
      return Some(NextPrayer {
        prayer,
        time: time.to_string(),
        minutes,
        tomorrow: false,
      });
    }
  }
  first
}

/// Whole minutes from `now_minutes` until the prayer.
pub fn minutes_until(next: &NextPrayer, now_minutes: u32) -> u32 {
  let target = if next.tomorrow {
    next.minutes + MINUTES_PER_DAY
  } else {
    next.minutes
  };
  target.saturating_sub(now_minutes)
}

/// Countdown wording: `X ساعة و Y دقيقة` above an hour, `Y دقيقة` below.
pub fn format_countdown(total_minutes: u32) -> String {
  let hours = total_minutes / 60;
  let minutes = total_minutes % 60;
  if hours > 0 {
    format!("{} ساعة و {} دقيقة", hours, minutes)
  } else {
    format!("{} دقيقة", minutes)
  }
}

/// Current local minute of day.
pub fn now_minutes() -> u32 {
  let now = Local::now();
  now.hour() * 60 + now.minute()
}

fn parse_minutes(time: &str) -> Option<u32> {
  let (hours, minutes) = time.split_once(':')?;
  let hours: u32 = hours.trim().parse().ok()?;
  let minutes: u32 = minutes.trim().parse().ok()?;
  if hours > 23 || minutes > 59 {
    return None;
  }
  Some(hours * 60 + minutes)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn schedule() -> PrayerSchedule {
    PrayerSchedule {
      fajr: "05:30".to_string(),
      sunrise: "06:45".to_string(),
      dhuhr: "12:45".to_string(),
      asr: "16:15".to_string(),
      maghrib: "19:30".to_string(),
      isha: "21:00".to_string(),
      date: "2026-08-25".to_string(),
    }
  }

  #[test]
  fn test_next_prayer_midday() {
    let next = next_prayer(&schedule(), 13 * 60).unwrap();
    assert_eq!(next.prayer, Prayer::Asr);
    assert_eq!(next.time, "16:15");
    assert!(!next.tomorrow);
  }

  #[test]
  fn test_next_prayer_skips_sunrise() {
    // 06:00 is before sunrise, but the answer must jump to dhuhr.
    let next = next_prayer(&schedule(), 6 * 60).unwrap();
    assert_eq!(next.prayer, Prayer::Dhuhr);
  }

  #[test]
  fn test_next_prayer_wraps_to_fajr_tomorrow() {
    let next = next_prayer(&schedule(), 22 * 60).unwrap();
    assert_eq!(next.prayer, Prayer::Fajr);
    assert!(next.tomorrow);
    assert_eq!(minutes_until(&next, 22 * 60), 7 * 60 + 30);
  }

  #[test]
  fn test_next_prayer_exact_time_moves_on() {
    // Strictly after: at 16:15 exactly, asr has started and maghrib is next.
    let next = next_prayer(&schedule(), 16 * 60 + 15).unwrap();
    assert_eq!(next.prayer, Prayer::Maghrib);
  }

  #[test]
  fn test_unparseable_entries_are_skipped() {
    let mut bad = schedule();
    bad.asr = "later".to_string();
    let next = next_prayer(&bad, 13 * 60).unwrap();
    assert_eq!(next.prayer, Prayer::Maghrib);

    bad.fajr = "??".to_string();
    bad.dhuhr = "25:00".to_string();
    bad.maghrib = "19:70".to_string();
    bad.isha = String::new();
    assert_eq!(next_prayer(&bad, 13 * 60), None);
  }

  #[test]
  fn test_countdown_wording() {
    assert_eq!(format_countdown(90), "1 ساعة و 30 دقيقة");
    assert_eq!(format_countdown(45), "45 دقيقة");
    assert_eq!(format_countdown(120), "2 ساعة و 0 دقيقة");
  }

  #[test]
  fn test_validate_rejects_bad_times() {
    assert!(schedule().validate().is_ok());
    let mut bad = schedule();
    bad.isha = "9pm".to_string();
    assert!(bad.validate().is_err());
  }
}
