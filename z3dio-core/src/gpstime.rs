//! Чистые функции пересчёта счётчика GPS-времени устройства в UTC.
//!
//! Счётчик в штампе — тики внутри GPS-недели с частотой 1024 Гц;
//! абсолютное время получается от эпохи GPS (1980-01-06) по номеру
//! недели из заголовка минус накопленные прыжковые секунды.

use chrono::{DateTime, Utc};

/// Длина GPS-недели в секундах.
pub const WEEK_SECONDS: i64 = 604_800;

/// Unix-время эпохи GPS: 1980-01-06T00:00:00Z.
pub const GPS_EPOCH_UNIX: i64 = 315_964_800;

/// Формат времени, который исторически пишут обработчики Z3D.
pub const DATETIME_FMT: &str = "%Y-%m-%d,%H:%M:%S";

/// Тики счётчика → секунды внутри недели.
///
/// Дробная часть умножается на 1.024: прошивка округляет дробные тики
/// с шагом, слегка отличным от ровной секунды, и этот множитель —
/// известная поправка под её причуду.
pub fn ticks_to_seconds(
    ticks: i32,
    tick_rate: f64,
) -> f64 {
    let t = ticks as f64 / tick_rate;
    let whole = t.floor();
    whole + (t - whole) * 1.024
}

/// Сворачивает секунды, вылезшие за неделю, в следующую неделю.
pub fn normalize(
    mut seconds: f64,
    mut week: i64,
) -> (f64, i64) {
    while seconds > WEEK_SECONDS as f64 {
        seconds -= WEEK_SECONDS as f64;
        week += 1;
    }
    (seconds, week)
}

/// Абсолютное UTC-время из (неделя, секунды недели, прыжковые секунды).
///
/// GPS-время опережает UTC на `leap_seconds`; значение всегда приходит
/// параметром (из профиля устройства), здесь оно не зашито.
pub fn utc_start(
    gps_week: i64,
    seconds_of_week: f64,
    leap_seconds: i64,
) -> DateTime<Utc> {
    let whole = seconds_of_week.floor();
    let nanos = ((seconds_of_week - whole) * 1e9).round() as u32;
    let unix = GPS_EPOCH_UNIX + gps_week * WEEK_SECONDS + whole as i64 - leap_seconds;

    DateTime::from_timestamp(unix, nanos).unwrap_or_default()
}

/// То же время, но на шкале GPS (без прыжковых секунд) — для сравнения
/// с программным расписанием, которое регистратор держит в GPS-времени.
pub fn gps_datetime(
    gps_week: i64,
    seconds_of_week: f64,
) -> DateTime<Utc> {
    utc_start(gps_week, seconds_of_week, 0)
}

/// Строка `YYYY-MM-DD,HH:MM:SS`.
pub fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.format(DATETIME_FMT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticks_whole_seconds() {
        assert_eq!(ticks_to_seconds(0, 1024.0), 0.0);
        assert_eq!(ticks_to_seconds(1024, 1024.0), 1.0);
        assert_eq!(ticks_to_seconds(10 * 1024, 1024.0), 10.0);
    }

    #[test]
    fn test_ticks_fractional_correction() {
        // 1536 тиков = 1.5 с номинально; дробь корректируется 1.024
        let s = ticks_to_seconds(1536, 1024.0);
        assert!((s - 1.512).abs() < 1e-12);
    }

    #[test]
    fn test_week_rollover() {
        let (s, w) = normalize(WEEK_SECONDS as f64 + 5.0, 1854);
        assert_eq!(s, 5.0);
        assert_eq!(w, 1855);

        let (s, w) = normalize(100.0, 1854);
        assert_eq!(s, 100.0);
        assert_eq!(w, 1854);
    }

    #[test]
    fn test_utc_fixture_week_1854() {
        // неделя 1854 начинается 2015-07-19; минус 16 прыжковых секунд
        let dt = utc_start(1854, 0.0, 16);
        assert_eq!(format_timestamp(&dt), "2015-07-18,23:59:44");

        let gps = gps_datetime(1854, 0.0);
        assert_eq!(format_timestamp(&gps), "2015-07-19,00:00:00");
    }

    #[test]
    fn test_utc_epoch_zero() {
        let dt = utc_start(0, 0.0, 0);
        assert_eq!(format_timestamp(&dt), "1980-01-06,00:00:00");
    }

    #[test]
    fn test_round_trip_against_known_pairs() {
        // независимо посчитанные пары (неделя, секунды) → UTC
        let cases = [
            (1840, 0.0, 16, "2015-04-11,23:59:44"),
            (1840, 86_400.0, 16, "2015-04-12,23:59:44"),
            (1845, 3_600.0, 16, "2015-05-17,00:59:44"),
        ];
        for (week, sow, leap, expected) in cases {
            let dt = utc_start(week, sow, leap);
            assert_eq!(format_timestamp(&dt), expected, "week {week} sow {sow}");
        }
    }
}
