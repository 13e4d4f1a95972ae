use chrono::{DateTime, NaiveDateTime, Utc};
use log::{info, warn};

use z3dio_types::{DecodeAnomaly, DeviceProfile, GpsStamp, Z3dError, Z3dResult};

use crate::gpstime;
use crate::stamps::ScanOutcome;

/// Итог сверки потока: непрерывный участок записи, которому можно верить.
#[derive(Debug, Clone)]
pub struct Reconciled {
    /// Отсчёты между удержанными штампами
    pub samples: Vec<i32>,
    /// Удержанные штампы; у первого `block_len == 0`
    pub stamps: Vec<GpsStamp>,
    /// Абсолютное UTC-время первого удержанного штампа
    pub start_time_utc: DateTime<Utc>,
    /// Неделя GPS после сворачивания переполнений
    pub gps_week: i64,
    /// Секунды внутри недели первого удержанного штампа
    pub seconds_of_week: f64,
    /// Отброшено головных штампов (артефакт буферизации)
    pub leading_trimmed: usize,
    /// Отброшено штампов по несовпадению длины блока
    pub block_trimmed: usize,
    /// Производное время минус программное, секунды (диагностика)
    pub schedule_drift_secs: Option<f64>,
    /// Накопленные нефатальные находки
    pub anomalies: Vec<DecodeAnomaly>,
}

/// Сверяет найденные штампы с заявленной частотой дискретизации и
/// восстанавливает временную базу.
///
/// Две независимые проверки, у каждой своё восстановление:
///
/// 1. Головная обрезка: первые несколько штампов файла — мусор из-за
///    внутренней буферизации устройства, они отбрасываются безусловно.
///    Количество — эмпирика конкретной ревизии, берётся из профиля.
/// 2. Длины блоков: после первого штампа каждый блок обязан быть ровно
///    `sampling_rate` слов (штампы идут раз в секунду). Сбои только в
///    первых штампах чинятся обрезкой; сбой в середине файла — реальный
///    сбой регистратора, он репортуется, но не правится.
pub fn reconcile(
    words: &[i32],
    outcome: ScanOutcome,
    sampling_rate: f64,
    gps_week: i64,
    scheduled: Option<NaiveDateTime>,
    profile: &DeviceProfile,
) -> Z3dResult<Reconciled> {
    let words = match outcome.truncate_at {
        Some(at) => &words[..at],
        None => words,
    };

    let mut anomalies = outcome.anomalies;
    let mut stamps = outcome.stamps;
    let trim = profile.leading_trim_stamps;

    if stamps.len() <= trim {
        return Err(Z3dError::NotEnoughStamps {
            found: stamps.len(),
            needed: trim + 1,
        });
    }

    // 1. головная обрезка
    stamps.drain(..trim);
    stamps[0].block_len = 0;
    let leading_trimmed = trim;

    // 2. длины блоков
    let expected = sampling_rate.round() as i32;
    let bad: Vec<usize> = stamps
        .iter()
        .enumerate()
        .skip(1)
        .filter(|(_, s)| s.block_len != expected)
        .map(|(i, _)| i)
        .collect();

    let mut block_trimmed = 0;
    if let Some(&last_bad) = bad.last() {
        if last_bad < profile.early_block_window {
            if last_bad + 1 >= stamps.len() {
                return Err(Z3dError::NotEnoughStamps {
                    found: stamps.len(),
                    needed: last_bad + 2,
                });
            }
            stamps.drain(..=last_bad);
            stamps[0].block_len = 0;
            block_trimmed = last_bad + 1;
            info!("skipped the first {block_trimmed} seconds: bad block lengths near start");
        } else {
            // сбой в середине записи: репортуем, не правим
            for i in bad {
                anomalies.push(DecodeAnomaly::BlockLengthMismatch {
                    ordinal: i,
                    expected,
                    found: stamps[i].block_len,
                });
            }
        }
    }

    // 3. соседние штампы должны отстоять на ~1 секунду
    for i in 0..stamps.len() - 1 {
        let t0 = gpstime::ticks_to_seconds(stamps[i].time, profile.gps_tick_rate);
        let t1 = gpstime::ticks_to_seconds(stamps[i + 1].time, profile.gps_tick_rate);
        let delta = t1 - t0;
        if (delta - 1.0).abs() > 0.5 {
            anomalies.push(DecodeAnomaly::GpsTimeDiscontinuity {
                ordinal: i + 1,
                delta_secs: delta,
            });
        }
    }

    // отсчёты: остаток потока минус сами записи штампов. Если была
    // хоть одна обрезка, удержанный поток начинается ровно на первом
    // удержанном штампе; иначе головные слова до первого штампа — тоже
    // отсчёты.
    let start = if leading_trimmed + block_trimmed > 0 {
        stamps[0].word_offset
    } else {
        0
    };
    let samples = collect_samples(words, &stamps, profile.stamp_words(), start);

    let declared: i64 = stamps[1..].iter().map(|s| s.block_len as i64).sum();
    if (samples.len() as i64) < declared {
        warn!(
            "sample accounting mismatch: {} collected vs {} declared by stamps",
            samples.len(),
            declared
        );
    }

    // временная база от первого удержанного штампа
    let raw_sow = gpstime::ticks_to_seconds(stamps[0].time, profile.gps_tick_rate);
    let (seconds_of_week, gps_week) = gpstime::normalize(raw_sow, gps_week);
    let start_time_utc = gpstime::utc_start(gps_week, seconds_of_week, profile.leap_seconds);

    // дрейф против расписания считаем на шкале GPS, в которой живёт
    // регистратор; чисто диагностическая величина
    let schedule_drift_secs = scheduled.map(|sched| {
        let derived = gpstime::gps_datetime(gps_week, seconds_of_week).naive_utc();
        (derived - sched).num_milliseconds() as f64 / 1000.0
    });

    Ok(Reconciled {
        samples,
        stamps,
        start_time_utc,
        gps_week,
        seconds_of_week,
        leading_trimmed,
        block_trimmed,
        schedule_drift_secs,
        anomalies,
    })
}

/// Собирает отсчёты от `start` до конца потока, пропуская интервалы
/// записей штампов.
fn collect_samples(
    words: &[i32],
    stamps: &[GpsStamp],
    stamp_words: usize,
    start: usize,
) -> Vec<i32> {
    let mut samples = Vec::with_capacity(words.len().saturating_sub(start));
    let mut pos = start;
    for s in stamps {
        samples.extend_from_slice(&words[pos..s.word_offset]);
        pos = s.word_offset + stamp_words;
    }
    samples.extend_from_slice(&words[pos..]);

    samples
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stamps::{scan_stamps, test_support::stamp_words};

    /// Поток из штампов, разделённых блоками по `lens[i]` отсчётов.
    fn build_stream(
        p: &DeviceProfile,
        block_lens: &[usize],
        tail: usize,
    ) -> Vec<i32> {
        let mut words = Vec::new();
        let mut tick = 0i32;
        words.extend(stamp_words(p, tick));
        for &len in block_lens {
            tick += 1024;
            words.extend(std::iter::repeat(42).take(len));
            words.extend(stamp_words(p, tick));
        }
        words.extend(std::iter::repeat(7).take(tail));
        words
    }

    fn no_trim_profile() -> DeviceProfile {
        DeviceProfile {
            leading_trim_stamps: 0,
            ..DeviceProfile::default()
        }
    }

    #[test]
    fn test_leading_trim_and_accounting() {
        let p = DeviceProfile::default(); // trim = 3
        let rate = 8usize;
        // 8 штампов, между ними ровно по 8 отсчётов
        let words = build_stream(&p, &[rate; 7], 0);
        let out = scan_stamps(&words, &p);
        assert_eq!(out.stamps.len(), 8);

        let rec = reconcile(&words, out, rate as f64, 1854, None, &p).unwrap();

        assert_eq!(rec.leading_trimmed, 3);
        assert_eq!(rec.stamps.len(), 5);
        assert_eq!(rec.stamps[0].block_len, 0);
        // 4 межштамповых блока по 8 отсчётов
        assert_eq!(rec.samples.len(), 32);
        assert!(rec.samples.iter().all(|&v| v == 42));
        assert!(rec.anomalies.is_empty());
    }

    #[test]
    fn test_two_bad_blocks_trimmed_through_last() {
        let p = no_trim_profile();
        let rate = 8usize;
        // блоки: 5, 6 (оба плохие), дальше ровно по 8
        let words = build_stream(&p, &[5, 6, 8, 8, 8], 0);
        let out = scan_stamps(&words, &p);
        let rec = reconcile(&words, out, rate as f64, 1854, None, &p).unwrap();

        // отброшено через последний плохой: штампы 0, 1, 2
        assert_eq!(rec.block_trimmed, 3);
        assert_eq!(rec.stamps.len(), 3);
        assert_eq!(rec.stamps[0].block_len, 0);
        assert_eq!(rec.samples.len(), 16);
        assert!(rec.anomalies.is_empty());
    }

    #[test]
    fn test_late_bad_block_reported_not_fixed() {
        let p = no_trim_profile();
        let rate = 8usize;
        // плохой блок глубоко в файле
        let words = build_stream(&p, &[8, 8, 8, 8, 8, 8, 5], 0);
        let out = scan_stamps(&words, &p);
        let rec = reconcile(&words, out, rate as f64, 1854, None, &p).unwrap();

        assert_eq!(rec.block_trimmed, 0);
        assert_eq!(rec.stamps.len(), 8);
        assert!(matches!(
            rec.anomalies[0],
            DecodeAnomaly::BlockLengthMismatch {
                ordinal: 7,
                expected: 8,
                found: 5,
            }
        ));
    }

    #[test]
    fn test_tail_after_last_stamp_retained() {
        let p = no_trim_profile();
        let words = build_stream(&p, &[8], 5);
        let out = scan_stamps(&words, &p);
        let rec = reconcile(&words, out, 8.0, 1854, None, &p).unwrap();

        // хвостовая неполная секунда — тоже отсчёты
        assert_eq!(rec.samples.len(), 13);
    }

    #[test]
    fn test_leading_words_before_first_stamp_kept_without_trim() {
        let p = no_trim_profile();
        let mut words = vec![9i32; 6];
        words.extend(build_stream(&p, &[8], 0));
        let out = scan_stamps(&words, &p);
        let rec = reconcile(&words, out, 8.0, 1854, None, &p).unwrap();

        assert_eq!(rec.samples.len(), 14);
    }

    #[test]
    fn test_trim_drops_leading_words() {
        let p = DeviceProfile::default(); // trim = 3
        let mut words = vec![9i32; 6]; // мусор до первого штампа
        words.extend(build_stream(&p, &[8; 5], 0));
        let out = scan_stamps(&words, &p);
        let rec = reconcile(&words, out, 8.0, 1854, None, &p).unwrap();

        // после обрезки поток начинается на четвёртом штампе
        assert_eq!(rec.stamps.len(), 3);
        assert_eq!(rec.samples.len(), 16);
    }

    #[test]
    fn test_not_enough_stamps() {
        let p = DeviceProfile::default(); // trim = 3
        let words = build_stream(&p, &[8, 8], 0); // всего 3 штампа
        let out = scan_stamps(&words, &p);

        assert!(matches!(
            reconcile(&words, out, 8.0, 1854, None, &p),
            Err(Z3dError::NotEnoughStamps { found: 3, needed: 4 })
        ));
    }

    #[test]
    fn test_time_base_and_drift() {
        let p = no_trim_profile();
        // первый штамп в полночь недели 1854 + 10 секунд
        let mut words = Vec::new();
        words.extend(stamp_words(&p, 10 * 1024));
        words.extend(std::iter::repeat(1).take(8));
        words.extend(stamp_words(&p, 11 * 1024));

        let out = scan_stamps(&words, &p);
        let sched = NaiveDateTime::parse_from_str(
            "2015-07-19 00:00:08",
            "%Y-%m-%d %H:%M:%S",
        )
        .unwrap();
        let rec = reconcile(&words, out, 8.0, 1854, Some(sched), &p).unwrap();

        assert_eq!(
            gpstime::format_timestamp(&rec.start_time_utc),
            "2015-07-18,23:59:54" // минус 16 прыжковых секунд
        );
        assert_eq!(rec.gps_week, 1854);
        assert_eq!(rec.seconds_of_week, 10.0);
        // штамп на 10-й секунде GPS против расписания на 8-й
        assert_eq!(rec.schedule_drift_secs, Some(2.0));
    }

    #[test]
    fn test_gps_discontinuity_reported() {
        let p = no_trim_profile();
        let mut words = Vec::new();
        words.extend(stamp_words(&p, 0));
        words.extend(std::iter::repeat(1).take(8));
        // скачок на 3 секунды вместо одной
        words.extend(stamp_words(&p, 3 * 1024));

        let out = scan_stamps(&words, &p);
        let rec = reconcile(&words, out, 8.0, 1854, None, &p).unwrap();

        assert!(rec
            .anomalies
            .iter()
            .any(|a| matches!(a, DecodeAnomaly::GpsTimeDiscontinuity { ordinal: 1, .. })));
    }

    #[test]
    fn test_week_rollover_in_first_stamp() {
        let p = no_trim_profile();
        let over = gpstime::WEEK_SECONDS as i32 + 5;
        let mut words = Vec::new();
        words.extend(stamp_words(&p, over * 1024));
        words.extend(std::iter::repeat(1).take(8));
        words.extend(stamp_words(&p, (over + 1) * 1024));

        let out = scan_stamps(&words, &p);
        let rec = reconcile(&words, out, 8.0, 1854, None, &p).unwrap();

        assert_eq!(rec.gps_week, 1855);
        assert_eq!(rec.seconds_of_week, 5.0);
    }
}
