use byteorder::{ByteOrder, LittleEndian};
use log::warn;

use z3dio_types::{DecodeAnomaly, DeviceProfile, GpsStamp};

/// Результат прохода сканера по потоку слов.
#[derive(Debug, Clone)]
pub struct ScanOutcome {
    /// Извлечённые штампы в порядке появления
    pub stamps: Vec<GpsStamp>,
    /// Слово, на котором поток пришлось усечь
    /// (кандидат в штампы, не дочитанный до конца)
    pub truncate_at: Option<usize>,
    /// Нефатальные находки
    pub anomalies: Vec<DecodeAnomaly>,
}

/// Ищет в потоке слов GPS-штампы по паре сентинелей.
///
/// Обычный отсчёт может случайно совпасть с первым сентинелем, поэтому
/// кандидат подтверждается только если СЛЕДУЮЩЕЕ слово равно второму
/// сентинелю — пара (i32::MAX, i32::MIN) подряд статистически
/// неправдоподобна для настоящих отсчётов.
///
/// `block_len` пересчитывается из геометрии потока (зазор до прошлого
/// штампа минус длина записи), а не берётся из самой записи: так
/// валидация не зависит от честности регистратора.
pub fn scan_stamps(
    words: &[i32],
    profile: &DeviceProfile,
) -> ScanOutcome {
    let sw = profile.stamp_words();
    let mut stamps = Vec::new();
    let mut anomalies = Vec::new();
    let mut truncate_at = None;
    let mut prev_start: Option<usize> = None;

    let mut i = 0usize;
    while i < words.len() {
        if words[i] != profile.sentinel0 {
            i += 1;
            continue;
        }

        // кандидат: подтверждаем вторым сентинелем
        if i + 1 >= words.len() {
            warn!("incomplete trailing stamp candidate at word {i}, truncating");
            anomalies.push(DecodeAnomaly::IncompleteTrailingStamp { word_index: i });
            truncate_at = Some(i);
            break;
        }
        if words[i + 1] != profile.sentinel1 {
            // ложное срабатывание: отсчёт совпал с сентинелем
            i += 1;
            continue;
        }
        if i + sw > words.len() {
            // пара подтверждена, но запись не дочитывается
            warn!("confirmed stamp at word {i} truncated by EOF");
            anomalies.push(DecodeAnomaly::IncompleteTrailingStamp { word_index: i });
            truncate_at = Some(i);
            break;
        }

        let mut stamp = parse_stamp(&words[i..i + sw]);
        stamp.word_offset = i;
        stamp.block_len = match prev_start {
            // до самого первого штампа ничего нет
            None => 0,
            Some(prev) => (i - prev - sw) as i32,
        };

        prev_start = Some(i);
        stamps.push(stamp);
        i += sw;
    }

    ScanOutcome {
        stamps,
        truncate_at,
        anomalies,
    }
}

/// Переинтерпретирует слова записи как 64-байтную раскладку штампа.
fn parse_stamp(words: &[i32]) -> GpsStamp {
    let mut bytes = [0u8; 64];
    for (k, w) in words.iter().enumerate() {
        bytes[k * 4..k * 4 + 4].copy_from_slice(&w.to_le_bytes());
    }

    GpsStamp {
        // bytes[0..8] — пара сентинелей, в запись не входит
        time: LittleEndian::read_i32(&bytes[8..12]),
        lat: LittleEndian::read_f64(&bytes[12..20]),
        lon: LittleEndian::read_f64(&bytes[20..28]),
        num_sat: LittleEndian::read_i32(&bytes[28..32]),
        gps_sens: LittleEndian::read_i32(&bytes[32..36]),
        temperature: LittleEndian::read_f32(&bytes[36..40]),
        voltage: LittleEndian::read_f32(&bytes[40..44]),
        num_fpga: LittleEndian::read_i32(&bytes[44..48]),
        num_adc: LittleEndian::read_i32(&bytes[48..52]),
        pps_count: LittleEndian::read_i32(&bytes[52..56]),
        dac_tune: LittleEndian::read_i32(&bytes[56..60]),
        block_len: LittleEndian::read_i32(&bytes[60..64]),
        word_offset: 0,
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::stamp_words;
    use super::*;

    fn profile() -> DeviceProfile {
        DeviceProfile::default()
    }

    #[test]
    fn test_stamps_every_rate_words() {
        let p = profile();
        let rate = 256usize;
        let mut words = Vec::new();
        for n in 0..4 {
            if n > 0 {
                words.extend(std::iter::repeat(100 + n as i32).take(rate));
            }
            words.extend(stamp_words(&p, 1024 * n as i32));
        }

        let out = scan_stamps(&words, &p);
        assert_eq!(out.stamps.len(), 4);
        assert!(out.truncate_at.is_none());
        assert!(out.anomalies.is_empty());

        assert_eq!(out.stamps[0].block_len, 0);
        for s in &out.stamps[1..] {
            assert_eq!(s.block_len, rate as i32);
        }
        assert_eq!(out.stamps[1].word_offset, 16 + rate);
    }

    #[test]
    fn test_record_fields_decoded() {
        let p = profile();
        let words = stamp_words(&p, 2048);
        let out = scan_stamps(&words, &p);

        let s = &out.stamps[0];
        assert_eq!(s.time, 2048);
        assert!((s.lat - 0.699).abs() < 1e-12);
        assert!((s.lon + 2.094).abs() < 1e-12);
        assert_eq!(s.num_sat, 8);
        assert!((s.temperature - 24.5).abs() < 1e-6);
        assert!((s.voltage - 12.3).abs() < 1e-6);
        assert_eq!(s.pps_count, 3);
    }

    #[test]
    fn test_false_positive_sentinel_rejected() {
        let p = profile();
        let mut words = vec![5i32, p.sentinel0, 7, 9]; // отсчёт равен сентинелю
        words.extend(stamp_words(&p, 1024));

        let out = scan_stamps(&words, &p);
        assert_eq!(out.stamps.len(), 1);
        assert_eq!(out.stamps[0].word_offset, 4);
        assert!(out.anomalies.is_empty());
    }

    #[test]
    fn test_trailing_candidate_truncates() {
        let p = profile();
        let mut words = stamp_words(&p, 1024);
        words.extend_from_slice(&[1, 2, 3]);
        words.push(p.sentinel0); // пара уже не читается

        let out = scan_stamps(&words, &p);
        assert_eq!(out.stamps.len(), 1);
        assert_eq!(out.truncate_at, Some(19));
        assert!(matches!(
            out.anomalies[0],
            DecodeAnomaly::IncompleteTrailingStamp { word_index: 19 }
        ));
    }

    #[test]
    fn test_truncated_record_tail() {
        let p = profile();
        let mut words = stamp_words(&p, 1024);
        words.extend_from_slice(&[1, 2]);
        // подтверждённая пара, но запись не дочитывается
        words.push(p.sentinel0);
        words.push(p.sentinel1);
        words.push(2048);

        let out = scan_stamps(&words, &p);
        assert_eq!(out.stamps.len(), 1);
        assert_eq!(out.truncate_at, Some(18));
    }

    #[test]
    fn test_custom_sentinels() {
        let p = DeviceProfile {
            sentinel0: 7777,
            sentinel1: -7777,
            ..DeviceProfile::default()
        };
        let mut words = vec![1, 2, 3];
        words.extend(stamp_words(&p, 512));

        let out = scan_stamps(&words, &p);
        assert_eq!(out.stamps.len(), 1);
        assert_eq!(out.stamps[0].time, 512);
    }
}
