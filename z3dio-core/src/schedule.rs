use std::collections::BTreeMap;
use std::io::{Read, Seek};

use chrono::{Duration, NaiveDateTime};

use z3dio_types::{Z3dError, Z3dResult};

use crate::block_reader::FixedBlockReader;

const DATE_FMT: &str = "%Y-%m-%d";
const TIME_FMT: &str = "%H:%M:%S";

/// Блок расписания: запрограммированные оператором параметры запуска.
///
/// Второй блок файла. Ключи хранятся как `SCHEDULE.<Key>`; первый
/// сегмент отбрасывается, регистр остального сохраняется как в файле.
///
/// Поле `Time` при разборе сдвигается вперёд на поправку профиля
/// (штатно 2 секунды): первый валидный GPS-фикс стабильно приходит
/// на столько позже номинала расписания. Это ПРОГРАММНОЕ время
/// старта; фактическое восстанавливается позже по первому годному
/// штампу.
#[derive(Debug, Clone)]
pub struct ScheduleBlock {
    fields: BTreeMap<String, String>,
}

impl ScheduleBlock {
    /// Читает и разбирает расписание (блок сразу после заголовка).
    pub fn read_from<R: Read + Seek>(
        reader: &mut FixedBlockReader<R>,
        offset_secs: i64,
    ) -> Z3dResult<Self> {
        let offset = reader.block_len() as u64;
        match reader.read_block_at(offset)? {
            Some(block) => Ok(Self::parse(&block, offset_secs)),
            None => Err(Z3dError::TruncatedSchedule {
                needed: reader.block_len(),
                available: reader.stream_len().saturating_sub(offset),
            }),
        }
    }

    /// Разбирает текст блока расписания, применяя поправку времени.
    pub fn parse(
        block: &[u8],
        offset_secs: i64,
    ) -> Self {
        let text = String::from_utf8_lossy(block);
        let mut fields = BTreeMap::new();

        for line in text.split('\n') {
            let Some((raw_key, raw_value)) = line.split_once('=') else {
                continue;
            };
            // отбрасываем сегмент "SCHEDULE."
            let Some((_, key)) = raw_key.split_once('.') else {
                continue;
            };
            let key = key.trim().replace('/', "");
            if key.is_empty() {
                continue;
            }
            let value = raw_value
                .trim_matches(|c: char| c == '\0' || c.is_whitespace())
                .to_string();
            fields.insert(key, value);
        }

        let mut schedule = Self { fields };
        schedule.apply_time_offset(offset_secs);
        schedule
    }

    /// Сдвигает Date/Time на поправку, честной арифметикой времени
    /// (перенос через минуту/час/сутки), а не правкой строки.
    fn apply_time_offset(
        &mut self,
        offset_secs: i64,
    ) {
        let Some(start) = self.parse_start() else {
            return;
        };
        let shifted = start + Duration::seconds(offset_secs);

        self.fields
            .insert("Date".to_string(), shifted.format(DATE_FMT).to_string());
        self.fields
            .insert("Time".to_string(), shifted.format(TIME_FMT).to_string());
    }

    fn parse_start(&self) -> Option<NaiveDateTime> {
        let date = self.fields.get("Date")?;
        let time = self.fields.get("Time")?;
        NaiveDateTime::parse_from_str(
            &format!("{date} {time}"),
            &format!("{DATE_FMT} {TIME_FMT}"),
        )
        .ok()
    }

    pub fn get(
        &self,
        key: &str,
    ) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    /// Программное время старта (уже с поправкой).
    pub fn scheduled_start(&self) -> Z3dResult<NaiveDateTime> {
        self.parse_start()
            .ok_or_else(|| Z3dError::missing_field("SCHEDULE.Date/Time"))
    }

    /// Частота дискретизации из расписания (дублирует заголовок).
    pub fn sr(&self) -> Option<f64> {
        self.fields.get("SR").and_then(|v| v.parse().ok())
    }
}
