use std::collections::BTreeMap;
use std::io::{Read, Seek};

use z3dio_types::{FieldValue, Z3dError, Z3dResult};

use crate::block_reader::FixedBlockReader;

/// Неделя GPS по умолчанию, если железо её не записало
/// (наблюдается у ранних прошивок).
const DEFAULT_GPS_WEEK: i64 = 1740;

/// Единица измерения поля заголовка.
///
/// Явная схема «имя поля → конверсия» вместо угадывания по месту:
/// аппаратная причуда регистратора в том, что координаты он пишет
/// в радианах.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldUnit {
    /// Значение берётся как есть
    Plain,
    /// Значение в радианах, храним в градусах
    RadToDeg,
}

fn unit_for(key: &str) -> FieldUnit {
    match key {
        "lat" | "long" => FieldUnit::RadToDeg,
        _ => FieldUnit::Plain,
    }
}

/// Заголовочный блок Z3D: конфигурация устройства и канала.
///
/// Первый блок файла. Текстовые строки `ключ = значение`; ключи
/// нормализуются (нижний регистр, пробелы в `_`, `/` и `.` удаляются),
/// значения приводятся к числу где возможно.
#[derive(Debug, Clone)]
pub struct HeaderBlock {
    fields: BTreeMap<String, FieldValue>,
}

impl HeaderBlock {
    /// Читает и разбирает заголовок (блок по смещению 0).
    pub fn read_from<R: Read + Seek>(
        reader: &mut FixedBlockReader<R>,
    ) -> Z3dResult<Self> {
        match reader.read_block_at(0)? {
            Some(block) => Ok(Self::parse(&block)),
            None => Err(Z3dError::TruncatedHeader {
                needed: reader.block_len(),
                available: reader.stream_len(),
            }),
        }
    }

    /// Разбирает текст заголовочного блока.
    pub fn parse(block: &[u8]) -> Self {
        let text = String::from_utf8_lossy(block);
        let mut fields = BTreeMap::new();

        for line in text.split('\n') {
            let Some((raw_key, raw_value)) = line.split_once('=') else {
                continue;
            };
            let key = normalize_key(raw_key);
            if key.is_empty() {
                continue;
            }
            let raw_value =
                raw_value.trim_matches(|c: char| c == '\0' || c.is_whitespace());
            let value = coerce_value(&key, raw_value);
            fields.insert(key, value);
        }

        Self { fields }
    }

    pub fn get(
        &self,
        key: &str,
    ) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    pub fn fields(&self) -> &BTreeMap<String, FieldValue> {
        &self.fields
    }

    fn numeric(
        &self,
        key: &str,
    ) -> Option<f64> {
        self.fields.get(key).and_then(FieldValue::as_f64)
    }

    /// Частота дискретизации АЦП, Гц. Без неё поток валидировать нечем.
    pub fn ad_rate(&self) -> Z3dResult<f64> {
        self.numeric("ad_rate")
            .ok_or_else(|| Z3dError::missing_field("ad_rate"))
    }

    /// Усиление канала АЦП.
    pub fn ad_gain(&self) -> Option<f64> {
        self.numeric("ad_gain")
    }

    /// Неделя GPS на момент старта записи.
    pub fn gps_week(&self) -> i64 {
        self.numeric("gpsweek")
            .map(|v| v as i64)
            .unwrap_or(DEFAULT_GPS_WEEK)
    }

    /// Широта станции в градусах (рассчитана из радиан при разборе).
    pub fn lat(&self) -> Option<f64> {
        self.numeric("lat")
    }

    /// Долгота станции в градусах.
    pub fn long(&self) -> Option<f64> {
        self.numeric("long")
    }

    /// Высота станции (по опыту — ненадёжна).
    pub fn alt(&self) -> Option<f64> {
        self.numeric("alt")
    }

    /// Номер ZEN-бокса.
    pub fn box_number(&self) -> Option<&FieldValue> {
        self.fields.get("box_number")
    }

    /// Номер канала платы.
    pub fn channel(&self) -> Option<f64> {
        self.numeric("channel")
    }

    /// Версия прошивки.
    pub fn version(&self) -> Option<&FieldValue> {
        self.fields.get("version")
    }
}

/// Нижний регистр, пробелы в `_`, `/` и `.` удаляются.
fn normalize_key(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .replace(' ', "_")
        .replace(['/', '.'], "")
}

fn coerce_value(
    key: &str,
    raw: &str,
) -> FieldValue {
    match raw.parse::<f64>() {
        Ok(num) => match unit_for(key) {
            FieldUnit::Plain => FieldValue::Number(num),
            FieldUnit::RadToDeg => FieldValue::Number(num.to_degrees()),
        },
        Err(_) => FieldValue::Text(raw.to_string()),
    }
}
